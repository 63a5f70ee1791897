use thiserror::Error;

use crate::backend::BackendError;
use crate::core::{AccountId, Amount, TransactionId};

/// Coarse classification of a [`LedgerError`], the way callers outside the
/// core react to it.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ErrorCode {
    NotFound,
    FailedPrecondition,
    PermissionDenied,
    InvalidArgument,
    Cancelled,
    Internal
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("no such account: {0}")]
    AccountNotFound(AccountId),

    #[error("no such transaction: {0}")]
    TransactionNotFound(TransactionId),

    /// A withdrawal asked for more than the account holds.
    #[error("insufficient funds on account {account_id}: {requested} requested, {balance} available")]
    InsufficientFunds {
        account_id: AccountId,
        balance: Amount,
        requested: Amount
    },

    #[error("invalid amount: {0}")]
    InvalidAmount(Amount),

    /// The resulting balance would not be a finite number.
    #[error("balance of account {account_id} out of range: {balance} + {delta}")]
    BalanceOverflow {
        account_id: AccountId,
        balance: Amount,
        delta: Amount
    },

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("cancelled while waiting for account {0}")]
    Cancelled(AccountId),

    /// Persistence failed. In-memory state may already reflect the
    /// operation.
    #[error("storage failure")]
    Storage(#[from] BackendError)
}

impl LedgerError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::AccountNotFound(_) | Self::TransactionNotFound(_) => ErrorCode::NotFound,
            Self::InsufficientFunds { .. } | Self::BalanceOverflow { .. } => ErrorCode::FailedPrecondition,
            Self::InvalidAmount(_) => ErrorCode::InvalidArgument,
            Self::PermissionDenied(_) => ErrorCode::PermissionDenied,
            Self::Cancelled(_) => ErrorCode::Cancelled,
            Self::Storage(_) => ErrorCode::Internal
        }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
