mod core;
pub mod backend;
pub mod config;

pub use crate::core::{Account, Ledger, Receipt, Transaction, TransactionKind};
pub use crate::core::{Caller, Claims, Authorizer, OwnerAuthorizer, CancelToken};
pub use crate::core::{ErrorCode, LedgerError, LedgerResult};
pub use crate::core::{AccountId, CustomerId, TransactionId, Amount};
pub use crate::core::{account, transaction, auth, locks, account_table, journal, ledger};
