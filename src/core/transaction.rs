use std::fmt;

use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::{Serialize, Deserialize};

use crate::core::account::{AccountId, Amount};

pub type TransactionId = u64;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    Deposit,
    Withdrawal
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "DEPOSIT",
            Self::Withdrawal => "WITHDRAWAL"
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A journal entry. Never edited once appended.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub account_id: AccountId,
    /// Magnitude requested by the caller, always positive.
    pub amount: Amount,
    pub kind: TransactionKind,
    pub created_at: DateTime<Utc>
}

impl Transaction {
    /// Change this transaction made to its account's balance.
    pub fn signed_amount(&self) -> Amount {
        match self.kind {
            TransactionKind::Deposit => self.amount,
            TransactionKind::Withdrawal => -self.amount
        }
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}: {} on account {}",
            self.created_at.format("%Y-%m-%d %H:%M:%S"),
            format!("#{}", self.id).bold(),
            self.kind,
            self.amount,
            self.account_id)
    }
}

#[derive(Clone, Debug)]
pub struct NewTransaction {
    pub account_id: AccountId,
    pub amount: Amount,
    pub kind: TransactionKind,
    pub created_at: DateTime<Utc>
}

impl NewTransaction {
    pub(crate) fn into_transaction(self, id: TransactionId) -> Transaction {
        Transaction {
            id,
            account_id: self.account_id,
            amount: self.amount,
            kind: self.kind,
            created_at: self.created_at
        }
    }
}


#[cfg(test)]
mod tests {
    use crate::core::{Transaction, TransactionKind};

    use chrono::{TimeZone, Utc};
    use rstest::rstest;

    #[rstest]
    #[case(TransactionKind::Deposit, 25.0)]
    #[case(TransactionKind::Withdrawal, -25.0)]
    fn signed_amount(#[case] kind: TransactionKind, #[case] expected: f64) {
        let transaction = Transaction {
            id: 1,
            account_id: 7,
            amount: 25.0,
            kind,
            created_at: Utc::now()
        };
        assert_eq!(transaction.signed_amount(), expected);
    }

    #[test]
    fn can_print() {
        colored::control::set_override(false);
        let transaction = Transaction {
            id: 3,
            account_id: 7,
            amount: 30.0,
            kind: TransactionKind::Withdrawal,
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
        };

        assert_eq!(transaction.to_string(), "2024-03-01 12:00:00 #3 WITHDRAWAL: 30 on account 7");
    }
}
