use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

pub type AccountId = u64;
pub type CustomerId = u64;
pub type Amount = f64;

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    /// Caller supplied; not required to be unique.
    pub account_number: String,
    pub customer_id: CustomerId,
    pub balance: Amount,
    pub created_at: DateTime<Utc>
}

/// Fields a caller provides when opening an account. The identifier is
/// assigned by the account table.
#[derive(Clone, Debug)]
pub struct NewAccount {
    pub account_number: String,
    pub customer_id: CustomerId,
    pub created_at: DateTime<Utc>
}

impl NewAccount {
    pub fn new(account_number: &str, customer_id: CustomerId) -> NewAccount {
        NewAccount {
            account_number: account_number.to_owned(),
            customer_id,
            created_at: Utc::now()
        }
    }

    pub(crate) fn into_account(self, id: AccountId) -> Account {
        Account {
            id,
            account_number: self.account_number,
            customer_id: self.customer_id,
            balance: 0.0,
            created_at: self.created_at
        }
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} [{}] customer {}: {}", self.id, self.account_number, self.customer_id, self.balance)
    }
}
