pub mod account;
pub mod transaction;
pub mod error;
pub mod auth;
pub mod locks;
pub mod account_table;
pub mod journal;
pub mod ledger;

pub use account::{Account, AccountId, Amount, CustomerId, NewAccount};
pub use transaction::{NewTransaction, Transaction, TransactionId, TransactionKind};
pub use error::{ErrorCode, LedgerError, LedgerResult};
pub use auth::{Authorizer, Caller, Claims, OwnerAuthorizer};
pub use locks::{AccountGuard, CancelToken, LockRegistry};
pub use account_table::AccountTable;
pub use journal::TransactionJournal;
pub use ledger::{Ledger, Receipt};
