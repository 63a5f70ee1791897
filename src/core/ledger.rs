use std::sync::Arc;

use chrono::Utc;
use log::{debug, error, info, warn};
use serde::Serialize;

use crate::backend::{JsonStore, MemoryStore, SnapshotStore};
use crate::config::StorageConfig;
use crate::core::{
    Account, AccountGuard, AccountId, AccountTable, Amount, Authorizer, Caller, CancelToken, CustomerId,
    LedgerError, LedgerResult, LockRegistry, NewAccount, NewTransaction, OwnerAuthorizer,
    Transaction, TransactionId, TransactionJournal, TransactionKind};

/// Outcome of a deposit or withdrawal.
#[derive(Clone, PartialEq, Debug, Serialize)]
pub struct Receipt {
    pub transaction: Transaction,
    pub new_balance: Amount
}

/// Account balances plus their transaction journal.
///
/// Balance-changing operations on one account are serialized through that
/// account's lock; operations on different accounts never wait on each
/// other. Every mutation rewrites the affected table's snapshot. A storage
/// error is reported after the in-memory change has been made.
pub struct Ledger {
    accounts: AccountTable,
    journal: TransactionJournal,
    locks: LockRegistry,
    authorizer: Arc<dyn Authorizer>
}

impl Ledger {
    pub fn open(
        account_store: Box<dyn SnapshotStore<Account>>,
        transaction_store: Box<dyn SnapshotStore<Transaction>>
    ) -> LedgerResult<Ledger> {
        let accounts = AccountTable::open(account_store)?;
        let journal = TransactionJournal::open(transaction_store)?;

        // ids of deleted accounts survive only in the journal
        if let Some(id) = journal.max_account_id() {
            accounts.reserve_ids_through(id);
        }

        info!("ledger opened: {} accounts, {} transactions", accounts.len(), journal.len());
        Ok(Ledger {
            accounts,
            journal,
            locks: LockRegistry::new(),
            authorizer: Arc::new(OwnerAuthorizer)
        })
    }

    pub fn open_json(config: &StorageConfig) -> LedgerResult<Ledger> {
        Ledger::open(
            Box::new(JsonStore::<Account>::new(&config.accounts)),
            Box::new(JsonStore::<Transaction>::new(&config.transactions)))
    }

    /// A ledger that keeps its snapshots in memory only.
    pub fn in_memory() -> LedgerResult<Ledger> {
        Ledger::open(
            Box::new(MemoryStore::<Account>::new()),
            Box::new(MemoryStore::<Transaction>::new()))
    }

    pub fn with_authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Ledger {
        self.authorizer = authorizer;
        self
    }

    pub fn locks(&self) -> &LockRegistry {
        &self.locks
    }

    pub fn last_account_id(&self) -> AccountId {
        self.accounts.last_id()
    }

    pub fn last_transaction_id(&self) -> TransactionId {
        self.journal.last_id()
    }

    pub fn create_account(&self, caller: &Caller, account_number: &str, customer_id: CustomerId) -> LedgerResult<Account> {
        self.authorizer.validate_caller_owns_account(caller, customer_id)?;

        let account = self.accounts.create(NewAccount::new(account_number, customer_id))?;
        info!("account {} opened for customer {}", account.id, customer_id);
        Ok(account)
    }

    pub fn get_account(&self, caller: &Caller, id: AccountId) -> LedgerResult<Account> {
        let account = self.accounts.get(id)?;
        self.authorizer.validate_caller_owns_account(caller, account.customer_id)?;
        Ok(account)
    }

    pub fn update_account(&self, caller: &Caller, id: AccountId, account_number: &str) -> LedgerResult<Account> {
        let guard = self.locks.acquire(id);

        let (mut account, _guard) = self.lookup_locked(id, guard)?;
        self.authorizer.validate_caller_owns_account(caller, account.customer_id)?;

        account.account_number = account_number.to_owned();
        self.accounts.update(account.clone())?;
        debug!("account {} renumbered to {}", id, account_number);
        Ok(account)
    }

    /// Removes the account. Its transactions stay in the journal.
    pub fn delete_account(&self, caller: &Caller, id: AccountId) -> LedgerResult<()> {
        let guard = self.locks.acquire(id);

        let (account, guard) = self.lookup_locked(id, guard)?;
        self.authorizer.validate_caller_owns_account(caller, account.customer_id)?;

        let deleted = self.accounts.delete(id);
        self.locks.retire(guard);
        deleted?;
        info!("account {} closed", id);
        Ok(())
    }

    pub fn list_accounts(&self, caller: &Caller, customer_id: CustomerId) -> LedgerResult<Vec<Account>> {
        self.authorizer.validate_caller_owns_account(caller, customer_id)?;
        Ok(self.accounts.list_by_customer(customer_id))
    }

    pub fn list_all_accounts(&self, caller: &Caller) -> LedgerResult<Vec<Account>> {
        self.authorizer.require_system(caller)?;
        Ok(self.accounts.list_all())
    }

    pub fn deposit(&self, caller: &Caller, account_id: AccountId, amount: Amount) -> LedgerResult<Receipt> {
        self.post(caller, account_id, TransactionKind::Deposit, amount, &CancelToken::new())
    }

    pub fn withdraw(&self, caller: &Caller, account_id: AccountId, amount: Amount) -> LedgerResult<Receipt> {
        self.post(caller, account_id, TransactionKind::Withdrawal, amount, &CancelToken::new())
    }

    /// Applies a deposit or withdrawal under the account's lock.
    ///
    /// `cancel` is honoured only while waiting for the lock. Once the lock
    /// is held the balance update and the journal append both run.
    pub fn post(
        &self,
        caller: &Caller,
        account_id: AccountId,
        kind: TransactionKind,
        amount: Amount,
        cancel: &CancelToken
    ) -> LedgerResult<Receipt> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(LedgerError::InvalidAmount(amount));
        }

        let guard = self.locks.acquire_cancellable(account_id, cancel)?;

        let (mut account, _guard) = self.lookup_locked(account_id, guard)?;
        self.authorizer.validate_caller_owns_account(caller, account.customer_id)?;

        match kind {
            TransactionKind::Deposit => {
                let balance = account.balance + amount;
                if !balance.is_finite() {
                    return Err(LedgerError::BalanceOverflow {
                        account_id,
                        balance: account.balance,
                        delta: amount
                    });
                }
                account.balance = balance;
            },
            TransactionKind::Withdrawal => {
                if amount > account.balance {
                    warn!("withdrawal of {} refused on account {}: balance {}", amount, account_id, account.balance);
                    return Err(LedgerError::InsufficientFunds {
                        account_id,
                        balance: account.balance,
                        requested: amount
                    });
                }
                account.balance -= amount;
            }
        }

        let new_balance = account.balance;
        let transaction = self.apply(account, kind, amount)?;
        debug!("{} of {} on account {}, balance now {}", kind, amount, account_id, new_balance);

        Ok(Receipt { transaction, new_balance })
    }

    /// Reads an account while its lock is held. When the account does not
    /// exist the lock is retired so unknown ids leave no registry entry.
    fn lookup_locked(&self, id: AccountId, guard: AccountGuard) -> LedgerResult<(Account, AccountGuard)> {
        match self.accounts.get(id) {
            Ok(account) => Ok((account, guard)),
            Err(err) => {
                self.locks.retire(guard);
                Err(err)
            }
        }
    }

    fn apply(&self, account: Account, kind: TransactionKind, amount: Amount) -> LedgerResult<Transaction> {
        let account_id = account.id;

        // the journal entry is appended even when the account snapshot
        // failed, so memory stays internally consistent
        let updated = self.accounts.update(account);
        let appended = self.journal.append(NewTransaction {
            account_id,
            amount,
            kind,
            created_at: Utc::now()
        });

        if let Err(err) = &updated {
            error!("account {} changed in memory but not persisted: {}", account_id, err);
        }
        if let Err(err) = &appended {
            error!("{} on account {} recorded in memory but not persisted: {}", kind, account_id, err);
        }

        updated?;
        appended
    }

    pub fn transaction_history(&self, caller: &Caller, account_id: AccountId) -> LedgerResult<Vec<Transaction>> {
        let account = self.accounts.get(account_id)?;
        self.authorizer.validate_caller_owns_account(caller, account.customer_id)?;
        Ok(self.journal.list_by_account(account_id))
    }

    pub fn get_transaction(&self, caller: &Caller, id: TransactionId) -> LedgerResult<Transaction> {
        let transaction = self.journal.get(id)?;
        match self.accounts.get(transaction.account_id) {
            Ok(account) => self.authorizer.validate_caller_owns_account(caller, account.customer_id)?,
            // nobody owns a closed account any more
            Err(_) => self.authorizer.require_system(caller)?
        }
        Ok(transaction)
    }

    pub fn list_all_transactions(&self, caller: &Caller) -> LedgerResult<Vec<Transaction>> {
        self.authorizer.require_system(caller)?;
        Ok(self.journal.list_all())
    }
}
