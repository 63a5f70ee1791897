use std::collections::{BTreeMap, HashMap};

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::backend::{SnapshotStore, SnapshotWriter};
use crate::core::{Account, AccountId, CustomerId, LedgerError, LedgerResult, NewAccount};

#[derive(Default)]
struct AccountState {
    accounts: BTreeMap<AccountId, Account>,
    by_customer: HashMap<CustomerId, Vec<AccountId>>,
    last_id: AccountId,
    version: u64
}

impl AccountState {
    fn insert(&mut self, account: Account) {
        self.by_customer.entry(account.customer_id).or_default().push(account.id);
        self.accounts.insert(account.id, account);
    }

    /// Bumps the version and captures the records to persist for it.
    fn snapshot(&mut self) -> (u64, Vec<Account>) {
        self.version += 1;
        (self.version, self.accounts.values().cloned().collect())
    }
}

/// Authoritative account records plus the customer index.
///
/// Every record replacement happens under the write lock, so readers see an
/// account either entirely before or entirely after a change.
pub struct AccountTable {
    state: RwLock<AccountState>,
    writer: SnapshotWriter<Account>
}

impl AccountTable {
    /// Loads the table from its snapshot. The id counter resumes from the
    /// largest stored id.
    pub fn open(store: Box<dyn SnapshotStore<Account>>) -> LedgerResult<AccountTable> {
        let writer = SnapshotWriter::new("accounts", store);
        let mut state = AccountState::default();

        let mut accounts = writer.load()?;
        accounts.sort_by_key(|account| account.id);
        for account in accounts {
            state.last_id = state.last_id.max(account.id);
            state.insert(account);
        }

        Ok(AccountTable { state: RwLock::new(state), writer })
    }

    fn read(&self) -> RwLockReadGuard<'_, AccountState> {
        self.state.read()
    }

    fn write(&self) -> RwLockWriteGuard<'_, AccountState> {
        self.state.write()
    }

    fn persist(&self, (version, records): (u64, Vec<Account>)) -> LedgerResult<()> {
        Ok(self.writer.save(version, &records)?)
    }

    pub fn last_id(&self) -> AccountId {
        self.read().last_id
    }

    /// Never hand out ids up to `id` again.
    pub(crate) fn reserve_ids_through(&self, id: AccountId) {
        let mut state = self.write();
        state.last_id = state.last_id.max(id);
    }

    pub fn create(&self, new_account: NewAccount) -> LedgerResult<Account> {
        let (account, snapshot) = {
            let mut state = self.write();
            state.last_id += 1;
            let account = new_account.into_account(state.last_id);
            state.insert(account.clone());
            (account, state.snapshot())
        };

        self.persist(snapshot)?;
        Ok(account)
    }

    pub fn get(&self, id: AccountId) -> LedgerResult<Account> {
        self.read().accounts.get(&id).cloned().ok_or(LedgerError::AccountNotFound(id))
    }

    /// Replaces the stored record with the same id.
    pub fn update(&self, account: Account) -> LedgerResult<()> {
        let snapshot = {
            let mut state = self.write();
            let stored = state.accounts.get_mut(&account.id)
                .ok_or(LedgerError::AccountNotFound(account.id))?;

            if stored.customer_id != account.customer_id {
                let (old_owner, new_owner, id) = (stored.customer_id, account.customer_id, account.id);
                *stored = account;
                if let Some(ids) = state.by_customer.get_mut(&old_owner) {
                    ids.retain(|other| *other != id);
                }
                state.by_customer.entry(new_owner).or_default().push(id);
            } else {
                *stored = account;
            }
            state.snapshot()
        };

        self.persist(snapshot)
    }

    pub fn delete(&self, id: AccountId) -> LedgerResult<Account> {
        let (account, snapshot) = {
            let mut state = self.write();
            let account = state.accounts.remove(&id).ok_or(LedgerError::AccountNotFound(id))?;

            let now_empty = match state.by_customer.get_mut(&account.customer_id) {
                Some(ids) => {
                    ids.retain(|other| *other != id);
                    ids.is_empty()
                },
                None => false
            };
            if now_empty {
                state.by_customer.remove(&account.customer_id);
            }
            (account, state.snapshot())
        };

        self.persist(snapshot)?;
        Ok(account)
    }

    /// Accounts of one customer in creation order.
    pub fn list_by_customer(&self, customer_id: CustomerId) -> Vec<Account> {
        let state = self.read();
        match state.by_customer.get(&customer_id) {
            Some(ids) => ids.iter().filter_map(|id| state.accounts.get(id).cloned()).collect(),
            None => Vec::new()
        }
    }

    pub fn list_all(&self) -> Vec<Account> {
        self.read().accounts.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}


#[cfg(test)]
mod tests {
    use crate::backend::{MemoryStore, SnapshotStore};
    use crate::core::{Account, AccountTable, LedgerError, NewAccount};

    use rstest::{fixture, rstest};

    #[fixture]
    fn store() -> MemoryStore<Account> {
        MemoryStore::new()
    }

    #[fixture]
    fn table(store: MemoryStore<Account>) -> AccountTable {
        AccountTable::open(Box::new(store)).unwrap()
    }

    #[rstest]
    fn create_assigns_increasing_ids(table: AccountTable) {
        let first = table.create(NewAccount::new("1234567890", 123)).unwrap();
        let second = table.create(NewAccount::new("1234567890", 123)).unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(first.balance, 0.0);
        assert_eq!(table.get(2).unwrap().account_number, "1234567890");
    }

    #[rstest]
    fn create_persists(store: MemoryStore<Account>) {
        let table = AccountTable::open(Box::new(store.clone())).unwrap();
        table.create(NewAccount::new("A-1", 5)).unwrap();
        table.create(NewAccount::new("A-2", 5)).unwrap();

        let ids: Vec<_> = store.load().unwrap().iter().map(|account| account.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[rstest]
    fn get_unknown(table: AccountTable) {
        assert!(matches!(table.get(9), Err(LedgerError::AccountNotFound(9))));
    }

    #[rstest]
    fn update_replaces_record(table: AccountTable) {
        let mut account = table.create(NewAccount::new("old", 1)).unwrap();
        account.account_number = "new".to_owned();
        account.balance = 15.0;
        table.update(account.clone()).unwrap();

        assert_eq!(table.get(account.id).unwrap(), account);
    }

    #[rstest]
    fn update_unknown(table: AccountTable) {
        let mut account = table.create(NewAccount::new("old", 1)).unwrap();
        account.id = 77;
        assert!(matches!(table.update(account), Err(LedgerError::AccountNotFound(77))));
    }

    #[rstest]
    fn update_moves_owner_index(table: AccountTable) {
        let mut account = table.create(NewAccount::new("A-1", 1)).unwrap();
        account.customer_id = 2;
        table.update(account).unwrap();

        assert!(table.list_by_customer(1).is_empty());
        assert_eq!(table.list_by_customer(2).len(), 1);
    }

    #[rstest]
    fn delete_removes_from_both_indexes(table: AccountTable) {
        let kept = table.create(NewAccount::new("A-1", 1)).unwrap();
        let gone = table.create(NewAccount::new("A-2", 1)).unwrap();

        table.delete(gone.id).unwrap();

        assert!(matches!(table.get(gone.id), Err(LedgerError::AccountNotFound(_))));
        assert_eq!(table.list_by_customer(1), vec![kept]);
        assert!(matches!(table.delete(gone.id), Err(LedgerError::AccountNotFound(_))));
    }

    #[rstest]
    fn ids_are_not_recycled(table: AccountTable) {
        let account = table.create(NewAccount::new("A-1", 1)).unwrap();
        table.delete(account.id).unwrap();

        let next = table.create(NewAccount::new("A-2", 1)).unwrap();
        assert_eq!(next.id, 2);
    }

    #[rstest]
    fn list_by_customer_in_creation_order(table: AccountTable) {
        table.create(NewAccount::new("A-1", 1)).unwrap();
        table.create(NewAccount::new("B-1", 2)).unwrap();
        table.create(NewAccount::new("A-2", 1)).unwrap();

        let numbers: Vec<_> = table.list_by_customer(1).into_iter()
            .map(|account| account.account_number).collect();
        assert_eq!(numbers, vec!["A-1", "A-2"]);
        assert!(table.list_by_customer(3).is_empty());
        assert_eq!(table.list_all().len(), 3);
    }

    #[rstest]
    fn reopen_resumes_counter(store: MemoryStore<Account>) {
        {
            let table = AccountTable::open(Box::new(store.clone())).unwrap();
            table.create(NewAccount::new("A-1", 1)).unwrap();
            table.create(NewAccount::new("A-2", 1)).unwrap();
        }

        let table = AccountTable::open(Box::new(store)).unwrap();
        assert_eq!(table.last_id(), 2);
        assert_eq!(table.list_by_customer(1).len(), 2);
        assert_eq!(table.create(NewAccount::new("A-3", 1)).unwrap().id, 3);
    }
}
