use std::collections::{BTreeMap, HashMap};

use parking_lot::{RwLock, RwLockReadGuard};

use crate::backend::{SnapshotStore, SnapshotWriter};
use crate::core::{AccountId, LedgerError, LedgerResult, NewTransaction, Transaction, TransactionId};

#[derive(Default)]
struct JournalState {
    transactions: BTreeMap<TransactionId, Transaction>,
    by_account: HashMap<AccountId, Vec<TransactionId>>,
    last_id: TransactionId,
    version: u64
}

impl JournalState {
    fn insert(&mut self, transaction: Transaction) {
        self.by_account.entry(transaction.account_id).or_default().push(transaction.id);
        self.transactions.insert(transaction.id, transaction);
    }
}

/// Append-only store of transactions with a per-account index.
pub struct TransactionJournal {
    state: RwLock<JournalState>,
    writer: SnapshotWriter<Transaction>
}

impl TransactionJournal {
    pub fn open(store: Box<dyn SnapshotStore<Transaction>>) -> LedgerResult<TransactionJournal> {
        let writer = SnapshotWriter::new("transactions", store);
        let mut state = JournalState::default();

        // index must come back in creation order, whatever the file order
        let mut transactions = writer.load()?;
        transactions.sort_by_key(|transaction| transaction.id);
        for transaction in transactions {
            state.last_id = state.last_id.max(transaction.id);
            state.insert(transaction);
        }

        Ok(TransactionJournal { state: RwLock::new(state), writer })
    }

    fn read(&self) -> RwLockReadGuard<'_, JournalState> {
        self.state.read()
    }

    pub fn last_id(&self) -> TransactionId {
        self.read().last_id
    }

    pub fn append(&self, new_transaction: NewTransaction) -> LedgerResult<Transaction> {
        let (transaction, version, records) = {
            let mut state = self.state.write();
            state.last_id += 1;
            let transaction = new_transaction.into_transaction(state.last_id);
            state.insert(transaction.clone());
            state.version += 1;
            let records: Vec<_> = state.transactions.values().cloned().collect();
            (transaction, state.version, records)
        };

        self.writer.save(version, &records)?;
        Ok(transaction)
    }

    pub fn get(&self, id: TransactionId) -> LedgerResult<Transaction> {
        self.read().transactions.get(&id).cloned().ok_or(LedgerError::TransactionNotFound(id))
    }

    /// Transactions of one account in the order they were appended.
    pub fn list_by_account(&self, account_id: AccountId) -> Vec<Transaction> {
        let state = self.read();
        match state.by_account.get(&account_id) {
            Some(ids) => ids.iter().filter_map(|id| state.transactions.get(id).cloned()).collect(),
            None => Vec::new()
        }
    }

    pub fn list_all(&self) -> Vec<Transaction> {
        self.read().transactions.values().cloned().collect()
    }

    /// Largest account id any transaction refers to.
    pub fn max_account_id(&self) -> Option<AccountId> {
        self.read().by_account.keys().max().copied()
    }

    pub fn len(&self) -> usize {
        self.read().transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}


#[cfg(test)]
mod tests {
    use crate::backend::MemoryStore;
    use crate::core::{LedgerError, NewTransaction, Transaction, TransactionJournal, TransactionKind};

    use chrono::{TimeZone, Utc};
    use rstest::{fixture, rstest};

    fn entry(account_id: u64, amount: f64, kind: TransactionKind) -> NewTransaction {
        NewTransaction { account_id, amount, kind, created_at: Utc::now() }
    }

    #[fixture]
    fn journal() -> TransactionJournal {
        TransactionJournal::open(Box::new(MemoryStore::<Transaction>::new())).unwrap()
    }

    #[rstest]
    fn append_assigns_ids(journal: TransactionJournal) {
        let first = journal.append(entry(1, 100.0, TransactionKind::Deposit)).unwrap();
        let second = journal.append(entry(2, 5.0, TransactionKind::Deposit)).unwrap();

        assert_eq!((first.id, second.id), (1, 2));
        assert_eq!(journal.get(1).unwrap(), first);
        assert!(matches!(journal.get(3), Err(LedgerError::TransactionNotFound(3))));
    }

    #[rstest]
    fn history_is_per_account_and_ordered(journal: TransactionJournal) {
        journal.append(entry(1, 100.0, TransactionKind::Deposit)).unwrap();
        journal.append(entry(2, 5.0, TransactionKind::Deposit)).unwrap();
        journal.append(entry(1, 30.0, TransactionKind::Withdrawal)).unwrap();

        let history = journal.list_by_account(1);
        let summary: Vec<_> = history.iter().map(|t| (t.id, t.kind, t.amount)).collect();
        assert_eq!(summary, vec![
            (1, TransactionKind::Deposit, 100.0),
            (3, TransactionKind::Withdrawal, 30.0)
        ]);
        assert!(journal.list_by_account(9).is_empty());
        assert_eq!(journal.list_all().len(), 3);
        assert_eq!(journal.max_account_id(), Some(2));
    }

    #[test]
    fn reopen_from_unsorted_snapshot() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let stored = vec![
            Transaction { id: 5, account_id: 1, amount: 2.0, kind: TransactionKind::Withdrawal, created_at: at },
            Transaction { id: 2, account_id: 1, amount: 9.0, kind: TransactionKind::Deposit, created_at: at },
        ];
        let journal = TransactionJournal::open(Box::new(MemoryStore::with_records(stored))).unwrap();

        let ids: Vec<_> = journal.list_by_account(1).iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![2, 5]);
        assert_eq!(journal.last_id(), 5);
        assert_eq!(journal.append(entry(1, 1.0, TransactionKind::Deposit)).unwrap().id, 6);
    }
}
