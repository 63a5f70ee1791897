use std::sync::Arc;

use parking_lot::Mutex;

use crate::backend::interface::{Result, SnapshotStore};

/// Keeps the last saved snapshot in process memory.
///
/// Clones share the same snapshot, which lets a test reopen a second
/// ledger from what the first one persisted.
#[derive(Clone)]
pub struct MemoryStore<T> {
    records: Arc<Mutex<Vec<T>>>
}

impl<T> MemoryStore<T> {
    pub fn new() -> MemoryStore<T> {
        MemoryStore { records: Arc::new(Mutex::new(Vec::new())) }
    }

    pub fn with_records(records: Vec<T>) -> MemoryStore<T> {
        MemoryStore { records: Arc::new(Mutex::new(records)) }
    }
}

impl<T> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SnapshotStore<T> for MemoryStore<T>
where
    T: Clone + Send
{
    fn load(&self) -> Result<Vec<T>> {
        Ok(self.records.lock().clone())
    }

    fn save(&self, records: &[T]) -> Result<()> {
        *self.records.lock() = records.to_vec();
        Ok(())
    }
}
