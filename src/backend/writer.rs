use log::debug;
use parking_lot::Mutex;

use crate::backend::interface::{Result, SnapshotStore};

/// Serializes saves of one table and drops snapshots that are older than
/// the one already on the store.
///
/// Tables capture `(version, records)` under their own lock and save after
/// releasing it, so two saves can reach the writer out of order.
pub struct SnapshotWriter<T> {
    name: &'static str,
    store: Box<dyn SnapshotStore<T>>,
    persisted: Mutex<u64>
}

impl<T> SnapshotWriter<T> {
    pub fn new(name: &'static str, store: Box<dyn SnapshotStore<T>>) -> SnapshotWriter<T> {
        SnapshotWriter { name, store, persisted: Mutex::new(0) }
    }

    pub fn load(&self) -> Result<Vec<T>> {
        self.store.load()
    }

    pub fn save(&self, version: u64, records: &[T]) -> Result<()> {
        let mut persisted = self.persisted.lock();
        if *persisted >= version {
            debug!("{} snapshot v{} superseded by v{}", self.name, version, *persisted);
            return Ok(());
        }

        self.store.save(records)?;
        *persisted = version;
        debug!("{} snapshot v{} written ({} records)", self.name, version, records.len());
        Ok(())
    }
}
