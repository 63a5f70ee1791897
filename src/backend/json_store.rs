use std::{fs, io, io::Write, marker::PhantomData, path::{Path, PathBuf}};

use serde::{Serialize, de::DeserializeOwned};

use crate::backend::interface::{BackendError, Result, SnapshotStore};

/// Snapshot kept as a JSON array in a single file.
///
/// Saves go through a sibling `.tmp` file that is synced and then renamed
/// over the target, so readers of the file only ever see a complete snapshot.
pub struct JsonStore<T> {
    path: PathBuf,
    _records: PhantomData<fn() -> T>
}

impl<T> JsonStore<T> {
    pub fn new(path: impl AsRef<Path>) -> JsonStore<T> {
        JsonStore { path: path.as_ref().to_path_buf(), _records: PhantomData }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }

    fn io_error(&self, source: io::Error) -> BackendError {
        BackendError::Io { path: self.path.clone(), source }
    }
}

fn write_synced(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(data)?;
    // contents must be on disk before the rename makes them visible
    file.sync_all()
}

impl<T> SnapshotStore<T> for JsonStore<T>
where
    T: Serialize + DeserializeOwned
{
    fn load(&self) -> Result<Vec<T>> {
        let content = match fs::read(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(self.io_error(err))
        };

        serde_json::from_slice(&content)
            .map_err(|source| BackendError::Corrupt { path: self.path.clone(), source })
    }

    fn save(&self, records: &[T]) -> Result<()> {
        let data = serde_json::to_vec(records)?;
        let temp = self.temp_path();

        write_synced(&temp, &data).map_err(|err| self.io_error(err))?;
        fs::rename(&temp, &self.path).map_err(|err| self.io_error(err))?;
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use crate::backend::{BackendError, JsonStore, SnapshotStore};
    use crate::core::{Account, Transaction, TransactionKind};

    use chrono::{TimeZone, Utc};
    use rstest::{fixture, rstest};
    use serde_json::json;
    use tempfile::TempDir;

    #[fixture]
    fn dir() -> TempDir {
        tempfile::tempdir().unwrap()
    }

    #[fixture]
    fn account() -> Account {
        Account {
            id: 1,
            account_number: "1234567890".to_owned(),
            customer_id: 123,
            balance: 70.0,
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
        }
    }

    #[fixture]
    fn account_json() -> serde_json::Value {
        json!({
            "id": 1,
            "account_number": "1234567890",
            "customer_id": 123,
            "balance": 70.0,
            "created_at": "2024-03-01T12:00:00Z"
        })
    }

    #[rstest]
    fn account_serialize(account: Account, account_json: serde_json::Value) {
        let value = serde_json::to_value(&account).unwrap();
        assert_eq!(value, account_json);
    }

    #[rstest]
    fn transaction_kind_serialize() {
        let transaction = Transaction {
            id: 4,
            account_id: 1,
            amount: 30.0,
            kind: TransactionKind::Withdrawal,
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
        };
        let value = serde_json::to_value(&transaction).unwrap();
        assert_eq!(value["kind"], json!("WITHDRAWAL"));
    }

    #[rstest]
    fn missing_file_loads_empty(dir: TempDir) {
        let store = JsonStore::<Account>::new(dir.path().join("accounts.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[rstest]
    fn save_then_load(dir: TempDir, account: Account) {
        let store = JsonStore::<Account>::new(dir.path().join("accounts.json"));
        store.save(&[account.clone()]).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded, vec![account]);
        assert!(!dir.path().join("accounts.json.tmp").exists());
    }

    #[rstest]
    fn save_overwrites_leftover_temp_file(dir: TempDir, account: Account) {
        let path = dir.path().join("accounts.json");
        std::fs::write(dir.path().join("accounts.json.tmp"), "[{\"id\": 1, \"garbage\"").unwrap();

        let store = JsonStore::<Account>::new(&path);
        store.save(&[account.clone()]).unwrap();

        assert_eq!(store.load().unwrap(), vec![account]);
        assert!(!dir.path().join("accounts.json.tmp").exists());
    }

    #[rstest]
    fn save_replaces_previous_snapshot(dir: TempDir, account: Account) {
        let store = JsonStore::<Account>::new(dir.path().join("accounts.json"));
        let mut second = account.clone();
        second.id = 2;

        store.save(&[account.clone(), second]).unwrap();
        store.save(&[account.clone()]).unwrap();

        assert_eq!(store.load().unwrap(), vec![account]);
    }

    #[rstest]
    fn corrupt_file_fails(dir: TempDir) {
        let path = dir.path().join("accounts.json");
        std::fs::write(&path, "[{\"id\": ").unwrap();

        let store = JsonStore::<Account>::new(&path);
        assert!(matches!(store.load(), Err(BackendError::Corrupt { .. })));
    }

    #[rstest]
    fn unwritable_target_fails(dir: TempDir, account: Account) {
        let store = JsonStore::<Account>::new(dir.path().join("missing").join("accounts.json"));
        assert!(matches!(store.save(&[account]), Err(BackendError::Io { .. })));
    }
}
