use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("failed to access snapshot {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error
    },
    #[error("snapshot {} is corrupt", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error
    },
    #[error("failed to encode snapshot")]
    Encode(#[from] serde_json::Error)
}

pub type Result<T> = std::result::Result<T, BackendError>;

/// Durable home of one table. Every save replaces the whole previous
/// snapshot; there are no deltas.
pub trait SnapshotStore<T>: Send + Sync {
    /// Returns every stored record, or an empty set if nothing was ever saved.
    fn load(&self) -> Result<Vec<T>>;
    fn save(&self, records: &[T]) -> Result<()>;
}
