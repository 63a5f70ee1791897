mod json_store;
mod interface;
mod memory_store;
mod writer;

pub use interface::{SnapshotStore, Result, BackendError};
pub use json_store::JsonStore;
pub use memory_store::MemoryStore;
pub use writer::SnapshotWriter;
