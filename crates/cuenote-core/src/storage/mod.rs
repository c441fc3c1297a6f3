//! Local snapshot persistence.

pub mod cache;
mod error;
mod kv;

pub use error::{StorageError, StorageResult};
pub use kv::{FileStore, KeyValueStore, MemoryStore};
