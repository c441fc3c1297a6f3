//! Key-value cache backends.
//!
//! The engine persists snapshots through the `KeyValueStore` trait so hosts
//! can plug in their own backend. Two implementations ship here: `FileStore`
//! writes one file per key under a data directory using atomic writes (write
//! to temp file, then rename), and `MemoryStore` keeps everything in a map
//! for tests and throwaway sessions.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::error::{StorageError, StorageResult};

/// Pluggable byte-oriented cache.
///
/// Keys are slash-separated namespaces like `annotations/stream-1`. Values
/// are opaque bytes; the snapshot layer above encodes JSON into them.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;
    fn set(&self, key: &str, value: &[u8]) -> StorageResult<()>;
    fn remove(&self, key: &str) -> StorageResult<()>;
}

/// File-per-key store rooted at a data directory.
///
/// `annotations/stream-1` maps to `<root>/annotations/stream-1.json`. Key
/// segments are sanitized so arbitrary stream ids cannot escape the root.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let mut path = self.root.clone();
        for segment in key.split('/').filter(|s| !s.is_empty()) {
            path.push(sanitize_segment(segment));
        }
        path.set_extension("json");
        path
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(source) => Err(StorageError::ReadError { path, source }),
        }
    }

    fn set(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        atomic_write(&self.path_for(key), value)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let path = self.path_for(key);
        if path.exists() {
            fs::remove_file(&path).map_err(|e| StorageError::from_io(e, path))?;
        }
        Ok(())
    }
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
        Ok(())
    }
}

/// Replace path-hostile characters so keys cannot traverse outside the root
fn sanitize_segment(segment: &str) -> String {
    segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '-'
            }
        })
        .collect::<String>()
        .trim_matches('.')
        .to_string()
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
///
/// This ensures the target file is never left in a partially-written state.
fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| StorageError::CreateDirectory {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    // Temp file in the same directory, so the rename stays on one filesystem
    let temp_path = path.with_extension("tmp");

    let mut file =
        File::create(&temp_path).map_err(|e| StorageError::from_io(e, temp_path.clone()))?;
    file.write_all(data)
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;

    // Sync to disk before rename
    file.sync_all()
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;

    fs::rename(&temp_path, path).map_err(|source| StorageError::AtomicWriteFailed {
        from: temp_path,
        to: path.to_path_buf(),
        source,
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_store_set_get_remove() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path());

        assert!(store.get("annotations/stream-1").unwrap().is_none());

        store.set("annotations/stream-1", b"hello").unwrap();
        assert_eq!(
            store.get("annotations/stream-1").unwrap().unwrap(),
            b"hello"
        );

        // Overwrite replaces the value
        store.set("annotations/stream-1", b"world").unwrap();
        assert_eq!(
            store.get("annotations/stream-1").unwrap().unwrap(),
            b"world"
        );

        store.remove("annotations/stream-1").unwrap();
        assert!(store.get("annotations/stream-1").unwrap().is_none());

        // Removing a missing key is not an error
        store.remove("annotations/stream-1").unwrap();
    }

    #[test]
    fn test_file_store_creates_nested_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path().join("deep").join("cache"));

        store.set("layers/actor-1", b"{}").unwrap();
        assert!(temp_dir
            .path()
            .join("deep")
            .join("cache")
            .join("layers")
            .join("actor-1.json")
            .exists());
    }

    #[test]
    fn test_file_store_sanitizes_hostile_keys() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path());

        store.set("annotations/../../etc/passwd", b"nope").unwrap();

        // Nothing escapes the root
        let mut locations = Vec::new();
        fn walk(dir: &Path, found: &mut Vec<PathBuf>) {
            for entry in fs::read_dir(dir).unwrap() {
                let path = entry.unwrap().path();
                if path.is_dir() {
                    walk(&path, found);
                } else {
                    found.push(path);
                }
            }
        }
        walk(temp_dir.path(), &mut locations);
        assert_eq!(locations.len(), 1);
        assert!(locations[0].starts_with(temp_dir.path()));
    }

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();

        assert!(store.get("templates").unwrap().is_none());
        store.set("templates", b"[1,2,3]").unwrap();
        assert_eq!(store.get("templates").unwrap().unwrap(), b"[1,2,3]");
        store.remove("templates").unwrap();
        assert!(store.get("templates").unwrap().is_none());
    }

    #[test]
    fn test_atomic_write_leaves_no_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("snapshot.json");

        atomic_write(&target, b"data").unwrap();

        assert!(target.exists());
        assert!(!temp_dir.path().join("snapshot.tmp").exists());
        assert_eq!(fs::read(&target).unwrap(), b"data");
    }
}
