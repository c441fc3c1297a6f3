//! Snapshot cache on top of a key-value store.
//!
//! Snapshots are plain JSON under namespaced keys:
//! - `annotations/{stream_id}` - full annotation set for a stream
//! - `layers/{actor_id}` - an actor's layer definitions
//! - `templates` - the shared template catalog

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::error::{StorageError, StorageResult};
use super::kv::KeyValueStore;

pub fn annotations_key(stream_id: &str) -> String {
    format!("annotations/{stream_id}")
}

pub fn layers_key(actor_id: &str) -> String {
    format!("layers/{actor_id}")
}

pub fn templates_key() -> String {
    "templates".to_string()
}

/// Serialize `value` as JSON and store it under `key`.
pub fn save_snapshot<T: Serialize>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> StorageResult<()> {
    let bytes = serde_json::to_vec(value).map_err(|e| StorageError::EncodeFailed {
        key: key.to_string(),
        details: e.to_string(),
    })?;
    store.set(key, &bytes)
}

/// Load and parse the JSON snapshot under `key`, `None` when absent.
pub fn load_snapshot<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> StorageResult<Option<T>> {
    let Some(bytes) = store.get(key)? else {
        return Ok(None);
    };
    let value = serde_json::from_slice(&bytes).map_err(|e| StorageError::InvalidFormat {
        key: key.to_string(),
        details: e.to_string(),
    })?;
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Annotation, AnnotationKind};
    use crate::storage::MemoryStore;

    #[test]
    fn test_snapshot_roundtrip() {
        let store = MemoryStore::new();
        let annotations = vec![Annotation::new(
            "stream-1",
            "actor-1",
            "Alice",
            AnnotationKind::Comment,
            "hello",
            1.0,
        )];

        let key = annotations_key("stream-1");
        save_snapshot(&store, &key, &annotations).unwrap();

        let loaded: Vec<Annotation> = load_snapshot(&store, &key).unwrap().unwrap();
        assert_eq!(loaded, annotations);
    }

    #[test]
    fn test_missing_snapshot_is_none() {
        let store = MemoryStore::new();
        let loaded: Option<Vec<Annotation>> =
            load_snapshot(&store, &annotations_key("nope")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_corrupt_snapshot_reports_key() {
        let store = MemoryStore::new();
        store.set("templates", b"{not json").unwrap();

        let err = load_snapshot::<Vec<Annotation>>(&store, &templates_key()).unwrap_err();
        assert!(matches!(err, StorageError::InvalidFormat { .. }));
        assert!(err.to_string().contains("templates"));
    }

    #[test]
    fn test_key_namespaces() {
        assert_eq!(annotations_key("s1"), "annotations/s1");
        assert_eq!(layers_key("a1"), "layers/a1");
        assert_eq!(templates_key(), "templates");
    }
}
