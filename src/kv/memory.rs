//! In-memory key-value storage.
//!
//! Suitable for development, testing, and single-instance deployments.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use super::{KeyValueStore, StoredRecord};
use crate::SessionError;

type Namespaces = HashMap<String, HashMap<String, StoredRecord>>;

/// In-memory key-value storage.
///
/// Records live in a `HashMap` per namespace, protected by a `RwLock`.
///
/// # Note
///
/// Records are lost when the process restarts.
/// For persistent storage, use [`FileKeyValueStore`](super::FileKeyValueStore).
#[derive(Clone, Default)]
pub struct InMemoryKeyValueStore {
    namespaces: Arc<RwLock<Namespaces>>,
}

impl InMemoryKeyValueStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of records in a namespace.
    pub fn len(&self, namespace: &str) -> usize {
        self.namespaces
            .read()
            .map(|guard| guard.get(namespace).map_or(0, HashMap::len))
            .unwrap_or(0)
    }

    /// Returns true if the namespace holds no records.
    pub fn is_empty(&self, namespace: &str) -> bool {
        self.len(namespace) == 0
    }
}

fn poisoned() -> SessionError {
    SessionError::Backend("Lock poisoned".to_owned())
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<StoredRecord>, SessionError> {
        let namespaces = self.namespaces.read().map_err(|_| poisoned())?;

        Ok(namespaces
            .get(namespace)
            .and_then(|records| records.get(key))
            .cloned())
    }

    async fn set(
        &self,
        namespace: &str,
        key: &str,
        record: StoredRecord,
    ) -> Result<(), SessionError> {
        self.namespaces
            .write()
            .map_err(|_| poisoned())?
            .entry(namespace.to_owned())
            .or_default()
            .insert(key.to_owned(), record);

        Ok(())
    }

    async fn update_expires(
        &self,
        namespace: &str,
        key: &str,
        expires: i64,
    ) -> Result<(), SessionError> {
        self.namespaces
            .write()
            .map_err(|_| poisoned())?
            .entry(namespace.to_owned())
            .or_default()
            .entry(key.to_owned())
            .and_modify(|record| record.expires = expires)
            .or_insert(StoredRecord {
                session: None,
                expires,
                created_at: None,
            });

        Ok(())
    }

    async fn delete(&self, namespace: &str, key: &str) -> Result<(), SessionError> {
        if let Some(records) = self
            .namespaces
            .write()
            .map_err(|_| poisoned())?
            .get_mut(namespace)
        {
            records.remove(key);
        }

        Ok(())
    }

    async fn entries(&self, namespace: &str) -> Result<Vec<(String, StoredRecord)>, SessionError> {
        let namespaces = self.namespaces.read().map_err(|_| poisoned())?;

        Ok(namespaces
            .get(namespace)
            .map(|records| {
                records
                    .iter()
                    .map(|(key, record)| (key.clone(), record.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(expires: i64) -> StoredRecord {
        StoredRecord::new("{}".to_owned(), expires, 1)
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let store = InMemoryKeyValueStore::new();
        store.set("sessions", "abc", record(10)).await.unwrap();

        let found = store.get("sessions", "abc").await.unwrap();
        assert_eq!(found, Some(record(10)));
        assert_eq!(store.len("sessions"), 1);
    }

    #[tokio::test]
    async fn test_namespaces_are_isolated() {
        let store = InMemoryKeyValueStore::new();
        store.set("sessions", "abc", record(10)).await.unwrap();

        assert!(store.get("other", "abc").await.unwrap().is_none());
        assert!(store.is_empty("other"));
    }

    #[tokio::test]
    async fn test_update_expires_keeps_payload() {
        let store = InMemoryKeyValueStore::new();
        store.set("sessions", "abc", record(10)).await.unwrap();
        store.update_expires("sessions", "abc", 99).await.unwrap();

        let found = store.get("sessions", "abc").await.unwrap().unwrap();
        assert_eq!(found.expires, 99);
        assert_eq!(found.session.as_deref(), Some("{}"));
        assert_eq!(found.created_at, Some(1));
    }

    #[tokio::test]
    async fn test_update_expires_on_missing_key_creates_bare_record() {
        let store = InMemoryKeyValueStore::new();
        store.update_expires("sessions", "ghost", 5).await.unwrap();

        let found = store.get("sessions", "ghost").await.unwrap().unwrap();
        assert_eq!(found.session, None);
        assert_eq!(found.expires, 5);
    }

    #[tokio::test]
    async fn test_delete_missing_is_ok() {
        let store = InMemoryKeyValueStore::new();
        store.delete("sessions", "nothing").await.unwrap();

        store.set("sessions", "abc", record(10)).await.unwrap();
        store.delete("sessions", "abc").await.unwrap();
        assert!(store.get("sessions", "abc").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_entries() {
        let store = InMemoryKeyValueStore::new();
        store.set("sessions", "a", record(1)).await.unwrap();
        store.set("sessions", "b", record(2)).await.unwrap();

        let mut entries = store.entries("sessions").await.unwrap();
        entries.sort_by(|x, y| x.0.cmp(&y.0));
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, "a");
        assert_eq!(entries[1].1.expires, 2);

        assert!(store.entries("empty").await.unwrap().is_empty());
    }
}
