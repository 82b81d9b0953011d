//! Namespaced key-value backends for session records.
//!
//! The session store never talks to a database directly. It is handed a
//! [`KeyValueStore`] at construction time, so any persistent store (files,
//! SQLite, Redis, a hosted realtime database) can sit behind it.

mod file;
mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::SessionError;

pub use file::FileKeyValueStore;
pub use memory::InMemoryKeyValueStore;

/// One stored session record.
///
/// Field names on the wire are `session`, `expires` and `createdAt`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecord {
    /// Serialized session payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
    /// Absolute expiry, epoch milliseconds.
    pub expires: i64,
    /// Creation time, epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

impl StoredRecord {
    pub fn new(session: String, expires: i64, created_at: i64) -> Self {
        Self {
            session: Some(session),
            expires,
            created_at: Some(created_at),
        }
    }

    /// Whether the record is past its expiry at `now_ms`.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        self.expires <= now_ms
    }
}

/// Storage contract used by [`SessionStore`](crate::session::SessionStore).
///
/// Implementations must never leave a partially written record behind;
/// concurrent writers to the same key resolve as last-write-wins.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads a record. A missing key is `Ok(None)`.
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<StoredRecord>, SessionError>;

    /// Writes or overwrites the full record.
    async fn set(
        &self,
        namespace: &str,
        key: &str,
        record: StoredRecord,
    ) -> Result<(), SessionError>;

    /// Updates only the `expires` field.
    ///
    /// A missing key gets a bare record holding just the expiry.
    async fn update_expires(
        &self,
        namespace: &str,
        key: &str,
        expires: i64,
    ) -> Result<(), SessionError>;

    /// Removes a record. Removing a missing key is not an error.
    async fn delete(&self, namespace: &str, key: &str) -> Result<(), SessionError>;

    /// Lists every record in a namespace.
    async fn entries(&self, namespace: &str) -> Result<Vec<(String, StoredRecord)>, SessionError>;
}

#[async_trait]
impl<K> KeyValueStore for Arc<K>
where
    K: KeyValueStore + ?Sized,
{
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<StoredRecord>, SessionError> {
        (**self).get(namespace, key).await
    }

    async fn set(
        &self,
        namespace: &str,
        key: &str,
        record: StoredRecord,
    ) -> Result<(), SessionError> {
        (**self).set(namespace, key, record).await
    }

    async fn update_expires(
        &self,
        namespace: &str,
        key: &str,
        expires: i64,
    ) -> Result<(), SessionError> {
        (**self).update_expires(namespace, key, expires).await
    }

    async fn delete(&self, namespace: &str, key: &str) -> Result<(), SessionError> {
        (**self).delete(namespace, key).await
    }

    async fn entries(&self, namespace: &str) -> Result<Vec<(String, StoredRecord)>, SessionError> {
        (**self).entries(namespace).await
    }
}

/// Keys and namespaces are limited to `[A-Za-z0-9_-]`.
///
/// Backends that map keys onto paths rely on this to rule out traversal.
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
