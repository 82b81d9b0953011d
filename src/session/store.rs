//! Session store over an injected key-value backend.

use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::SessionError;
use crate::kv::{KeyValueStore, StoredRecord};

/// Namespace holding session records.
pub const SESSION_NAMESPACE: &str = "sessions";

/// TTL used when the caller's cookie policy carries no max-age (24 hours).
pub const DEFAULT_MAX_AGE_MS: i64 = 24 * 60 * 60 * 1000;

/// Persistent session store with the `get`/`set`/`destroy`/`touch` contract.
///
/// Sessions are serialized to JSON and written with an absolute expiry of
/// `now + max_age`. Expired and unreadable records read as "no session" and
/// are deleted on the way out; only backend failures surface as errors.
///
/// No locking is done. Overlapping writes to one session id resolve as
/// last-write-wins, which is harmless for `touch` since every write extends
/// the expiry into the future.
///
/// # Example
///
/// ```rust,ignore
/// use datasell_session::{InMemoryKeyValueStore, SessionState, SessionStore};
///
/// let store = SessionStore::new(InMemoryKeyValueStore::new());
/// store.set("abc", &SessionState::default(), Some(30 * 60 * 1000)).await?;
/// let state: Option<SessionState> = store.get("abc").await?;
/// ```
#[derive(Debug, Clone)]
pub struct SessionStore<K> {
    backend: K,
    namespace: String,
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

fn id_prefix(session_id: &str) -> String {
    session_id.chars().take(8).collect()
}

impl<K: KeyValueStore> SessionStore<K> {
    /// Creates a store writing to the `sessions` namespace.
    pub fn new(backend: K) -> Self {
        Self::with_namespace(backend, SESSION_NAMESPACE)
    }

    pub fn with_namespace(backend: K, namespace: impl Into<String>) -> Self {
        Self {
            backend,
            namespace: namespace.into(),
        }
    }

    pub fn backend(&self) -> &K {
        &self.backend
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Loads a session.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(state))` - a live session
    /// - `Ok(None)` - never written, expired, or unreadable (the latter two are deleted)
    /// - `Err(_)` - the backend read failed
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "session_store.get", skip_all, err)
    )]
    pub async fn get<T: DeserializeOwned>(
        &self,
        session_id: &str,
    ) -> Result<Option<T>, SessionError> {
        let Some(record) = self.backend.get(&self.namespace, session_id).await? else {
            log::debug!(target: "datasell_session::store", "msg=\"session not found\" session=\"{}\"", id_prefix(session_id));
            return Ok(None);
        };

        if record.is_expired_at(now_ms()) {
            log::debug!(target: "datasell_session::store", "msg=\"session expired, deleting\" session=\"{}\"", id_prefix(session_id));
            self.discard(session_id).await;
            return Ok(None);
        }

        let parsed = record
            .session
            .as_deref()
            .ok_or_else(|| "missing session payload".to_owned())
            .and_then(|raw| serde_json::from_str::<T>(raw).map_err(|e| e.to_string()));

        match parsed {
            Ok(state) => Ok(Some(state)),
            Err(e) => {
                log::error!(target: "datasell_session::store", "msg=\"corrupt session payload, deleting\" session=\"{}\" error=\"{e}\"", id_prefix(session_id));
                self.discard(session_id).await;
                Ok(None)
            }
        }
    }

    /// Writes the full session record, replacing whatever was stored.
    ///
    /// `max_age_ms` of `None` falls back to [`DEFAULT_MAX_AGE_MS`].
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "session_store.set", skip_all, err)
    )]
    pub async fn set<T: Serialize>(
        &self,
        session_id: &str,
        state: &T,
        max_age_ms: Option<i64>,
    ) -> Result<(), SessionError> {
        let serialized = serde_json::to_string(state)
            .map_err(|e| SessionError::Serialization(e.to_string()))?;

        let now = now_ms();
        let expires = now.saturating_add(max_age_ms.unwrap_or(DEFAULT_MAX_AGE_MS));
        let record = StoredRecord::new(serialized, expires, now);

        self.backend
            .set(&self.namespace, session_id, record)
            .await
            .inspect_err(|e| {
                log::error!(target: "datasell_session::store", "msg=\"session set failed\" session=\"{}\" error=\"{e}\"", id_prefix(session_id));
            })?;

        log::debug!(target: "datasell_session::store", "msg=\"session set\" session=\"{}\" expires={expires}", id_prefix(session_id));
        Ok(())
    }

    /// Removes the session. Missing sessions are not an error.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "session_store.destroy", skip_all, err)
    )]
    pub async fn destroy(&self, session_id: &str) -> Result<(), SessionError> {
        self.backend
            .delete(&self.namespace, session_id)
            .await
            .inspect_err(|e| {
                log::error!(target: "datasell_session::store", "msg=\"session destroy failed\" session=\"{}\" error=\"{e}\"", id_prefix(session_id));
            })?;

        log::debug!(target: "datasell_session::store", "msg=\"session destroyed\" session=\"{}\"", id_prefix(session_id));
        Ok(())
    }

    /// Extends the session's expiry to `now + max_age` without rewriting the
    /// stored payload.
    ///
    /// `_state` is accepted to mirror `set`; it is never written.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "session_store.touch", skip_all, err)
    )]
    pub async fn touch<T>(
        &self,
        session_id: &str,
        _state: &T,
        max_age_ms: Option<i64>,
    ) -> Result<(), SessionError> {
        let expires = now_ms().saturating_add(max_age_ms.unwrap_or(DEFAULT_MAX_AGE_MS));

        self.backend
            .update_expires(&self.namespace, session_id, expires)
            .await
            .inspect_err(|e| {
                log::error!(target: "datasell_session::store", "msg=\"session touch failed\" session=\"{}\" error=\"{e}\"", id_prefix(session_id));
            })?;

        log::trace!(target: "datasell_session::store", "msg=\"session touched\" session=\"{}\" expires={expires}", id_prefix(session_id));
        Ok(())
    }

    /// Raw record, without expiry checks or cleanup.
    pub async fn get_record(&self, session_id: &str) -> Result<Option<StoredRecord>, SessionError> {
        self.backend.get(&self.namespace, session_id).await
    }

    /// Removes every expired record.
    ///
    /// Run periodically to keep abandoned sessions from piling up.
    ///
    /// # Returns
    ///
    /// - `Ok(count)` - number of records removed
    /// - `Err(_)` - listing or deleting failed
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "session_store.prune_expired", skip_all, err)
    )]
    pub async fn prune_expired(&self) -> Result<u64, SessionError> {
        let now = now_ms();
        let mut pruned = 0u64;

        for (session_id, record) in self.backend.entries(&self.namespace).await? {
            if record.is_expired_at(now) {
                self.backend.delete(&self.namespace, &session_id).await?;
                pruned += 1;
            }
        }

        log::info!(target: "datasell_session::store", "msg=\"sessions pruned\" count={pruned}");
        Ok(pruned)
    }

    async fn discard(&self, session_id: &str) {
        if let Err(e) = self.backend.delete(&self.namespace, session_id).await {
            log::warn!(target: "datasell_session::store", "msg=\"failed to delete stale session\" session=\"{}\" error=\"{e}\"", id_prefix(session_id));
        }
    }
}
