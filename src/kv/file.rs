//! File-based key-value storage.
//!
//! Stores each record as a JSON file inside a per-namespace directory.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::{KeyValueStore, StoredRecord, is_valid_key};
use crate::SessionError;
use crate::crypto::generate_token;

/// File-based key-value storage.
///
/// A record lives at `{root}/{namespace}/{key}.json`. Writes go to a
/// uniquely named temp file first and are renamed into place, so a reader
/// sees either the old record or the new one, never a torn write.
/// Mutations on one store (and its clones) are serialised, so a read-modify-write
/// `update_expires` cannot resurrect a record deleted in between.
///
/// # Example
///
/// ```rust,ignore
/// use datasell_session::FileKeyValueStore;
///
/// let store = FileKeyValueStore::new("/var/lib/datasell")?;
/// ```
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    root: PathBuf,
    writes: Arc<Mutex<()>>,
}

impl FileKeyValueStore {
    /// Creates a new file store rooted at `root`.
    ///
    /// Creates the directory if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, SessionError> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| {
            SessionError::Backend(format!("Failed to create store directory: {e}"))
        })?;
        Ok(Self {
            root,
            writes: Arc::new(Mutex::new(())),
        })
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn write_guard(&self) -> MutexGuard<'_, ()> {
        self.writes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn namespace_dir(&self, namespace: &str) -> PathBuf {
        self.root.join(namespace)
    }

    fn record_path(&self, namespace: &str, key: &str) -> PathBuf {
        self.namespace_dir(namespace).join(format!("{key}.json"))
    }

    fn read_record(path: &Path) -> Result<Option<StoredRecord>, SessionError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(SessionError::Backend(format!(
                    "Failed to read record file: {e}"
                )));
            }
        };

        let record: StoredRecord = serde_json::from_str(&content)
            .map_err(|e| SessionError::Backend(format!("Failed to parse record file: {e}")))?;

        Ok(Some(record))
    }

    fn write_record(
        &self,
        namespace: &str,
        key: &str,
        record: &StoredRecord,
    ) -> Result<(), SessionError> {
        let dir = self.namespace_dir(namespace);
        std::fs::create_dir_all(&dir).map_err(|e| {
            SessionError::Backend(format!("Failed to create namespace directory: {e}"))
        })?;

        let content = serde_json::to_string_pretty(record)
            .map_err(|e| SessionError::Serialization(format!("Failed to serialize record: {e}")))?;

        let tmp = dir.join(format!(".{key}.{}.tmp", generate_token(8)));
        std::fs::write(&tmp, content)
            .map_err(|e| SessionError::Backend(format!("Failed to write record file: {e}")))?;

        std::fs::rename(&tmp, self.record_path(namespace, key)).map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            SessionError::Backend(format!("Failed to move record file into place: {e}"))
        })
    }
}

fn check_key(namespace: &str, key: &str) -> Result<(), SessionError> {
    if !is_valid_key(namespace) {
        return Err(SessionError::InvalidKey(namespace.to_owned()));
    }
    if !is_valid_key(key) {
        return Err(SessionError::InvalidKey(key.to_owned()));
    }
    Ok(())
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<StoredRecord>, SessionError> {
        // Unstorable keys can never have been written.
        if check_key(namespace, key).is_err() {
            return Ok(None);
        }

        Self::read_record(&self.record_path(namespace, key))
    }

    async fn set(
        &self,
        namespace: &str,
        key: &str,
        record: StoredRecord,
    ) -> Result<(), SessionError> {
        check_key(namespace, key)?;
        let _guard = self.write_guard();
        self.write_record(namespace, key, &record)
    }

    async fn update_expires(
        &self,
        namespace: &str,
        key: &str,
        expires: i64,
    ) -> Result<(), SessionError> {
        check_key(namespace, key)?;

        let _guard = self.write_guard();
        let record = match Self::read_record(&self.record_path(namespace, key))? {
            Some(mut record) => {
                record.expires = expires;
                record
            }
            None => StoredRecord {
                session: None,
                expires,
                created_at: None,
            },
        };

        self.write_record(namespace, key, &record)
    }

    async fn delete(&self, namespace: &str, key: &str) -> Result<(), SessionError> {
        if check_key(namespace, key).is_err() {
            return Ok(());
        }

        let _guard = self.write_guard();
        match std::fs::remove_file(self.record_path(namespace, key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SessionError::Backend(format!(
                "Failed to delete record file: {e}"
            ))),
        }
    }

    async fn entries(&self, namespace: &str) -> Result<Vec<(String, StoredRecord)>, SessionError> {
        if !is_valid_key(namespace) {
            return Err(SessionError::InvalidKey(namespace.to_owned()));
        }

        let dir = self.namespace_dir(namespace);
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(SessionError::Backend(format!(
                    "Failed to read namespace directory: {e}"
                )));
            }
        };

        let mut records = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let Some(key) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if !is_valid_key(key) {
                continue;
            }

            match Self::read_record(&path) {
                Ok(Some(record)) => records.push((key.to_owned(), record)),
                Ok(None) => {}
                Err(e) => {
                    log::warn!(target: "datasell_session::kv", "msg=\"skipping unreadable record\" key=\"{key}\" error=\"{e}\"");
                }
            }
        }

        Ok(records)
    }
}
