use async_trait::async_trait;
use sqlx::{FromRow, SqlitePool};

use crate::SessionError;
use crate::kv::{KeyValueStore, StoredRecord};

/// [`KeyValueStore`] on a `kv_records` table.
#[derive(Debug, Clone)]
pub struct SqliteKeyValueStore {
    pool: SqlitePool,
}

impl SqliteKeyValueStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[derive(FromRow)]
struct RecordRow {
    key: String,
    session: Option<String>,
    expires: i64,
    created_at: Option<i64>,
}

impl From<RecordRow> for StoredRecord {
    fn from(row: RecordRow) -> Self {
        StoredRecord {
            session: row.session,
            expires: row.expires,
            created_at: row.created_at,
        }
    }
}

fn database_error(operation: &str, e: &sqlx::Error) -> SessionError {
    log::error!(target: "datasell_session::sqlite", "msg=\"database error\", operation=\"{operation}\", error=\"{e}\"");
    SessionError::Backend(e.to_string())
}

#[async_trait]
impl KeyValueStore for SqliteKeyValueStore {
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<StoredRecord>, SessionError> {
        let row: Option<RecordRow> = sqlx::query_as(
            r"SELECT key, session, expires, created_at
               FROM kv_records WHERE namespace = ? AND key = ?",
        )
        .bind(namespace)
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| database_error("get", &e))?;

        Ok(row.map(Into::into))
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, record), err))]
    async fn set(
        &self,
        namespace: &str,
        key: &str,
        record: StoredRecord,
    ) -> Result<(), SessionError> {
        sqlx::query(
            r"INSERT INTO kv_records (namespace, key, session, expires, created_at)
               VALUES (?, ?, ?, ?, ?)
               ON CONFLICT (namespace, key) DO UPDATE SET
                   session = excluded.session,
                   expires = excluded.expires,
                   created_at = excluded.created_at",
        )
        .bind(namespace)
        .bind(key)
        .bind(&record.session)
        .bind(record.expires)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| database_error("set", &e))?;

        Ok(())
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn update_expires(
        &self,
        namespace: &str,
        key: &str,
        expires: i64,
    ) -> Result<(), SessionError> {
        sqlx::query(
            r"INSERT INTO kv_records (namespace, key, expires)
               VALUES (?, ?, ?)
               ON CONFLICT (namespace, key) DO UPDATE SET expires = excluded.expires",
        )
        .bind(namespace)
        .bind(key)
        .bind(expires)
        .execute(&self.pool)
        .await
        .map_err(|e| database_error("update_expires", &e))?;

        Ok(())
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn delete(&self, namespace: &str, key: &str) -> Result<(), SessionError> {
        sqlx::query("DELETE FROM kv_records WHERE namespace = ? AND key = ?")
            .bind(namespace)
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| database_error("delete", &e))?;

        Ok(())
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn entries(&self, namespace: &str) -> Result<Vec<(String, StoredRecord)>, SessionError> {
        let rows: Vec<RecordRow> = sqlx::query_as(
            r"SELECT key, session, expires, created_at
               FROM kv_records WHERE namespace = ? ORDER BY key",
        )
        .bind(namespace)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| database_error("entries", &e))?;

        Ok(rows
            .into_iter()
            .map(|row| (row.key.clone(), row.into()))
            .collect())
    }
}
