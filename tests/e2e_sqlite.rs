//! End-to-end tests for the `SQLite` key-value backend.
//!
//! Every test opens its own in-memory database.
//! Run with: `cargo test --features sqlx_sqlite --test e2e_sqlite`

#![cfg(feature = "sqlx_sqlite")]
#![allow(clippy::unwrap_used, clippy::expect_used)]

use chrono::Utc;
use datasell_session::sqlite::{SqliteKeyValueStore, migrations};
use datasell_session::{KeyValueStore, SessionState, SessionStore, SessionUser, StoredRecord};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

const HOUR_MS: i64 = 60 * 60 * 1000;

async fn setup_db() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to connect to in-memory SQLite database");

    migrations::run(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

fn state(uid: &str) -> SessionState {
    SessionState::for_user(SessionUser {
        uid: uid.to_owned(),
        email: format!("{uid}@example.com"),
        display_name: format!("User {uid}"),
        is_admin: false,
    })
}

#[tokio::test]
async fn test_migrations_are_idempotent() {
    let pool = setup_db().await;
    migrations::run(&pool).await.unwrap();

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _datasell_migrations")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(applied, 1);
}

#[tokio::test]
async fn test_record_round_trip_and_overwrite() {
    let store = SqliteKeyValueStore::new(setup_db().await);

    assert!(store.get("sessions", "k").await.unwrap().is_none());

    store
        .set("sessions", "k", StoredRecord::new("{}".to_owned(), 10, 1))
        .await
        .unwrap();
    store
        .set("sessions", "k", StoredRecord::new("{\"a\":1}".to_owned(), 20, 2))
        .await
        .unwrap();

    let record = store.get("sessions", "k").await.unwrap().unwrap();
    assert_eq!(record.session.as_deref(), Some("{\"a\":1}"));
    assert_eq!(record.expires, 20);
    assert_eq!(record.created_at, Some(2));
}

#[tokio::test]
async fn test_update_expires_only_touches_expiry() {
    let store = SqliteKeyValueStore::new(setup_db().await);
    store
        .set("sessions", "k", StoredRecord::new("{}".to_owned(), 10, 1))
        .await
        .unwrap();

    store.update_expires("sessions", "k", 99).await.unwrap();
    let record = store.get("sessions", "k").await.unwrap().unwrap();
    assert_eq!(record.expires, 99);
    assert_eq!(record.session.as_deref(), Some("{}"));
    assert_eq!(record.created_at, Some(1));

    store.update_expires("sessions", "bare", 5).await.unwrap();
    let bare = store.get("sessions", "bare").await.unwrap().unwrap();
    assert!(bare.session.is_none());
    assert_eq!(bare.expires, 5);
}

#[tokio::test]
async fn test_namespaces_are_isolated() {
    let store = SqliteKeyValueStore::new(setup_db().await);
    store
        .set("sessions", "k", StoredRecord::new("{}".to_owned(), 10, 1))
        .await
        .unwrap();

    assert!(store.get("other", "k").await.unwrap().is_none());
    assert!(store.entries("other").await.unwrap().is_empty());
    assert_eq!(store.entries("sessions").await.unwrap().len(), 1);

    store.delete("other", "k").await.unwrap();
    assert!(store.get("sessions", "k").await.unwrap().is_some());
}

#[tokio::test]
async fn test_session_store_contract() {
    let store = SessionStore::new(SqliteKeyValueStore::new(setup_db().await));
    let a = state("a");

    assert!(store.get::<SessionState>("missing").await.unwrap().is_none());

    store.set("sid", &a, Some(HOUR_MS)).await.unwrap();
    store.touch("sid", &state("b"), Some(2 * HOUR_MS)).await.unwrap();
    assert_eq!(store.get::<SessionState>("sid").await.unwrap(), Some(a));

    let expires = store.get_record("sid").await.unwrap().unwrap().expires;
    assert!(expires > Utc::now().timestamp_millis() + HOUR_MS);

    store.destroy("sid").await.unwrap();
    assert!(store.get::<SessionState>("sid").await.unwrap().is_none());
}

#[tokio::test]
async fn test_expired_and_corrupt_rows_are_removed() {
    let store = SessionStore::new(SqliteKeyValueStore::new(setup_db().await));

    store.set("old", &state("a"), Some(-1)).await.unwrap();
    store
        .backend()
        .set(
            "sessions",
            "corrupt",
            StoredRecord::new("not json".to_owned(), i64::MAX, 0),
        )
        .await
        .unwrap();

    assert!(store.get::<SessionState>("old").await.unwrap().is_none());
    assert!(store.get::<SessionState>("corrupt").await.unwrap().is_none());
    assert!(store.backend().entries("sessions").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_prune_expired() {
    let store = SessionStore::new(SqliteKeyValueStore::new(setup_db().await));
    store.set("live", &state("a"), Some(HOUR_MS)).await.unwrap();
    store.set("dead", &state("b"), Some(-1)).await.unwrap();

    assert_eq!(store.prune_expired().await.unwrap(), 1);
    assert_eq!(store.backend().entries("sessions").await.unwrap().len(), 1);
}
