//! `SQLite` key-value backend.
//!
//! Enable the `sqlx_sqlite` feature to use it. Run [`migrations::run`] once
//! per pool before constructing the store.

pub mod migrations;
mod store;

pub use store::SqliteKeyValueStore;
