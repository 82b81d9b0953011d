pub mod api;
pub mod config;
pub mod crypto;
pub mod kv;
pub mod secret;
pub mod session;
pub mod timeout;

#[cfg(feature = "http_client")]
pub mod client;

#[cfg(feature = "sqlx_sqlite")]
pub mod sqlite;

pub use config::AppConfig;
pub use kv::{FileKeyValueStore, InMemoryKeyValueStore, KeyValueStore, StoredRecord};
pub use secret::SecretString;
pub use session::{SessionConfig, SessionState, SessionStore, SessionUser};
pub use timeout::{
    ActivityEvent, InactivityTimer, LoginNotice, LogoutReason, ProbeOutcome, SessionClient,
    TimeoutConfig, TimeoutHandle, TimeoutInput, TimeoutManager, TimeoutNotifier, TimeoutState,
};

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    /// The persistent key-value backend failed to read or write.
    Backend(String),
    /// A session payload could not be serialized.
    Serialization(String),
    /// Invalid or missing configuration.
    Configuration(String),
    /// A key or namespace contains characters the backend cannot store.
    InvalidKey(String),
    /// The server rejected the current session.
    Unauthorized,
    /// A probe or logout request never reached the server.
    Network(String),
}

impl std::error::Error for SessionError {}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Backend(msg) => write!(f, "Session backend error: {}", msg),
            SessionError::Serialization(msg) => write!(f, "Session serialization error: {}", msg),
            SessionError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            SessionError::InvalidKey(key) => write!(f, "Invalid session key: {}", key),
            SessionError::Unauthorized => write!(f, "Authentication required"),
            SessionError::Network(msg) => write!(f, "Network error: {}", msg),
        }
    }
}
