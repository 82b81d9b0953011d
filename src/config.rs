//! Application configuration.
//!
//! Ties together the server-side cookie policy, the client timeout durations,
//! and where the file backend keeps its records.
//!
//! # Example
//!
//! ```rust,ignore
//! use datasell_session::AppConfig;
//!
//! dotenvy::dotenv().ok();
//! let config = AppConfig::from_env()?;
//! assert!(config.session.max_age.num_minutes() > 0);
//! ```

use std::path::PathBuf;
use std::time::Duration as StdDuration;

use chrono::Duration;

use crate::session::SessionConfig;
use crate::timeout::TimeoutConfig;
use crate::{SecretString, SessionError};

/// Key names read by [`AppConfig::from_env`].
pub mod env {
    pub const SESSION_SECRET: &str = "SESSION_SECRET";
    pub const SESSION_COOKIE_SECURE: &str = "SESSION_COOKIE_SECURE";
    pub const SESSION_COOKIE_NAME: &str = "SESSION_COOKIE_NAME";
    pub const SESSION_TIMEOUT_MINUTES: &str = "SESSION_TIMEOUT_MINUTES";
    pub const SESSION_WARNING_MINUTES: &str = "SESSION_WARNING_MINUTES";
    pub const SESSION_STORE_DIR: &str = "SESSION_STORE_DIR";
    pub const APP_ENV: &str = "APP_ENV";
}

const DEFAULT_STORE_DIR: &str = "./data";
const DEFAULT_TIMEOUT_MINUTES: u64 = 30;
const DEFAULT_WARNING_MINUTES: u64 = 5;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Cookie and server-side expiry policy.
    pub session: SessionConfig,

    /// Client inactivity timeout.
    pub timeout: TimeoutConfig,

    /// Root directory for [`FileKeyValueStore`](crate::FileKeyValueStore).
    pub store_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            timeout: TimeoutConfig::default(),
            store_dir: PathBuf::from(DEFAULT_STORE_DIR),
        }
    }
}

impl AppConfig {
    /// Local development preset: insecure cookies and a fixed secret.
    pub fn development() -> Self {
        Self {
            session: SessionConfig {
                cookie_secure: false,
                secret_key: SecretString::new("development-only-session-secret-key-0123456789"),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Reads configuration from process environment variables.
    pub fn from_env() -> Result<Self, SessionError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from any key lookup, e.g. a map in tests.
    ///
    /// The session cookie's max-age follows the inactivity timeout so the
    /// server forgets an idle session when the client would log it out.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SessionError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup(env::SESSION_SECRET)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                SessionError::Configuration(format!("{} is not set", env::SESSION_SECRET))
            })?;

        let cookie_secure = match lookup(env::SESSION_COOKIE_SECURE) {
            Some(value) => value == "true",
            None => lookup(env::APP_ENV).is_some_and(|v| v == "production"),
        };

        let timeout_minutes =
            parse_minutes(&lookup, env::SESSION_TIMEOUT_MINUTES, DEFAULT_TIMEOUT_MINUTES)?;
        let warning_minutes =
            parse_minutes(&lookup, env::SESSION_WARNING_MINUTES, DEFAULT_WARNING_MINUTES)?;

        let max_age = i64::try_from(timeout_minutes)
            .ok()
            .and_then(Duration::try_minutes)
            .ok_or_else(|| {
                SessionError::Configuration(format!("{} is out of range", env::SESSION_TIMEOUT_MINUTES))
            })?;

        let defaults = SessionConfig::default();
        let session = SessionConfig {
            cookie_name: lookup(env::SESSION_COOKIE_NAME)
                .unwrap_or_else(|| defaults.cookie_name.clone()),
            cookie_secure,
            max_age,
            secret_key: SecretString::new(secret),
            ..defaults
        };

        let timeout = TimeoutConfig {
            total: StdDuration::from_secs(timeout_minutes.saturating_mul(60)),
            warning_lead: StdDuration::from_secs(warning_minutes.saturating_mul(60)),
        };

        let config = Self {
            session,
            timeout,
            store_dir: lookup(env::SESSION_STORE_DIR)
                .map_or_else(|| PathBuf::from(DEFAULT_STORE_DIR), PathBuf::from),
        };
        config.validate()?;

        log::debug!(
            target: "datasell_session::config",
            "msg=\"configuration loaded\" cookie_name=\"{}\" cookie_secure={} timeout_minutes={} warning_minutes={}",
            config.session.cookie_name,
            config.session.cookie_secure,
            timeout_minutes,
            warning_minutes
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SessionError> {
        self.session
            .validate()
            .map_err(|e| SessionError::Configuration(e.to_owned()))?;
        self.timeout
            .validate()
            .map_err(|e| SessionError::Configuration(e.to_owned()))
    }
}

fn parse_minutes<F>(lookup: &F, key: &str, default: u64) -> Result<u64, SessionError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
            SessionError::Configuration(format!("{key} must be a whole number of minutes"))
        }),
    }
}
