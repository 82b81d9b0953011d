use chrono::Duration;

use crate::SecretString;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SameSite {
    None,
    #[default]
    Lax,
    Strict,
}

/// Cookie and expiry policy for the session layer.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub cookie_path: String,
    pub cookie_domain: Option<String>,
    pub cookie_secure: bool,
    pub cookie_http_only: bool,
    pub cookie_same_site: SameSite,
    /// Cookie `Max-Age`, also the TTL handed to `set`/`touch`.
    pub max_age: Duration,
    /// Re-issue the cookie and extend the stored expiry on every request.
    pub rolling: bool,
    /// Server-side inactivity limit checked against `last_activity`.
    pub idle_limit: Duration,
    /// Exact request paths the inactivity guard skips.
    pub public_paths: Vec<String>,
    pub secret_key: SecretString,
}

/// Paths that never count as activity nor trip the inactivity guard.
pub const DEFAULT_PUBLIC_PATHS: &[&str] = &[
    "/",
    "/login",
    "/signup",
    "/forgot-password",
    "/reset-password",
    "/api/login",
    "/api/signup",
    "/api/auth/verify",
    "/api/check-auth",
    "/api/health",
    "/api/ping",
];

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "datasell.sid".to_owned(),
            cookie_path: "/".to_owned(),
            cookie_domain: None,
            cookie_secure: true,
            cookie_http_only: true,
            cookie_same_site: SameSite::Lax,
            max_age: Duration::minutes(30),
            rolling: true,
            idle_limit: Duration::hours(24),
            public_paths: DEFAULT_PUBLIC_PATHS.iter().map(|p| (*p).to_owned()).collect(),
            secret_key: SecretString::new(""),
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), &'static str> {
        let secret = self.secret_key.expose_secret();
        if secret.is_empty() {
            return Err("secret_key must not be empty");
        }
        if secret.len() < 32 {
            return Err("secret_key should be at least 32 bytes");
        }
        if self.cookie_name.is_empty() {
            return Err("cookie_name must not be empty");
        }
        if self.max_age <= Duration::zero() {
            return Err("max_age must be positive");
        }
        Ok(())
    }

    /// Cookie max-age in milliseconds.
    pub fn max_age_ms(&self) -> i64 {
        self.max_age.num_milliseconds()
    }

    pub fn is_public_path(&self, path: &str) -> bool {
        self.public_paths.iter().any(|p| p == path)
    }
}
