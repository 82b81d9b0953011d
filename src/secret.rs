//! Redacted holder for the cookie signing secret.
//!
//! [`SessionConfig`](crate::SessionConfig) derives `Debug`; the key must
//! never show up in that output.

use std::fmt;

use serde::Deserialize;

/// Signing secret that prints as `[REDACTED]`.
///
/// ```rust
/// use datasell_session::SecretString;
///
/// let secret = SecretString::new("cookie-signing-secret");
/// assert_eq!(format!("{secret:?}"), "SecretString([REDACTED])");
/// assert_eq!(secret.expose_secret(), "cookie-signing-secret");
/// ```
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct SecretString(String);

impl SecretString {
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Raw key bytes for HMAC signing and length checks.
    #[must_use]
    pub fn expose_secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretString([REDACTED])")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}
