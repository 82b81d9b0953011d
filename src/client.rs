//! HTTP implementation of [`SessionClient`] on reqwest.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use crate::SessionError;
use crate::timeout::{ProbeOutcome, SessionClient};

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_PROBE_PATH: &str = "/api/profile";
pub const DEFAULT_LOGOUT_PATH: &str = "/api/logout";

/// Talks to the session endpoints with a cookie-carrying HTTP client.
///
/// Clone is cheap; clones share the connection pool and cookie jar.
#[derive(Debug, Clone)]
pub struct HttpSessionClient {
    client: Client,
    base_url: String,
    probe_path: String,
    logout_path: String,
}

impl HttpSessionClient {
    /// Client with its own cookie jar.
    pub fn new(base_url: impl Into<String>) -> Result<Self, SessionError> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| SessionError::Configuration(e.to_string()))?;

        Ok(Self::with_client(client, base_url))
    }

    /// Reuses an existing client, e.g. one that already holds the login cookie.
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            probe_path: DEFAULT_PROBE_PATH.to_owned(),
            logout_path: DEFAULT_LOGOUT_PATH.to_owned(),
        }
    }

    #[must_use]
    pub fn probe_path(mut self, path: impl Into<String>) -> Self {
        self.probe_path = path.into();
        self
    }

    #[must_use]
    pub fn logout_path(mut self, path: impl Into<String>) -> Self {
        self.logout_path = path.into();
        self
    }

    pub fn http(&self) -> &Client {
        &self.client
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn network_error(e: reqwest::Error) -> SessionError {
    SessionError::Network(e.to_string())
}

#[async_trait]
impl SessionClient for HttpSessionClient {
    async fn probe(&self) -> Result<ProbeOutcome, SessionError> {
        let response = self
            .client
            .get(self.url(&self.probe_path))
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        log::debug!(target: "datasell_session::client", "msg=\"session probe\" status={}", status.as_u16());

        if status.is_success() {
            Ok(ProbeOutcome::Authenticated)
        } else if status == StatusCode::UNAUTHORIZED {
            Ok(ProbeOutcome::Unauthorized)
        } else {
            Err(SessionError::Network(format!(
                "unexpected probe status {}",
                status.as_u16()
            )))
        }
    }

    async fn logout(&self) -> Result<(), SessionError> {
        let response = self
            .client
            .post(self.url(&self.logout_path))
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(SessionError::Network(format!(
                "logout returned {}: {}",
                status.as_u16(),
                body.chars().take(200).collect::<String>()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_join_without_double_slash() {
        let client = HttpSessionClient::new("http://localhost:3000/").unwrap();
        assert_eq!(
            client.url(DEFAULT_PROBE_PATH),
            "http://localhost:3000/api/profile"
        );
    }

    #[test]
    fn test_custom_paths() {
        let client = HttpSessionClient::new("http://localhost:3000")
            .unwrap()
            .probe_path("/api/me")
            .logout_path("/auth/logout");
        assert_eq!(client.probe_path, "/api/me");
        assert_eq!(client.url(&client.logout_path), "http://localhost:3000/auth/logout");
    }
}
