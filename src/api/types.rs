use serde::Serialize;

use crate::SessionError;
use crate::session::SessionUser;

/// Error body: `{"success": false, "error": "...", "code": "..."}`.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            code: None,
        }
    }

    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Body returned when the server-side inactivity guard ends a session.
    pub fn session_timeout() -> Self {
        Self::new("Session expired due to inactivity. Please login again.")
            .with_code("SESSION_TIMEOUT")
    }
}

impl From<SessionError> for ErrorResponse {
    fn from(err: SessionError) -> Self {
        Self::new(err.to_string())
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Public view of the logged-in user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub uid: String,
    pub email: String,
    pub display_name: String,
    pub is_admin: bool,
}

impl From<SessionUser> for UserProfile {
    fn from(user: SessionUser) -> Self {
        Self {
            uid: user.uid,
            email: user.email,
            display_name: user.display_name,
            is_admin: user.is_admin,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CheckAuthResponse {
    pub success: bool,
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserProfile>,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub success: bool,
    pub profile: UserProfile,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_shape() {
        let body = serde_json::to_value(ErrorResponse::new("Authentication required")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"success": false, "error": "Authentication required"})
        );
    }

    #[test]
    fn test_session_timeout_body() {
        let body = serde_json::to_value(ErrorResponse::session_timeout()).unwrap();
        assert_eq!(body["code"], "SESSION_TIMEOUT");
        assert_eq!(body["success"], false);
    }

    #[test]
    fn test_profile_is_camel_case() {
        let profile = UserProfile::from(SessionUser {
            uid: "u1".to_owned(),
            email: "ama@example.com".to_owned(),
            display_name: "Ama".to_owned(),
            is_admin: true,
        });
        let body = serde_json::to_value(profile).unwrap();
        assert_eq!(body["displayName"], "Ama");
        assert_eq!(body["isAdmin"], true);
    }
}
