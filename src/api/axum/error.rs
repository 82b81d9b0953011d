use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::SessionError;
use crate::api::ErrorResponse;

/// converts `SessionError` into appropriate HTTP responses
#[derive(Debug)]
pub struct AppError(pub SessionError);

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        Self(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            SessionError::Unauthorized => StatusCode::UNAUTHORIZED,
            SessionError::Backend(_)
            | SessionError::Serialization(_)
            | SessionError::Configuration(_)
            | SessionError::InvalidKey(_)
            | SessionError::Network(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            log::error!(target: "datasell_session::api", "msg=\"request failed\" error=\"{}\"", self.0);
        }

        (status, Json(ErrorResponse::from(self.0))).into_response()
    }
}
