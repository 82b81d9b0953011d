use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use super::error::AppError;
use super::layer::SessionHandle;
use crate::SessionError;
use crate::session::SessionUser;

fn session_from_parts(parts: &Parts) -> Result<SessionHandle, AppError> {
    parts.extensions.get::<SessionHandle>().cloned().ok_or_else(|| {
        log::error!(target: "datasell_session::api", "msg=\"session layer missing from router\"");
        AppError(SessionError::Configuration(
            "session layer not installed".to_owned(),
        ))
    })
}

impl<S> FromRequestParts<S> for SessionHandle
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        session_from_parts(parts)
    }
}

/// Requires a logged-in session; rejects with 401 otherwise.
#[derive(Debug, Clone)]
pub struct AuthenticatedSession {
    user: SessionUser,
    session: SessionHandle,
}

impl AuthenticatedSession {
    pub fn user(&self) -> &SessionUser {
        &self.user
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub fn into_inner(self) -> SessionUser {
        self.user
    }
}

impl<S> FromRequestParts<S> for AuthenticatedSession
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = session_from_parts(parts)?;
        let user = session.user().ok_or(AppError(SessionError::Unauthorized))?;

        Ok(AuthenticatedSession { user, session })
    }
}
