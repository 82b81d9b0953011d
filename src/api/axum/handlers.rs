//! HTTP handlers for the session endpoints.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use super::layer::{SessionContext, SessionHandle};
use super::middleware::AuthenticatedSession;
use crate::api::{CheckAuthResponse, ErrorResponse, MessageResponse, ProfileResponse};
use crate::kv::KeyValueStore;

/// Report whether the caller has a logged-in session.
///
/// GET /api/check-auth
pub async fn check_auth(session: SessionHandle) -> Json<CheckAuthResponse> {
    let user = session.user();
    Json(CheckAuthResponse {
        success: true,
        authenticated: user.is_some(),
        user: user.map(Into::into),
    })
}

/// Profile of the logged-in user. Doubles as the client's session probe.
///
/// GET /api/profile
pub async fn profile(auth: AuthenticatedSession) -> Json<ProfileResponse> {
    Json(ProfileResponse {
        success: true,
        profile: auth.into_inner().into(),
    })
}

/// Destroy the current session.
///
/// POST /api/logout
pub async fn logout<K>(State(ctx): State<SessionContext<K>>, session: SessionHandle) -> Response
where
    K: KeyValueStore + Clone + 'static,
{
    let uid = session.user().map(|u| u.uid);

    if let Some(id) = session.id() {
        if let Err(e) = ctx.store().destroy(&id).await {
            log::error!(target: "datasell_session::api", "msg=\"logout failed\" error=\"{e}\"");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("Logout failed")),
            )
                .into_response();
        }
    }
    session.mark_removed();

    log::info!(target: "datasell_session::api", "msg=\"user logged out\" uid=\"{}\"", uid.unwrap_or_default());
    Json(MessageResponse::ok("Logged out successfully")).into_response()
}
