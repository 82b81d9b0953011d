use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};

use super::handlers;
use super::layer::{SessionContext, session_layer};
use crate::kv::KeyValueStore;

/// `/api/check-auth`, `/api/profile` and `/api/logout`.
///
/// The routes need [`session_layer`] above them; see [`with_session_layer`].
pub fn session_routes<K>() -> Router<SessionContext<K>>
where
    K: KeyValueStore + Clone + 'static,
{
    Router::new()
        .route("/api/check-auth", get(handlers::check_auth))
        .route("/api/profile", get(handlers::profile))
        .route("/api/logout", post(handlers::logout::<K>))
}

/// Wraps `router` in the session middleware and binds its state.
pub fn with_session_layer<K>(router: Router<SessionContext<K>>, ctx: SessionContext<K>) -> Router
where
    K: KeyValueStore + Clone + 'static,
{
    router
        .layer(from_fn_with_state(ctx.clone(), session_layer::<K>))
        .with_state(ctx)
}
