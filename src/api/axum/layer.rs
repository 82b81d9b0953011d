//! Cookie-backed session middleware.
//!
//! Loads the session named by the signed cookie before the handler runs,
//! enforces the server-side inactivity limit, and writes the session back
//! afterwards: `set` when the payload changed, `touch` when it did not and
//! the cookie is rolling, `destroy` on logout. The recorded activity time is
//! coarse, so back-to-back requests stay on the `touch` path.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::Json;
use axum::extract::{Request, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use cookie::Cookie;

use super::error::AppError;
use crate::api::ErrorResponse;
use crate::crypto::generate_session_id;
use crate::kv::KeyValueStore;
use crate::session::{
    SameSite, SessionConfig, SessionState, SessionStore, SessionUser, sign_session_id,
    verify_signed_cookie,
};
use crate::SessionError;

/// `last_activity` is rewritten at most this often; requests in between only `touch`.
const ACTIVITY_REFRESH_MS: i64 = 60_000;

/// Store and cookie policy shared by the session middleware and routes.
#[derive(Debug, Clone)]
pub struct SessionContext<K> {
    store: SessionStore<K>,
    config: Arc<SessionConfig>,
}

impl<K: KeyValueStore> SessionContext<K> {
    pub fn new(store: SessionStore<K>, config: SessionConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    pub fn store(&self) -> &SessionStore<K> {
        &self.store
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}

#[derive(Debug)]
struct SessionInner {
    id: Option<String>,
    state: SessionState,
    modified: bool,
    destroyed: bool,
    /// Already deleted from the store by the handler.
    removed: bool,
    /// Id abandoned by [`SessionHandle::establish`].
    replaced: Option<String>,
}

/// The current request's session, placed in request extensions.
///
/// Clones share the same session; changes are written back once the handler
/// returns.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    inner: Arc<Mutex<SessionInner>>,
}

impl SessionHandle {
    fn new(id: Option<String>, state: SessionState, modified: bool) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SessionInner {
                id,
                state,
                modified,
                destroyed: false,
                removed: false,
                replaced: None,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Session id, if the session has been persisted or established.
    pub fn id(&self) -> Option<String> {
        self.lock().id.clone()
    }

    pub fn state(&self) -> SessionState {
        self.lock().state.clone()
    }

    pub fn user(&self) -> Option<SessionUser> {
        self.lock().state.user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.lock().state.is_authenticated()
    }

    /// Logs `user` in under a freshly generated session id.
    ///
    /// Any previous session id is deleted when the response is written.
    pub fn establish(&self, user: SessionUser) -> String {
        let mut inner = self.lock();
        let new_id = generate_session_id();
        let previous = inner.id.replace(new_id.clone());
        if inner.replaced.is_none() {
            inner.replaced = previous;
        }
        inner.state = SessionState::for_user(user);
        inner.modified = true;
        inner.destroyed = false;
        inner.removed = false;
        new_id
    }

    /// Mutates the payload; the session is saved with `set`.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut SessionState),
    {
        let mut inner = self.lock();
        f(&mut inner.state);
        inner.modified = true;
    }

    /// Ends the session; the store record and cookie are removed on the way out.
    pub fn destroy(&self) {
        self.lock().destroyed = true;
    }

    pub(crate) fn mark_removed(&self) {
        let mut inner = self.lock();
        inner.destroyed = true;
        inner.removed = true;
    }

    fn snapshot(&self) -> Snapshot {
        let inner = self.lock();
        Snapshot {
            id: inner.id.clone(),
            state: inner.state.clone(),
            modified: inner.modified,
            destroyed: inner.destroyed,
            removed: inner.removed,
            replaced: inner.replaced.clone(),
        }
    }
}

struct Snapshot {
    id: Option<String>,
    state: SessionState,
    modified: bool,
    destroyed: bool,
    removed: bool,
    replaced: Option<String>,
}

/// Session middleware, installed with `axum::middleware::from_fn_with_state`.
pub async fn session_layer<K>(
    State(ctx): State<SessionContext<K>>,
    mut request: Request,
    next: Next,
) -> Response
where
    K: KeyValueStore + Clone + 'static,
{
    let config = ctx.config();
    let now = Utc::now().timestamp_millis();

    let cookie_id = session_id_from_headers(request.headers(), config);
    let loaded = match &cookie_id {
        Some(id) => match ctx.store().get::<SessionState>(id).await {
            Ok(state) => state,
            Err(e) => return AppError(e).into_response(),
        },
        None => None,
    };

    let (session_id, mut state) = match loaded {
        Some(state) => (cookie_id, state),
        None => (None, SessionState::default()),
    };

    let mut activity_recorded = false;
    if state.is_authenticated() && !config.is_public_path(request.uri().path()) {
        let idle_ms = state.idle_for_ms(now);
        if idle_ms > config.idle_limit.num_milliseconds() {
            return idle_timeout_response(&ctx, session_id.as_deref(), &state, idle_ms).await;
        }
        if state
            .last_activity
            .is_none_or(|last| now.saturating_sub(last) >= ACTIVITY_REFRESH_MS)
        {
            state.last_activity = Some(now);
            activity_recorded = true;
        }
    }

    let handle = SessionHandle::new(session_id, state, activity_recorded);
    request.extensions_mut().insert(handle.clone());

    let mut response = next.run(request).await;

    match commit(&ctx, &handle).await {
        Ok(Some(cookie)) => append_cookie(&mut response, &cookie),
        Ok(None) => {}
        Err(e) => return AppError(e).into_response(),
    }

    response
}

async fn idle_timeout_response<K: KeyValueStore>(
    ctx: &SessionContext<K>,
    session_id: Option<&str>,
    state: &SessionState,
    idle_ms: i64,
) -> Response {
    let uid = state.user.as_ref().map_or("", |u| u.uid.as_str());
    log::info!(target: "datasell_session::api", "msg=\"session timed out\" uid=\"{uid}\" idle_minutes={}", idle_ms / 60_000);

    if let Some(id) = session_id {
        if let Err(e) = ctx.store().destroy(id).await {
            log::error!(target: "datasell_session::api", "msg=\"failed to destroy timed out session\" error=\"{e}\"");
        }
    }

    let mut response = (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse::session_timeout()),
    )
        .into_response();
    append_cookie(&mut response, &removal_cookie(ctx.config()));
    response
}

/// Persists the session after the handler ran and returns the cookie to set.
async fn commit<K: KeyValueStore>(
    ctx: &SessionContext<K>,
    handle: &SessionHandle,
) -> Result<Option<Cookie<'static>>, SessionError> {
    let config = ctx.config();
    let session = handle.snapshot();

    if let Some(old) = &session.replaced {
        ctx.store().destroy(old).await?;
    }

    if session.destroyed {
        if let (Some(id), false) = (&session.id, session.removed) {
            ctx.store().destroy(id).await?;
        }
        return Ok(session.id.map(|_| removal_cookie(config)));
    }

    let max_age_ms = session.state.max_age_ms.unwrap_or_else(|| config.max_age_ms());

    match session.id {
        Some(id) if session.modified => {
            ctx.store().set(&id, &session.state, Some(max_age_ms)).await?;
            Ok(Some(session_cookie(config, &id, max_age_ms)))
        }
        None if session.modified => {
            let id = generate_session_id();
            ctx.store().set(&id, &session.state, Some(max_age_ms)).await?;
            Ok(Some(session_cookie(config, &id, max_age_ms)))
        }
        Some(id) if config.rolling => {
            ctx.store().touch(&id, &session.state, Some(max_age_ms)).await?;
            Ok(Some(session_cookie(config, &id, max_age_ms)))
        }
        _ => Ok(None),
    }
}

fn session_id_from_headers(headers: &HeaderMap, config: &SessionConfig) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == config.cookie_name)
        .and_then(|cookie| verify_signed_cookie(cookie.value(), &config.secret_key))
}

fn same_site(value: SameSite) -> cookie::SameSite {
    match value {
        SameSite::None => cookie::SameSite::None,
        SameSite::Lax => cookie::SameSite::Lax,
        SameSite::Strict => cookie::SameSite::Strict,
    }
}

fn base_cookie(config: &SessionConfig, value: String) -> Cookie<'static> {
    let mut builder = Cookie::build((config.cookie_name.clone(), value))
        .path(config.cookie_path.clone())
        .http_only(config.cookie_http_only)
        .secure(config.cookie_secure)
        .same_site(same_site(config.cookie_same_site));

    if let Some(domain) = &config.cookie_domain {
        builder = builder.domain(domain.clone());
    }

    builder.build()
}

fn session_cookie(config: &SessionConfig, session_id: &str, max_age_ms: i64) -> Cookie<'static> {
    let mut cookie = base_cookie(config, sign_session_id(session_id, &config.secret_key));
    cookie.set_max_age(cookie::time::Duration::milliseconds(max_age_ms));
    cookie
}

fn removal_cookie(config: &SessionConfig) -> Cookie<'static> {
    let mut cookie = base_cookie(config, String::new());
    cookie.make_removal();
    cookie
}

fn append_cookie(response: &mut Response, cookie: &Cookie<'_>) {
    match HeaderValue::from_str(&cookie.to_string()) {
        Ok(value) => {
            response.headers_mut().append(SET_COOKIE, value);
        }
        Err(e) => {
            log::error!(target: "datasell_session::api", "msg=\"invalid session cookie header\" error=\"{e}\"");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SecretString;

    fn config() -> SessionConfig {
        SessionConfig {
            secret_key: SecretString::new("layer-test-secret-key-that-is-long-enough"),
            ..Default::default()
        }
    }

    fn user() -> SessionUser {
        SessionUser {
            uid: "u1".to_owned(),
            email: "esi@example.com".to_owned(),
            display_name: "Esi".to_owned(),
            is_admin: false,
        }
    }

    #[test]
    fn test_session_cookie_attributes() {
        let header = session_cookie(&config(), "abc", 30 * 60 * 1000).to_string();
        assert!(header.starts_with("datasell.sid=abc."));
        assert!(header.contains("HttpOnly"));
        assert!(header.contains("Secure"));
        assert!(header.contains("SameSite=Lax"));
        assert!(header.contains("Path=/"));
        assert!(header.contains("Max-Age=1800"));
    }

    #[test]
    fn test_removal_cookie_expires_immediately() {
        let header = removal_cookie(&config()).to_string();
        assert!(header.starts_with("datasell.sid=;"));
        assert!(header.contains("Max-Age=0"));
    }

    #[test]
    fn test_reads_signed_cookie_among_others() {
        let config = config();
        let signed = sign_session_id("sess123", &config.secret_key);
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("theme=dark; datasell.sid={signed}")).unwrap(),
        );
        assert_eq!(
            session_id_from_headers(&headers, &config),
            Some("sess123".to_owned())
        );
    }

    #[test]
    fn test_unsigned_cookie_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("datasell.sid=sess123"));
        assert_eq!(session_id_from_headers(&headers, &config()), None);
    }

    #[test]
    fn test_establish_regenerates_id() {
        let handle = SessionHandle::new(Some("old".to_owned()), SessionState::default(), false);
        let new_id = handle.establish(user());

        assert_ne!(new_id, "old");
        assert_eq!(handle.id(), Some(new_id));
        assert!(handle.is_authenticated());

        let snapshot = handle.snapshot();
        assert!(snapshot.modified);
        assert_eq!(snapshot.replaced.as_deref(), Some("old"));
    }

    #[test]
    fn test_clones_share_state() {
        let handle = SessionHandle::new(None, SessionState::default(), false);
        let other = handle.clone();
        other.update(|state| {
            state.extra.insert("cart".to_owned(), serde_json::json!(3));
        });
        assert_eq!(handle.state().extra["cart"], 3);
        assert!(handle.snapshot().modified);
    }
}
