mod config;
mod cookie;
mod store;

pub use config::{DEFAULT_PUBLIC_PATHS, SameSite, SessionConfig};
pub use cookie::{sign_session_id, verify_signed_cookie};
pub use store::{DEFAULT_MAX_AGE_MS, SESSION_NAMESPACE, SessionStore};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identity of the logged-in user, as kept in the session payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub uid: String,
    pub email: String,
    pub display_name: String,
    #[serde(default)]
    pub is_admin: bool,
}

/// Session payload stored in the `session` field of a record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<SessionUser>,
    /// Last authenticated request, epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<i64>,
    /// Per-session cookie max-age override, e.g. an admin "remember me".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_age_ms: Option<i64>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl SessionState {
    /// A fresh logged-in state with activity stamped now.
    pub fn for_user(user: SessionUser) -> Self {
        Self {
            user: Some(user),
            last_activity: Some(Utc::now().timestamp_millis()),
            ..Default::default()
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Milliseconds since the last recorded activity.
    ///
    /// A session that never recorded activity counts as fresh.
    pub fn idle_for_ms(&self, now_ms: i64) -> i64 {
        self.last_activity
            .map_or(0, |last| now_ms.saturating_sub(last).max(0))
    }
}
