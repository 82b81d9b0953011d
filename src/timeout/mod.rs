//! Client-side inactivity timeout.
//!
//! Tracks user activity, warns before the session would expire, and forces a
//! logout once the user has been idle for the full timeout. This complements
//! the server-side cookie expiry; it does not replace it.
//!
//! [`InactivityTimer`] is the bare state machine: it is fed inputs and the
//! current instant and returns what should happen, with no timers or I/O of
//! its own. [`TimeoutManager`] drives it on a single tokio task, talking to
//! the server through a [`SessionClient`] and to the UI through a
//! [`TimeoutNotifier`].

mod host;
mod machine;
mod manager;

use std::time::Duration;

pub use host::{LoginNotice, ProbeOutcome, SessionClient, TimeoutNotifier};
pub use machine::InactivityTimer;
pub use manager::{TimeoutHandle, TimeoutManager};

/// Timeout durations. Both are deployment inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutConfig {
    /// Idle time after which the user is logged out.
    pub total: Duration,
    /// How long before `total` the warning is shown.
    pub warning_lead: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            total: Duration::from_secs(30 * 60),
            warning_lead: Duration::from_secs(5 * 60),
        }
    }
}

impl TimeoutConfig {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.total.is_zero() {
            return Err("total timeout must be positive");
        }
        if self.warning_lead.is_zero() {
            return Err("warning lead time must be positive");
        }
        if self.warning_lead >= self.total {
            return Err("warning lead time must be shorter than the total timeout");
        }
        Ok(())
    }

    /// Idle time before the warning fires.
    pub fn warning_after(&self) -> Duration {
        self.total.saturating_sub(self.warning_lead)
    }
}

/// Activity that counts as the user being present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityEvent {
    PointerDown,
    KeyDown,
    Scroll,
    TouchStart,
    Click,
}

impl ActivityEvent {
    pub const ALL: [ActivityEvent; 5] = [
        ActivityEvent::PointerDown,
        ActivityEvent::KeyDown,
        ActivityEvent::Scroll,
        ActivityEvent::TouchStart,
        ActivityEvent::Click,
    ];
}

/// Everything the host can tell the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutInput {
    Activity(ActivityEvent),
    /// The tab was hidden (`false`) or shown again (`true`).
    VisibilityChanged { visible: bool },
    /// "Continue session" in the warning.
    ContinueSession,
    /// "Logout now" in the warning.
    LogoutNow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutState {
    Uninitialized,
    Active,
    Warning,
    LoggedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
    /// The initial probe came back unauthorized.
    SessionExpired,
    /// The full timeout elapsed without activity.
    Inactivity,
    /// The user chose to log out from the warning.
    UserRequested,
}

impl LogoutReason {
    /// Message shown once on the login page.
    pub fn message(&self) -> &'static str {
        match self {
            LogoutReason::SessionExpired => "Your session has expired. Please log in again.",
            LogoutReason::Inactivity => {
                "Your session has expired due to inactivity. Please log in again."
            }
            LogoutReason::UserRequested => "You have been logged out. Please log in again.",
        }
    }

    /// Whether the server still holds a session worth destroying.
    pub fn needs_server_logout(&self) -> bool {
        !matches!(self, LogoutReason::SessionExpired)
    }
}

/// Shown instead of the reason's message when the server logout call fails.
pub const SESSION_ENDED_MESSAGE: &str = "Session ended. Please log in again.";

/// What the host should do after feeding the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutEffect {
    ShowWarning { remaining: Duration },
    DismissWarning,
    Logout(LogoutReason),
}
