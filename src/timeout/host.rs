use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::LogoutReason;
use crate::SessionError;

/// Result of the session probe made at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Authenticated,
    Unauthorized,
}

/// Server calls the timeout manager needs.
#[async_trait]
pub trait SessionClient: Send + Sync {
    /// Hits an authenticated endpoint to learn whether the session is live.
    async fn probe(&self) -> Result<ProbeOutcome, SessionError>;

    /// Asks the server to destroy the session.
    async fn logout(&self) -> Result<(), SessionError>;
}

/// UI side of the timeout manager.
pub trait TimeoutNotifier: Send + Sync {
    /// Show the warning with the time left before logout.
    fn on_warning(&self, remaining: Duration);

    fn on_warning_dismissed(&self);

    /// Navigate to the login page, carrying `message`.
    fn on_logged_out(&self, reason: LogoutReason, message: &'static str);
}

/// One-shot message handed from a forced logout to the login page.
///
/// The login page calls [`take`](Self::take) once; the message is cleared on
/// read so a reload does not show it again.
#[derive(Debug, Clone, Default)]
pub struct LoginNotice {
    inner: Arc<Mutex<Option<String>>>,
}

impl LoginNotice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self, message: impl Into<String>) {
        match self.inner.lock() {
            Ok(mut slot) => *slot = Some(message.into()),
            Err(_) => {
                log::warn!(target: "datasell_session::timeout", "msg=\"login notice lock poisoned\"");
            }
        }
    }

    pub fn take(&self) -> Option<String> {
        self.inner.lock().ok().and_then(|mut slot| slot.take())
    }

    pub fn is_set(&self) -> bool {
        self.inner.lock().is_ok_and(|slot| slot.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_is_read_once() {
        let notice = LoginNotice::new();
        assert!(notice.take().is_none());

        notice.store(LogoutReason::Inactivity.message());
        assert!(notice.is_set());
        assert_eq!(
            notice.take().as_deref(),
            Some("Your session has expired due to inactivity. Please log in again.")
        );
        assert!(notice.take().is_none());
    }

    #[test]
    fn test_notice_clones_share_slot() {
        let notice = LoginNotice::new();
        let login_page = notice.clone();
        notice.store("bye");
        assert_eq!(login_page.take().as_deref(), Some("bye"));
        assert!(!notice.is_set());
    }

    #[test]
    fn test_later_store_overwrites() {
        let notice = LoginNotice::new();
        notice.store("first");
        notice.store("second");
        assert_eq!(notice.take().as_deref(), Some("second"));
    }
}
