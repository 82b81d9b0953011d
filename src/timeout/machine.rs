use std::time::Duration;

use tokio::time::Instant;

use super::{LogoutReason, TimeoutConfig, TimeoutEffect, TimeoutInput, TimeoutState};

/// Inactivity state machine.
///
/// `Uninitialized -> Active -> Warning -> (Active | LoggedOut)`. The timer
/// holds at most one warning deadline and one timeout deadline; every reset
/// replaces both, so timers never stack.
#[derive(Debug, Clone)]
pub struct InactivityTimer {
    config: TimeoutConfig,
    state: TimeoutState,
    warning_shown: bool,
    warning_at: Option<Instant>,
    timeout_at: Option<Instant>,
}

impl InactivityTimer {
    pub fn new(config: TimeoutConfig) -> Self {
        Self {
            config,
            state: TimeoutState::Uninitialized,
            warning_shown: false,
            warning_at: None,
            timeout_at: None,
        }
    }

    pub fn config(&self) -> &TimeoutConfig {
        &self.config
    }

    pub fn state(&self) -> TimeoutState {
        self.state
    }

    pub fn warning_shown(&self) -> bool {
        self.warning_shown
    }

    pub fn is_logged_in(&self) -> bool {
        matches!(self.state, TimeoutState::Active | TimeoutState::Warning)
    }

    pub fn warning_deadline(&self) -> Option<Instant> {
        self.warning_at
    }

    pub fn timeout_deadline(&self) -> Option<Instant> {
        self.timeout_at
    }

    /// The next instant at which [`poll`](Self::poll) has something to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        match self.state {
            TimeoutState::Active if !self.warning_shown => self.warning_at,
            TimeoutState::Active | TimeoutState::Warning => self.timeout_at,
            TimeoutState::Uninitialized | TimeoutState::LoggedOut => None,
        }
    }

    /// The probe confirmed a live session.
    pub fn start(&mut self, now: Instant) {
        if self.state == TimeoutState::Uninitialized {
            self.state = TimeoutState::Active;
            self.arm(now);
        }
    }

    /// The probe came back unauthorized.
    pub fn probe_rejected(&mut self) -> Option<TimeoutEffect> {
        if self.state != TimeoutState::Uninitialized {
            return None;
        }
        self.logout(LogoutReason::SessionExpired)
    }

    /// Feeds one host input.
    pub fn handle(&mut self, input: TimeoutInput, now: Instant) -> Option<TimeoutEffect> {
        if !self.is_logged_in() {
            return None;
        }

        // input arriving after the timeout cannot revive the session
        if self.timeout_at.is_some_and(|at| at <= now) {
            return self.logout(LogoutReason::Inactivity);
        }

        match input {
            TimeoutInput::Activity(_)
            | TimeoutInput::ContinueSession
            | TimeoutInput::VisibilityChanged { visible: true } => self.reset(now),
            TimeoutInput::VisibilityChanged { visible: false } => None,
            TimeoutInput::LogoutNow => self.logout(LogoutReason::UserRequested),
        }
    }

    /// Fires whichever deadline has passed by `now`.
    pub fn poll(&mut self, now: Instant) -> Option<TimeoutEffect> {
        if !self.is_logged_in() {
            return None;
        }

        if self.timeout_at.is_some_and(|at| at <= now) {
            return self.logout(LogoutReason::Inactivity);
        }

        if self.state == TimeoutState::Active
            && !self.warning_shown
            && self.warning_at.is_some_and(|at| at <= now)
        {
            self.warning_shown = true;
            self.state = TimeoutState::Warning;
            let remaining = self
                .timeout_at
                .map_or(Duration::ZERO, |at| at.saturating_duration_since(now));
            return Some(TimeoutEffect::ShowWarning { remaining });
        }

        None
    }

    fn arm(&mut self, now: Instant) {
        self.warning_at = Some(now + self.config.warning_after());
        self.timeout_at = Some(now + self.config.total);
    }

    fn reset(&mut self, now: Instant) -> Option<TimeoutEffect> {
        let was_warning = self.warning_shown;
        self.warning_shown = false;
        self.state = TimeoutState::Active;
        self.arm(now);

        was_warning.then_some(TimeoutEffect::DismissWarning)
    }

    fn logout(&mut self, reason: LogoutReason) -> Option<TimeoutEffect> {
        self.state = TimeoutState::LoggedOut;
        self.warning_at = None;
        self.timeout_at = None;
        Some(TimeoutEffect::Logout(reason))
    }
}
