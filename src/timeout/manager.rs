use tokio::sync::mpsc;
use tokio::time::Instant;

use super::{
    ActivityEvent, InactivityTimer, LogoutReason, ProbeOutcome, SESSION_ENDED_MESSAGE,
    SessionClient, TimeoutConfig, TimeoutEffect, TimeoutInput, TimeoutNotifier, TimeoutState,
};

/// Sending half given to the host's event listeners.
///
/// Every send returns `false` once the manager has stopped listening, which
/// happens on logout or when the manager task ends.
#[derive(Debug, Clone)]
pub struct TimeoutHandle {
    tx: mpsc::UnboundedSender<TimeoutInput>,
}

impl TimeoutHandle {
    pub fn send(&self, input: TimeoutInput) -> bool {
        self.tx.send(input).is_ok()
    }

    pub fn activity(&self, event: ActivityEvent) -> bool {
        self.send(TimeoutInput::Activity(event))
    }

    pub fn visibility_changed(&self, visible: bool) -> bool {
        self.send(TimeoutInput::VisibilityChanged { visible })
    }

    pub fn continue_session(&self) -> bool {
        self.send(TimeoutInput::ContinueSession)
    }

    pub fn logout_now(&self) -> bool {
        self.send(TimeoutInput::LogoutNow)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

enum Step {
    Input(Option<TimeoutInput>),
    Deadline,
}

/// Drives an [`InactivityTimer`] on one task.
///
/// Inputs and deadlines are handled in order on that task, so the timer never
/// sees two events at once. Dropping every [`TimeoutHandle`] is treated as
/// the page going away: the manager detaches and returns.
pub struct TimeoutManager<C, N> {
    timer: InactivityTimer,
    client: C,
    notifier: N,
    inputs: mpsc::UnboundedReceiver<TimeoutInput>,
}

impl<C, N> TimeoutManager<C, N>
where
    C: SessionClient,
    N: TimeoutNotifier,
{
    pub fn new(config: TimeoutConfig, client: C, notifier: N) -> (Self, TimeoutHandle) {
        let (tx, inputs) = mpsc::unbounded_channel();
        let manager = Self {
            timer: InactivityTimer::new(config),
            client,
            notifier,
            inputs,
        };
        (manager, TimeoutHandle { tx })
    }

    pub fn state(&self) -> TimeoutState {
        self.timer.state()
    }

    pub fn timer(&self) -> &InactivityTimer {
        &self.timer
    }

    /// Probes the server once and arms the timer if the session is live.
    ///
    /// An unauthorized probe sends the user to the login page. A failed
    /// probe leaves the manager uninitialized.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "timeout_manager.init", skip_all)
    )]
    pub async fn init(&mut self) -> TimeoutState {
        if self.timer.state() != TimeoutState::Uninitialized {
            return self.timer.state();
        }

        match self.client.probe().await {
            Ok(ProbeOutcome::Authenticated) => {
                self.timer.start(Instant::now());
                let config = self.timer.config();
                log::info!(
                    target: "datasell_session::timeout",
                    "msg=\"inactivity timeout started\" total_secs={} warning_lead_secs={}",
                    config.total.as_secs(),
                    config.warning_lead.as_secs()
                );
            }
            Ok(ProbeOutcome::Unauthorized) => {
                log::info!(target: "datasell_session::timeout", "msg=\"session probe unauthorized\"");
                let effect = self.timer.probe_rejected();
                self.apply(effect).await;
            }
            Err(e) => {
                log::error!(target: "datasell_session::timeout", "msg=\"session probe failed\" error=\"{e}\"");
            }
        }

        self.timer.state()
    }

    /// Runs until logout or until every handle is dropped.
    pub async fn run(mut self) -> TimeoutState {
        self.init().await;

        while let Some(deadline) = self.timer.next_deadline() {
            // an elapsed deadline wins over queued input
            let step = tokio::select! {
                biased;
                () = tokio::time::sleep_until(deadline) => Step::Deadline,
                input = self.inputs.recv() => Step::Input(input),
            };

            match step {
                Step::Input(Some(input)) => {
                    log::trace!(target: "datasell_session::timeout", "msg=\"input\" input={input:?}");
                    let effect = self.timer.handle(input, Instant::now());
                    self.apply(effect).await;
                }
                Step::Input(None) => {
                    self.detach();
                    break;
                }
                Step::Deadline => {
                    let effect = self.timer.poll(Instant::now());
                    self.apply(effect).await;
                }
            }
        }

        self.timer.state()
    }

    fn detach(&mut self) {
        if self.timer.warning_shown() {
            self.notifier.on_warning_dismissed();
        }
        log::debug!(target: "datasell_session::timeout", "msg=\"timeout manager detached\" state={:?}", self.timer.state());
    }

    async fn apply(&mut self, effect: Option<TimeoutEffect>) {
        let Some(effect) = effect else {
            return;
        };

        match effect {
            TimeoutEffect::ShowWarning { remaining } => {
                log::info!(
                    target: "datasell_session::timeout",
                    "msg=\"inactivity warning shown\" remaining_secs={}",
                    remaining.as_secs()
                );
                self.notifier.on_warning(remaining);
            }
            TimeoutEffect::DismissWarning => {
                log::debug!(target: "datasell_session::timeout", "msg=\"inactivity warning dismissed\"");
                self.notifier.on_warning_dismissed();
            }
            TimeoutEffect::Logout(reason) => self.logout(reason).await,
        }
    }

    async fn logout(&mut self, reason: LogoutReason) {
        // stop listening before the network call so late input is dropped
        self.inputs.close();

        if self.timer.warning_shown() {
            self.notifier.on_warning_dismissed();
        }

        let mut message = reason.message();
        if reason.needs_server_logout() {
            if let Err(e) = self.client.logout().await {
                log::warn!(target: "datasell_session::timeout", "msg=\"server logout failed\" error=\"{e}\"");
                message = SESSION_ENDED_MESSAGE;
            }
        }

        log::info!(target: "datasell_session::timeout", "msg=\"logged out\" reason={reason:?}");
        self.notifier.on_logged_out(reason, message);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::SessionError;
    use crate::timeout::LoginNotice;

    const MIN: Duration = Duration::from_secs(60);

    #[derive(Clone)]
    struct FakeClient {
        probe: Result<ProbeOutcome, String>,
        logout_fails: bool,
        logout_calls: Arc<AtomicUsize>,
    }

    impl FakeClient {
        fn authenticated() -> Self {
            Self {
                probe: Ok(ProbeOutcome::Authenticated),
                logout_fails: false,
                logout_calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl SessionClient for FakeClient {
        async fn probe(&self) -> Result<ProbeOutcome, SessionError> {
            self.probe.clone().map_err(SessionError::Network)
        }

        async fn logout(&self) -> Result<(), SessionError> {
            self.logout_calls.fetch_add(1, Ordering::SeqCst);
            if self.logout_fails {
                Err(SessionError::Network("connection refused".to_owned()))
            } else {
                Ok(())
            }
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Seen {
        Warning(Duration),
        Dismissed,
        LoggedOut(LogoutReason),
    }

    #[derive(Clone, Default)]
    struct Recorder {
        seen: Arc<Mutex<Vec<Seen>>>,
        notice: LoginNotice,
    }

    impl Recorder {
        fn seen(&self) -> Vec<Seen> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl TimeoutNotifier for Recorder {
        fn on_warning(&self, remaining: Duration) {
            self.seen.lock().unwrap().push(Seen::Warning(remaining));
        }

        fn on_warning_dismissed(&self) {
            self.seen.lock().unwrap().push(Seen::Dismissed);
        }

        fn on_logged_out(&self, reason: LogoutReason, message: &'static str) {
            self.notice.store(message);
            self.seen.lock().unwrap().push(Seen::LoggedOut(reason));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_user_is_warned_then_logged_out() {
        let client = FakeClient::authenticated();
        let recorder = Recorder::default();
        let (manager, handle) =
            TimeoutManager::new(TimeoutConfig::default(), client.clone(), recorder.clone());
        let task = tokio::spawn(manager.run());

        tokio::time::sleep(25 * MIN + Duration::from_secs(1)).await;
        assert_eq!(recorder.seen(), vec![Seen::Warning(5 * MIN)]);

        tokio::time::sleep(5 * MIN).await;
        let state = task.await.unwrap();

        assert_eq!(state, TimeoutState::LoggedOut);
        assert_eq!(client.logout_calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            recorder.seen(),
            vec![
                Seen::Warning(5 * MIN),
                Seen::Dismissed,
                Seen::LoggedOut(LogoutReason::Inactivity)
            ]
        );
        assert_eq!(
            recorder.notice.take().as_deref(),
            Some(LogoutReason::Inactivity.message())
        );
        assert!(!handle.activity(ActivityEvent::Click));
    }

    #[tokio::test(start_paused = true)]
    async fn test_activity_during_warning_keeps_session() {
        let client = FakeClient::authenticated();
        let recorder = Recorder::default();
        let (manager, handle) =
            TimeoutManager::new(TimeoutConfig::default(), client.clone(), recorder.clone());
        let task = tokio::spawn(manager.run());

        tokio::time::sleep(26 * MIN).await;
        assert!(handle.activity(ActivityEvent::KeyDown));

        // past the original 30 minute mark
        tokio::time::sleep(10 * MIN).await;
        assert_eq!(recorder.seen(), vec![Seen::Warning(5 * MIN), Seen::Dismissed]);
        assert_eq!(client.logout_calls.load(Ordering::SeqCst), 0);

        drop(handle);
        assert_eq!(task.await.unwrap(), TimeoutState::Active);
    }

    #[tokio::test(start_paused = true)]
    async fn test_activity_queued_after_timeout_does_not_revive() {
        for _ in 0..20 {
            let client = FakeClient::authenticated();
            let recorder = Recorder::default();
            let (mut manager, handle) =
                TimeoutManager::new(TimeoutConfig::default(), client.clone(), recorder.clone());
            assert_eq!(manager.init().await, TimeoutState::Active);

            // the task was starved past both deadlines with input waiting
            tokio::time::advance(40 * MIN).await;
            assert!(handle.activity(ActivityEvent::Click));

            assert_eq!(manager.run().await, TimeoutState::LoggedOut);
            assert_eq!(client.logout_calls.load(Ordering::SeqCst), 1);
            assert_eq!(
                recorder.seen().last(),
                Some(&Seen::LoggedOut(LogoutReason::Inactivity))
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_logout_now_from_warning() {
        let client = FakeClient::authenticated();
        let recorder = Recorder::default();
        let (manager, handle) =
            TimeoutManager::new(TimeoutConfig::default(), client.clone(), recorder.clone());
        let task = tokio::spawn(manager.run());

        tokio::time::sleep(25 * MIN + Duration::from_secs(1)).await;
        assert!(handle.logout_now());

        assert_eq!(task.await.unwrap(), TimeoutState::LoggedOut);
        assert_eq!(client.logout_calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            recorder.seen().last(),
            Some(&Seen::LoggedOut(LogoutReason::UserRequested))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_server_logout_still_redirects() {
        let client = FakeClient {
            logout_fails: true,
            ..FakeClient::authenticated()
        };
        let recorder = Recorder::default();
        let (manager, _handle) =
            TimeoutManager::new(TimeoutConfig::default(), client.clone(), recorder.clone());

        assert_eq!(manager.run().await, TimeoutState::LoggedOut);
        assert_eq!(client.logout_calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            recorder.notice.take().as_deref(),
            Some(SESSION_ENDED_MESSAGE)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unauthorized_probe_redirects_without_logout_call() {
        let client = FakeClient {
            probe: Ok(ProbeOutcome::Unauthorized),
            ..FakeClient::authenticated()
        };
        let recorder = Recorder::default();
        let (mut manager, handle) =
            TimeoutManager::new(TimeoutConfig::default(), client.clone(), recorder.clone());

        assert_eq!(manager.init().await, TimeoutState::LoggedOut);
        assert_eq!(client.logout_calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            recorder.seen(),
            vec![Seen::LoggedOut(LogoutReason::SessionExpired)]
        );
        assert_eq!(
            recorder.notice.take().as_deref(),
            Some("Your session has expired. Please log in again.")
        );
        assert!(handle.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_failure_stays_uninitialized() {
        let client = FakeClient {
            probe: Err("dns failure".to_owned()),
            ..FakeClient::authenticated()
        };
        let recorder = Recorder::default();
        let (manager, handle) =
            TimeoutManager::new(TimeoutConfig::default(), client.clone(), recorder.clone());

        assert_eq!(manager.run().await, TimeoutState::Uninitialized);
        assert!(recorder.seen().is_empty());
        assert!(!handle.activity(ActivityEvent::Scroll));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handles_detaches() {
        let recorder = Recorder::default();
        let (manager, handle) = TimeoutManager::new(
            TimeoutConfig::default(),
            FakeClient::authenticated(),
            recorder.clone(),
        );
        let task = tokio::spawn(manager.run());

        tokio::time::sleep(25 * MIN + Duration::from_secs(1)).await;
        drop(handle);

        assert_eq!(task.await.unwrap(), TimeoutState::Warning);
        assert_eq!(recorder.seen(), vec![Seen::Warning(5 * MIN), Seen::Dismissed]);
    }
}
