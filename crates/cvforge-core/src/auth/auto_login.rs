//! Silent sign-in with remembered credentials, at most once per app session.
//!
//! The controller is created once when the application mounts and is fed
//! every navigation. It moves `Idle -> Attempting -> Done` and never leaves
//! `Done`, so later route changes cannot start a second attempt. A failed
//! or timed-out attempt is logged and otherwise invisible: the user stays
//! wherever the route guards put them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::credentials::Credentials;
use super::remember::RememberMePolicy;
use super::routes;
use super::session::{AuthSession, SessionProfile};

/// Upper bound on one silent login round-trip.
pub const DEFAULT_AUTO_LOGIN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum AutoLoginState {
    Idle,
    Attempting,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum SkipReason {
    SuppressedRoute,
    AlreadyAuthenticated,
    Bootstrapping,
    RememberMeDisabled,
    NoUsableCredential,
    Unmounted,
    InFlight,
    AlreadyAttempted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum AutoLoginOutcome {
    Skipped(SkipReason),
    SignedIn(SessionProfile),
    Failed { reason: String },
    TimedOut,
    /// The attempt settled after `unmount`; its result was dropped.
    Discarded,
}

pub struct AutoLoginController {
    session: Arc<dyn AuthSession>,
    policy: Arc<RememberMePolicy>,
    timeout: Duration,
    state: Mutex<AutoLoginState>,
    mounted: AtomicBool,
}

/// Moves the controller to `Done` when dropped, so an attempt whose future
/// is abandoned mid-flight still reaches the terminal state.
struct AttemptGuard<'a> {
    state: &'a Mutex<AutoLoginState>,
}

impl Drop for AttemptGuard<'_> {
    fn drop(&mut self) {
        *lock(self.state) = AutoLoginState::Done;
    }
}

fn lock(state: &Mutex<AutoLoginState>) -> MutexGuard<'_, AutoLoginState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl AutoLoginController {
    pub fn new(session: Arc<dyn AuthSession>, policy: Arc<RememberMePolicy>) -> Self {
        Self {
            session,
            policy,
            timeout: DEFAULT_AUTO_LOGIN_TIMEOUT,
            state: Mutex::new(AutoLoginState::Idle),
            mounted: AtomicBool::new(true),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn state(&self) -> AutoLoginState {
        *lock(&self.state)
    }

    /// The owning context is going away; results that arrive later are dropped.
    pub fn unmount(&self) {
        self.mounted.store(false, Ordering::SeqCst);
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    /// Evaluate a navigation to `route` and, if every condition holds, run
    /// the one silent login of this session. Never returns an error.
    pub async fn on_navigate(&self, route: &str) -> AutoLoginOutcome {
        let credentials = match self.begin_attempt(route) {
            Ok(credentials) => credentials,
            Err(reason) => {
                debug!(route, ?reason, "Auto-login skipped");
                return AutoLoginOutcome::Skipped(reason);
            }
        };
        let guard = AttemptGuard { state: &self.state };

        info!(route, "Attempting silent login with remembered credentials");
        let result = tokio::time::timeout(
            self.timeout,
            self.session.login(&credentials.email, &credentials.password),
        )
        .await;
        drop(guard);
        drop(credentials);

        let outcome = match result {
            Ok(Ok(profile)) => {
                info!(user_id = %profile.user_id, "Silent login succeeded");
                AutoLoginOutcome::SignedIn(profile)
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Silent login failed");
                self.policy.on_silent_login_failed();
                AutoLoginOutcome::Failed {
                    reason: e.to_string(),
                }
            }
            Err(_) => {
                warn!(timeout_secs = self.timeout.as_secs(), "Silent login timed out");
                self.policy.on_silent_login_failed();
                AutoLoginOutcome::TimedOut
            }
        };

        if !self.is_mounted() {
            debug!("Silent login settled after unmount; result dropped");
            return AutoLoginOutcome::Discarded;
        }
        outcome
    }

    /// Check every trigger condition and claim the attempt, all under one
    /// lock. Credentials are read and validated before any network call.
    fn begin_attempt(&self, route: &str) -> Result<Credentials, SkipReason> {
        let mut state = lock(&self.state);
        match *state {
            AutoLoginState::Attempting => return Err(SkipReason::InFlight),
            AutoLoginState::Done => return Err(SkipReason::AlreadyAttempted),
            AutoLoginState::Idle => {}
        }

        if !self.is_mounted() {
            return Err(SkipReason::Unmounted);
        }
        if routes::suppresses_auto_login(route) {
            return Err(SkipReason::SuppressedRoute);
        }
        if self.session.is_authenticated() {
            return Err(SkipReason::AlreadyAuthenticated);
        }
        if self.session.is_bootstrapping() {
            return Err(SkipReason::Bootstrapping);
        }

        let store = self.policy.store();
        if !store.is_enabled() {
            return Err(SkipReason::RememberMeDisabled);
        }
        let credentials = store.load().ok_or(SkipReason::NoUsableCredential)?;

        *state = AutoLoginState::Attempting;
        Ok(credentials)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    use crate::auth::credentials::KEY_PASSWORD;
    use crate::auth::testing::{memory_credentials, FakeAuthSession, Reply};
    use crate::storage::{KeyValueStore, WriteBatch};

    fn controller_with(
        session: Arc<FakeAuthSession>,
        policy: Arc<RememberMePolicy>,
    ) -> AutoLoginController {
        AutoLoginController::new(session, policy)
    }

    fn remembered_fixture(reply: Reply) -> (Arc<FakeAuthSession>, Arc<RememberMePolicy>) {
        let (_, _, store) = memory_credentials();
        store.save("user@x.com", "Secret123!");
        let policy = Arc::new(RememberMePolicy::new(store));
        (Arc::new(FakeAuthSession::new(reply)), policy)
    }

    #[tokio::test]
    async fn test_fires_once_across_route_changes() {
        let (session, policy) = remembered_fixture(Reply::Accept);
        let controller = controller_with(session.clone(), policy);

        let first = controller.on_navigate("/dashboard").await;
        assert!(matches!(first, AutoLoginOutcome::SignedIn(_)));

        session.set_authenticated(false);
        let second = controller.on_navigate("/profile").await;
        assert_eq!(second, AutoLoginOutcome::Skipped(SkipReason::AlreadyAttempted));

        assert_eq!(session.login_calls(), 1);
        assert_eq!(controller.state(), AutoLoginState::Done);
    }

    #[tokio::test]
    async fn test_suppressed_routes_make_no_call() {
        for route in ["/login", "/register", "/"] {
            let (session, policy) = remembered_fixture(Reply::Accept);
            let controller = controller_with(session.clone(), policy);

            let outcome = controller.on_navigate(route).await;

            assert_eq!(outcome, AutoLoginOutcome::Skipped(SkipReason::SuppressedRoute));
            assert_eq!(session.login_calls(), 0, "{route}");
            assert_eq!(controller.state(), AutoLoginState::Idle);
        }
    }

    #[tokio::test]
    async fn test_suppressed_route_then_app_route_attempts() {
        let (session, policy) = remembered_fixture(Reply::Accept);
        let controller = controller_with(session.clone(), policy);

        controller.on_navigate("/login").await;
        let outcome = controller.on_navigate("/jobs").await;

        assert!(matches!(outcome, AutoLoginOutcome::SignedIn(_)));
        assert_eq!(session.login_calls(), 1);
    }

    #[tokio::test]
    async fn test_waits_for_bootstrap() {
        let (session, policy) = remembered_fixture(Reply::Accept);
        session.set_bootstrapping(true);
        let controller = controller_with(session.clone(), policy);

        let outcome = controller.on_navigate("/dashboard").await;
        assert_eq!(outcome, AutoLoginOutcome::Skipped(SkipReason::Bootstrapping));
        assert_eq!(controller.state(), AutoLoginState::Idle);

        session.set_bootstrapping(false);
        let outcome = controller.on_navigate("/dashboard").await;
        assert!(matches!(outcome, AutoLoginOutcome::SignedIn(_)));
        assert_eq!(session.login_calls(), 1);
    }

    #[tokio::test]
    async fn test_already_authenticated_skips() {
        let (session, policy) = remembered_fixture(Reply::Accept);
        session.set_authenticated(true);
        let controller = controller_with(session.clone(), policy);

        let outcome = controller.on_navigate("/dashboard").await;
        assert_eq!(outcome, AutoLoginOutcome::Skipped(SkipReason::AlreadyAuthenticated));
        assert_eq!(session.login_calls(), 0);
    }

    #[tokio::test]
    async fn test_graceful_failure_clears_credentials() {
        let (session, policy) = remembered_fixture(Reply::Reject);
        let store = policy.store().clone();
        let controller = controller_with(session.clone(), policy);

        let outcome = controller.on_navigate("/dashboard").await;

        assert!(matches!(outcome, AutoLoginOutcome::Failed { .. }));
        assert!(!session.is_authenticated());
        assert!(store.load().is_none());
        assert!(!store.is_enabled());
        assert_eq!(controller.state(), AutoLoginState::Done);

        // No retry on the next navigation, even with a fresh credential.
        store.save("user@x.com", "Secret123!");
        let outcome = controller.on_navigate("/dashboard").await;
        assert_eq!(outcome, AutoLoginOutcome::Skipped(SkipReason::AlreadyAttempted));
        assert_eq!(session.login_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_failure() {
        let (session, policy) = remembered_fixture(Reply::Hang);
        let store = policy.store().clone();
        let controller = controller_with(session.clone(), policy);

        let outcome = controller.on_navigate("/dashboard").await;

        assert_eq!(outcome, AutoLoginOutcome::TimedOut);
        assert_eq!(controller.state(), AutoLoginState::Done);
        assert!(store.load().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_timeout() {
        let (_, policy) = remembered_fixture(Reply::Accept);
        let session = Arc::new(FakeAuthSession::new(Reply::Accept).with_delay(Duration::from_secs(5)));
        let controller = AutoLoginController::new(session.clone(), policy)
            .with_timeout(Duration::from_secs(2));

        assert_eq!(controller.on_navigate("/dashboard").await, AutoLoginOutcome::TimedOut);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_attempt_still_reaches_done() {
        let (session, policy) = remembered_fixture(Reply::Hang);
        let controller = controller_with(session.clone(), policy);

        // Caller gives up on the navigation before the login settles.
        let abandoned =
            tokio::time::timeout(Duration::from_millis(10), controller.on_navigate("/dashboard")).await;
        assert!(abandoned.is_err());

        assert_eq!(controller.state(), AutoLoginState::Done);
        let outcome = controller.on_navigate("/profile").await;
        assert_eq!(outcome, AutoLoginOutcome::Skipped(SkipReason::AlreadyAttempted));
        assert_eq!(session.login_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_result_discarded_after_unmount() {
        let (_, policy) = remembered_fixture(Reply::Accept);
        let session = Arc::new(FakeAuthSession::new(Reply::Accept).with_delay(Duration::from_secs(3)));
        let controller = controller_with(session.clone(), policy);

        let (outcome, _) = tokio::join!(controller.on_navigate("/dashboard"), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            controller.unmount();
        });

        assert_eq!(outcome, AutoLoginOutcome::Discarded);
        assert_eq!(controller.state(), AutoLoginState::Done);
    }

    #[tokio::test]
    async fn test_unmounted_controller_never_starts() {
        let (session, policy) = remembered_fixture(Reply::Accept);
        let controller = controller_with(session.clone(), policy);
        controller.unmount();

        let outcome = controller.on_navigate("/dashboard").await;
        assert_eq!(outcome, AutoLoginOutcome::Skipped(SkipReason::Unmounted));
        assert_eq!(session.login_calls(), 0);
    }

    // -------------------------------------------------------------------------
    // End-to-end scenarios
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_scenario_remembered_login_then_reload() {
        let (_, _, store) = memory_credentials();

        // First visit: manual login with the box checked.
        let policy = RememberMePolicy::new(store.clone());
        policy.set_checked(true);
        let first_session = FakeAuthSession::new(Reply::Accept);
        policy
            .sign_in(&first_session, "user@x.com", "Secret123!")
            .await
            .unwrap();

        // Reload on /dashboard: new session, new controller, same storage.
        let session = Arc::new(FakeAuthSession::new(Reply::Accept));
        let controller =
            AutoLoginController::new(session.clone(), Arc::new(RememberMePolicy::new(store)));

        let outcome = controller.on_navigate("/dashboard").await;

        assert!(matches!(outcome, AutoLoginOutcome::SignedIn(ref p) if p.email == "user@x.com"));
        assert!(session.is_authenticated());
        assert_eq!(session.login_calls(), 1);
    }

    #[tokio::test]
    async fn test_scenario_unchecked_login_then_reload() {
        let (storage, _, store) = memory_credentials();

        let policy = RememberMePolicy::new(store.clone());
        let first_session = FakeAuthSession::new(Reply::Accept);
        policy
            .sign_in(&first_session, "user@x.com", "Secret123!")
            .await
            .unwrap();
        assert!(storage.is_empty());

        let session = Arc::new(FakeAuthSession::new(Reply::Accept));
        let controller =
            AutoLoginController::new(session.clone(), Arc::new(RememberMePolicy::new(store)));

        let outcome = controller.on_navigate("/dashboard").await;

        assert_eq!(outcome, AutoLoginOutcome::Skipped(SkipReason::RememberMeDisabled));
        assert_eq!(session.login_calls(), 0);
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_scenario_expired_credential() {
        let (storage, clock, store) = memory_credentials();
        store.save("user@x.com", "Secret123!");
        clock.advance(ChronoDuration::days(31));

        let session = Arc::new(FakeAuthSession::new(Reply::Accept));
        let controller =
            AutoLoginController::new(session.clone(), Arc::new(RememberMePolicy::new(store.clone())));

        let outcome = controller.on_navigate("/profile").await;

        assert_eq!(outcome, AutoLoginOutcome::Skipped(SkipReason::NoUsableCredential));
        assert_eq!(session.login_calls(), 0);
        assert!(storage.is_empty());
        assert!(!store.is_enabled());
    }

    #[tokio::test]
    async fn test_scenario_corrupted_password() {
        let (storage, _, store) = memory_credentials();
        store.save("user@x.com", "Secret123!");
        storage
            .write(WriteBatch::new().put(KEY_PASSWORD, "U2VjcmV0!!mangled=="))
            .unwrap();

        let session = Arc::new(FakeAuthSession::new(Reply::Accept));
        let controller =
            AutoLoginController::new(session.clone(), Arc::new(RememberMePolicy::new(store)));

        let outcome = controller.on_navigate("/dashboard").await;

        assert_eq!(outcome, AutoLoginOutcome::Skipped(SkipReason::NoUsableCredential));
        assert_eq!(session.login_calls(), 0);
        assert!(storage.is_empty());
    }
}
