//! The "remember me" checkbox and what it does to stored credentials.
//!
//! `decide` is the whole policy as a pure function; `RememberMePolicy`
//! carries the checkbox state and applies decisions to a `CredentialStore`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::credentials::CredentialStore;
use super::session::{AuthError, AuthSession, SessionProfile};
use super::validation::validate_login;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceAction {
    Save,
    Clear,
    Keep,
}

/// What happens to stored credentials on logout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogoutBehavior {
    #[default]
    Forget,
    Keep,
}

/// A failed login while remembering clears the stored pair, even one that
/// worked in an earlier session. Stale credentials must not be retried.
pub fn decide(remember_checked: bool, outcome: LoginOutcome) -> PersistenceAction {
    match (outcome, remember_checked) {
        (LoginOutcome::Succeeded, true) => PersistenceAction::Save,
        (LoginOutcome::Succeeded, false) => PersistenceAction::Clear,
        (LoginOutcome::Failed, true) => PersistenceAction::Clear,
        (LoginOutcome::Failed, false) => PersistenceAction::Keep,
    }
}

pub struct RememberMePolicy {
    store: Arc<CredentialStore>,
    checked: AtomicBool,
    logout_behavior: LogoutBehavior,
}

impl RememberMePolicy {
    /// The checkbox starts out reflecting the stored flag.
    pub fn new(store: Arc<CredentialStore>) -> Self {
        let checked = store.is_enabled();
        Self {
            store,
            checked: AtomicBool::new(checked),
            logout_behavior: LogoutBehavior::default(),
        }
    }

    pub fn with_logout_behavior(mut self, behavior: LogoutBehavior) -> Self {
        self.logout_behavior = behavior;
        self
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    pub fn is_checked(&self) -> bool {
        self.checked.load(Ordering::SeqCst)
    }

    /// Unchecking forgets stored credentials right away.
    pub fn set_checked(&self, checked: bool) {
        let was = self.checked.swap(checked, Ordering::SeqCst);
        if !checked {
            if was {
                info!("Remember me turned off");
            }
            self.store.clear();
        }
    }

    pub fn on_login_succeeded(&self, email: &str, password: &str) {
        self.apply(decide(self.is_checked(), LoginOutcome::Succeeded), Some((email, password)));
    }

    pub fn on_login_failed(&self) {
        self.apply(decide(self.is_checked(), LoginOutcome::Failed), None);
    }

    /// A silent login only runs with remember-me in effect, so its failure
    /// always clears.
    pub fn on_silent_login_failed(&self) {
        self.apply(decide(true, LoginOutcome::Failed), None);
    }

    pub fn on_logout(&self) {
        match self.logout_behavior {
            LogoutBehavior::Forget => self.store.clear(),
            LogoutBehavior::Keep => debug!("Keeping remembered credentials after logout"),
        }
    }

    /// Manual login from a form: validate, call the session, apply the policy.
    /// Errors are returned to the caller for display.
    pub async fn sign_in(
        &self,
        session: &dyn AuthSession,
        email: &str,
        password: &str,
    ) -> Result<SessionProfile, AuthError> {
        validate_login(email, password)?;
        let email = email.trim();

        match session.login(email, password).await {
            Ok(profile) => {
                self.on_login_succeeded(email, password);
                Ok(profile)
            }
            Err(e) => {
                self.on_login_failed();
                Err(e)
            }
        }
    }

    pub async fn sign_out(&self, session: &dyn AuthSession) -> Result<(), AuthError> {
        let result = session.logout().await;
        self.on_logout();
        result
    }

    fn apply(&self, action: PersistenceAction, pair: Option<(&str, &str)>) {
        debug!(?action, "Applying remember-me policy");
        match (action, pair) {
            (PersistenceAction::Save, Some((email, password))) => self.store.save(email, password),
            (PersistenceAction::Save, None) | (PersistenceAction::Keep, _) => {}
            (PersistenceAction::Clear, _) => self.store.clear(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
