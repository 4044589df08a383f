//! Wiring of the session layer for one CLI run.
//!
//! One `App` is one application session: a single auto-login controller,
//! created at startup and shared by every navigation in the run.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use cvforge_core::api::{ApiClient, RemoteAuthSession};
use cvforge_core::auth::{
    AuthSession, AutoLoginController, AutoLoginOutcome, RememberMePolicy, SessionFile,
    SessionProfile,
};
use cvforge_core::clock::SystemClock;
use cvforge_core::Config;

/// Snapshot printed by `cvforge status`.
#[derive(Debug)]
pub struct Status {
    pub remember_enabled: bool,
    pub remembered_email: Option<String>,
    pub saved_at: Option<DateTime<Utc>>,
    pub signed_in_as: Option<SessionProfile>,
    pub minutes_until_expiry: Option<i64>,
    pub needs_refresh: bool,
}

pub struct App {
    session: Arc<RemoteAuthSession>,
    policy: Arc<RememberMePolicy>,
    auto_login: AutoLoginController,
}

impl App {
    pub fn new(config: &Config) -> Result<Self> {
        let data_dir = config.data_dir()?;
        debug!(?data_dir, "Data directory configured");

        let storage = config.open_storage()?;
        let store = Arc::new(config.credential_store(storage, Arc::new(SystemClock))?);
        let policy = Arc::new(
            RememberMePolicy::new(store).with_logout_behavior(config.logout_behavior),
        );

        let api = ApiClient::new(config.api_base_url.clone())
            .context("Failed to build HTTP client")?;
        let session = Arc::new(RemoteAuthSession::new(api, Some(SessionFile::new(&data_dir))));

        let auto_login = AutoLoginController::new(session.clone(), policy.clone())
            .with_timeout(config.auto_login_timeout());

        Ok(Self {
            session,
            policy,
            auto_login,
        })
    }

    /// Finish the session's startup phase (restoring a saved token).
    pub async fn bootstrap(&self) {
        self.session.bootstrap().await;
    }

    /// Email to prefill the login prompt with.
    pub fn remembered_email(&self) -> Option<String> {
        self.policy.store().remembered_email()
    }

    pub fn remember_checked(&self) -> bool {
        self.policy.is_checked()
    }

    pub async fn login(&self, email: &str, password: &str, remember: bool) -> Result<SessionProfile> {
        self.policy.set_checked(remember);
        let profile = self
            .policy
            .sign_in(self.session.as_ref(), email, password)
            .await?;
        Ok(profile)
    }

    /// Sign out. `keep_remembered` overrides the configured logout behavior.
    pub async fn logout(&self, keep_remembered: bool) -> Result<()> {
        if keep_remembered {
            self.session.logout().await?;
            info!("Logged out, remembered credentials kept");
        } else {
            self.policy.sign_out(self.session.as_ref()).await?;
        }
        Ok(())
    }

    /// Simulate landing on `route`: the route-change hook of the web client.
    pub async fn navigate(&self, route: &str) -> AutoLoginOutcome {
        self.auto_login.on_navigate(route).await
    }

    pub fn forget(&self) {
        self.policy.set_checked(false);
    }

    pub fn status(&self) -> Status {
        let store = self.policy.store();
        let data = self.session.session_data().filter(|_| self.session.is_authenticated());
        Status {
            remember_enabled: store.is_enabled(),
            remembered_email: store.remembered_email(),
            saved_at: store.saved_at(),
            minutes_until_expiry: data.as_ref().map(|d| d.minutes_until_expiry()),
            needs_refresh: data.as_ref().is_some_and(|d| d.needs_refresh()),
            signed_in_as: data.map(|d| d.profile),
        }
    }

    /// Tear down the session's UI context; late results are dropped.
    pub fn shutdown(&self) {
        self.auto_login.unmount();
    }
}
