use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::{ApiClient, ApiError};
use crate::auth::session_file::{SessionData, SessionFile};
use crate::auth::{AuthError, AuthSession, SessionProfile};

/// `AuthSession` backed by the CVForge HTTP API.
///
/// Starts in the bootstrapping phase; `bootstrap` restores a persisted
/// session (if its token is still accepted) and ends that phase.
pub struct RemoteAuthSession {
    api: ApiClient,
    file: Option<SessionFile>,
    current: RwLock<Option<SessionData>>,
    bootstrapping: AtomicBool,
}

impl RemoteAuthSession {
    pub fn new(api: ApiClient, file: Option<SessionFile>) -> Self {
        Self {
            api,
            file,
            current: RwLock::new(None),
            bootstrapping: AtomicBool::new(true),
        }
    }

    /// Restore the persisted session, validating its token with the server.
    pub async fn bootstrap(&self) {
        if let Some(data) = self.restore() {
            match self.api.fetch_profile(&data.token).await {
                Ok(profile) => {
                    info!(user_id = %profile.user_id, "Session restored");
                    self.set_current(Some(SessionData { profile, ..data }));
                }
                Err(ApiError::Unauthorized) => {
                    info!("Stored session token rejected");
                    self.forget_file();
                }
                Err(e) => {
                    // Keep the file; the next start validates it again.
                    warn!(error = %e, "Could not validate stored session");
                }
            }
        }
        self.bootstrapping.store(false, Ordering::SeqCst);
    }

    pub fn profile(&self) -> Option<SessionProfile> {
        self.read_current(|data| data.profile.clone())
    }

    pub fn token(&self) -> Option<String> {
        self.read_current(|data| data.token.clone())
    }

    pub fn session_data(&self) -> Option<SessionData> {
        self.read_current(Clone::clone)
    }

    fn restore(&self) -> Option<SessionData> {
        let file = self.file.as_ref()?;
        let data = match file.load() {
            Ok(data) => data?,
            Err(e) => {
                warn!(error = %e, "Discarding unreadable session file");
                self.forget_file();
                return None;
            }
        };
        if data.is_expired() {
            debug!("Stored session expired");
            self.forget_file();
            return None;
        }
        Some(data)
    }

    fn read_current<T>(&self, f: impl FnOnce(&SessionData) -> T) -> Option<T> {
        let guard = self.current.read().unwrap_or_else(|p| p.into_inner());
        guard.as_ref().map(f)
    }

    fn set_current(&self, data: Option<SessionData>) {
        *self.current.write().unwrap_or_else(|p| p.into_inner()) = data;
    }

    fn take_current(&self) -> Option<SessionData> {
        self.current.write().unwrap_or_else(|p| p.into_inner()).take()
    }

    fn forget_file(&self) {
        if let Some(file) = &self.file {
            if let Err(e) = file.clear() {
                warn!(error = %e, "Failed to remove session file");
            }
        }
    }
}

#[async_trait]
impl AuthSession for RemoteAuthSession {
    async fn login(&self, email: &str, password: &str) -> Result<SessionProfile, AuthError> {
        let response = self
            .api
            .authenticate(email, password)
            .await
            .map_err(|e| match e {
                ApiError::Unauthorized => AuthError::InvalidCredentials,
                other => AuthError::Api(other),
            })?;

        let data = SessionData::new(response.token, response.user, response.expires_in);
        if let Some(file) = &self.file {
            if let Err(e) = file.save(&data) {
                warn!(error = %e, "Failed to save session");
            }
        }

        let profile = data.profile.clone();
        self.set_current(Some(data));
        info!(user_id = %profile.user_id, "Login successful");
        Ok(profile)
    }

    async fn logout(&self) -> Result<(), AuthError> {
        let previous = self.take_current();
        self.forget_file();

        if let Some(data) = previous {
            if let Err(e) = self.api.revoke(&data.token).await {
                warn!(error = %e, "Token revocation failed; session dropped locally");
            }
        }
        info!("Logged out");
        Ok(())
    }

    fn is_authenticated(&self) -> bool {
        self.read_current(|data| !data.is_expired()).unwrap_or(false)
    }

    fn is_bootstrapping(&self) -> bool {
        self.bootstrapping.load(Ordering::SeqCst)
    }
}
