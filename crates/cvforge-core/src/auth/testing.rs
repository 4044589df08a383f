//! Scripted `AuthSession` and storage fixtures shared by auth tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use super::credentials::CredentialStore;
use super::session::{AuthError, AuthSession, SessionProfile};
use crate::clock::ManualClock;
use crate::storage::MemoryStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Accept,
    Reject,
    /// Never settles.
    Hang,
}

pub struct FakeAuthSession {
    reply: Reply,
    delay: Duration,
    authenticated: AtomicBool,
    bootstrapping: AtomicBool,
    login_calls: AtomicUsize,
    logout_calls: AtomicUsize,
}

impl FakeAuthSession {
    pub fn new(reply: Reply) -> Self {
        Self {
            reply,
            delay: Duration::ZERO,
            authenticated: AtomicBool::new(false),
            bootstrapping: AtomicBool::new(false),
            login_calls: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set_authenticated(&self, value: bool) {
        self.authenticated.store(value, Ordering::SeqCst);
    }

    pub fn set_bootstrapping(&self, value: bool) {
        self.bootstrapping.store(value, Ordering::SeqCst);
    }

    pub fn login_calls(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    pub fn logout_calls(&self) -> usize {
        self.logout_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthSession for FakeAuthSession {
    async fn login(&self, email: &str, _password: &str) -> Result<SessionProfile, AuthError> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.reply {
            Reply::Accept => {
                self.authenticated.store(true, Ordering::SeqCst);
                Ok(SessionProfile {
                    user_id: "u-1".to_string(),
                    email: email.to_string(),
                    full_name: None,
                })
            }
            Reply::Reject => Err(AuthError::InvalidCredentials),
            Reply::Hang => std::future::pending().await,
        }
    }

    async fn logout(&self) -> Result<(), AuthError> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        self.authenticated.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::SeqCst)
    }

    fn is_bootstrapping(&self) -> bool {
        self.bootstrapping.load(Ordering::SeqCst)
    }
}

/// Credential store over fresh in-memory storage and a manual clock.
pub fn memory_credentials() -> (Arc<MemoryStore>, Arc<ManualClock>, Arc<CredentialStore>) {
    let storage = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let store = CredentialStore::new(storage.clone()).with_clock(clock.clone());
    (storage, clock, Arc::new(store))
}
