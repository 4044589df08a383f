use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::validation::ValidationError;
use crate::api::ApiError;

/// Signed-in user as reported by the auth API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct SessionProfile {
    #[serde(alias = "id")]
    pub user_id: String,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// The login/logout flow owned by the remote auth service.
///
/// A failed `login` must leave session state untouched.
#[async_trait]
pub trait AuthSession: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<SessionProfile, AuthError>;

    async fn logout(&self) -> Result<(), AuthError>;

    fn is_authenticated(&self) -> bool;

    /// True until the session has finished restoring itself at startup.
    fn is_bootstrapping(&self) -> bool;
}
