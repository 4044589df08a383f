//! HTTP client for the CVForge auth endpoints.

use std::time::Duration;

use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ApiError;
use crate::auth::SessionProfile;

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_API_BASE_URL: &str = "https://api.cvforge.app/v1";

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// Body of a successful `POST /auth/login`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    /// Token lifetime in seconds, when the server reports one.
    #[serde(default)]
    pub expires_in: Option<i64>,
    pub user: SessionProfile,
}

/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Exchange an email/password pair for a session token.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let response = self
            .client
            .post(self.url("/auth/login"))
            .header(header::ACCEPT, "application/json")
            .json(&LoginRequest { email, password })
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        let login: LoginResponse = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("login response: {}", e)))?;

        debug!(user_id = %login.user.user_id, "Authenticated");
        Ok(login)
    }

    /// Profile of the user owning `token`; `Unauthorized` once the token is dead.
    pub async fn fetch_profile(&self, token: &str) -> Result<SessionProfile, ApiError> {
        let response = self
            .client
            .get(self.url("/auth/me"))
            .bearer_auth(token)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("profile response: {}", e)))
    }

    pub async fn revoke(&self, token: &str) -> Result<(), ApiError> {
        let response = self
            .client
            .post(self.url("/auth/logout"))
            .bearer_auth(token)
            .send()
            .await?;

        Self::check_response(response).await?;
        Ok(())
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }
}
