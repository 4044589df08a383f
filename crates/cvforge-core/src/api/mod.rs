//! REST client for the CVForge auth API.
//!
//! This module provides the `ApiClient` for the login, profile and logout
//! endpoints, and `RemoteAuthSession`, which implements `AuthSession` on
//! top of it. Resume generation and job analysis live behind the same API
//! but are not called from here.

pub mod client;
pub mod error;
pub mod remote;

pub use client::{ApiClient, LoginResponse, DEFAULT_API_BASE_URL};
pub use error::ApiError;
pub use remote::RemoteAuthSession;
