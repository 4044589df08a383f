//! Authentication module: remembered credentials and silent sign-in.
//!
//! This module provides:
//! - `CredentialStore`: obfuscated, expiring persistence of one email/password pair
//! - `RememberMePolicy`: what the "remember me" checkbox does to that store
//! - `AutoLoginController`: the single silent login attempt per app session
//! - `AuthSession`: the login/logout contract of the remote auth service
//!
//! Remembered credentials expire 30 days after they were saved.

pub mod auto_login;
pub mod credentials;
pub mod obfuscation;
pub mod remember;
pub mod routes;
pub mod session;
pub mod session_file;
pub mod validation;

#[cfg(test)]
pub(crate) mod testing;

pub use auto_login::{AutoLoginController, AutoLoginOutcome, AutoLoginState, SkipReason};
pub use credentials::{CredentialStore, Credentials};
pub use obfuscation::{ObfuscationError, Obfuscator};
pub use remember::{LogoutBehavior, RememberMePolicy};
pub use session::{AuthError, AuthSession, SessionProfile};
pub use session_file::{SessionData, SessionFile};
pub use validation::{validate_login, ValidationError};
