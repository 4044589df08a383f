//! Client-side checks run before a login form is submitted.

use thiserror::Error;

/// Maximum length for email input (RFC 5321 path limit).
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Maximum length for password input.
/// 128 chars accommodates password managers and passphrases.
pub const MAX_PASSWORD_LENGTH: usize = 128;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Email and password required")]
    MissingField,

    #[error("Enter a valid email address")]
    InvalidEmail,

    #[error("Email must be at most 254 characters")]
    EmailTooLong,

    #[error("Password must be at most 128 characters")]
    PasswordTooLong,
}

pub fn validate_login(email: &str, password: &str) -> Result<(), ValidationError> {
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        return Err(ValidationError::MissingField);
    }
    if email.chars().count() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::EmailTooLong);
    }
    if !is_plausible_email(email) {
        return Err(ValidationError::InvalidEmail);
    }
    if password.chars().count() > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::PasswordTooLong);
    }
    Ok(())
}

fn is_plausible_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

/// Whether a typed character may be appended to the email field.
pub fn can_add_email_char(current_len: usize, c: char) -> bool {
    current_len < MAX_EMAIL_LENGTH && !c.is_control() && !c.is_whitespace()
}

/// Whether a typed character may be appended to the password field.
pub fn can_add_password_char(current_len: usize, c: char) -> bool {
    current_len < MAX_PASSWORD_LENGTH && !c.is_control()
}
