use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::{debug, warn};

use super::obfuscation::{ObfuscationError, Obfuscator};
use crate::clock::{Clock, SystemClock};
use crate::storage::{KeyValueStore, StorageError, WriteBatch};

pub const KEY_EMAIL: &str = "cvforge.remember.email";
pub const KEY_PASSWORD: &str = "cvforge.remember.password";
pub const KEY_ENABLED: &str = "cvforge.remember.enabled";
pub const KEY_SAVED_AT: &str = "cvforge.remember.saved_at";

/// Remembered credentials expire this many days after they were saved.
pub const DEFAULT_MAX_AGE_DAYS: i64 = 30;

/// Literal value stored under `KEY_ENABLED` when remember-me is on
const ENABLED_VALUE: &str = "true";

/// An email/password pair recovered from storage.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Why a stored record could not be returned.
#[derive(Error, Debug)]
enum RecordError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("missing field: {0}")]
    Incomplete(&'static str),

    #[error("unreadable saved_at timestamp")]
    BadTimestamp,

    #[error("record is {age_days} days old")]
    Expired { age_days: i64 },

    #[error(transparent)]
    Decode(#[from] ObfuscationError),
}

/// Persists one remembered email/password pair.
///
/// Every operation is best-effort: storage failures are logged and turn
/// into "nothing remembered", never into errors for the caller.
pub struct CredentialStore {
    storage: Arc<dyn KeyValueStore>,
    obfuscator: Obfuscator,
    clock: Arc<dyn Clock>,
    max_age: Duration,
}

impl CredentialStore {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            storage,
            obfuscator: Obfuscator::default(),
            clock: Arc::new(SystemClock),
            max_age: Duration::days(DEFAULT_MAX_AGE_DAYS),
        }
    }

    pub fn with_obfuscator(mut self, obfuscator: Obfuscator) -> Self {
        self.obfuscator = obfuscator;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Remember `email` and `password`, stamping the record with the current time.
    pub fn save(&self, email: &str, password: &str) {
        let saved_at = self.clock.now().timestamp_millis();
        let batch = WriteBatch::new()
            .put(KEY_EMAIL, email)
            .put(KEY_PASSWORD, self.obfuscator.encode(password))
            .put(KEY_SAVED_AT, saved_at.to_string())
            .put(KEY_ENABLED, ENABLED_VALUE);

        match self.storage.write(batch) {
            Ok(()) => debug!(email, "Remembered credentials saved"),
            Err(e) => warn!(error = %e, "Failed to persist remembered credentials"),
        }
    }

    /// Return the remembered pair if it is enabled, complete, fresh and decodable.
    ///
    /// Records that are expired or damaged are purged before returning `None`.
    pub fn load(&self) -> Option<Credentials> {
        match self.read_record() {
            Ok(found) => found,
            Err(RecordError::Storage(StorageError::Corrupt(reason))) => {
                warn!(%reason, "Credential storage corrupt, discarding");
                self.clear();
                None
            }
            Err(RecordError::Storage(e)) => {
                warn!(error = %e, "Credential storage unreadable");
                None
            }
            Err(reason) => {
                warn!(%reason, "Discarding remembered credentials");
                self.clear();
                None
            }
        }
    }

    /// Remove every remembered field. Safe to call when nothing is stored.
    pub fn clear(&self) {
        let batch = WriteBatch::new()
            .remove(KEY_EMAIL)
            .remove(KEY_PASSWORD)
            .remove(KEY_SAVED_AT)
            .remove(KEY_ENABLED);

        if let Err(e) = self.storage.write(batch) {
            warn!(error = %e, "Failed to clear remembered credentials");
        }
    }

    /// Raw remember-me flag, regardless of whether the record is usable.
    pub fn is_enabled(&self) -> bool {
        matches!(self.storage.get(KEY_ENABLED), Ok(Some(v)) if v == ENABLED_VALUE)
    }

    pub fn saved_at(&self) -> Option<DateTime<Utc>> {
        self.storage
            .get(KEY_SAVED_AT)
            .ok()
            .flatten()
            .and_then(|raw| parse_timestamp(&raw))
    }

    /// Email of a usable remembered record, for prefilling a login form.
    pub fn remembered_email(&self) -> Option<String> {
        self.load().map(|c| c.email)
    }

    fn read_record(&self) -> Result<Option<Credentials>, RecordError> {
        if self.storage.get(KEY_ENABLED)?.as_deref() != Some(ENABLED_VALUE) {
            return Ok(None);
        }

        let email = self
            .storage
            .get(KEY_EMAIL)?
            .filter(|e| !e.is_empty())
            .ok_or(RecordError::Incomplete("email"))?;
        let encoded = self
            .storage
            .get(KEY_PASSWORD)?
            .ok_or(RecordError::Incomplete("password"))?;
        let saved_at = self
            .storage
            .get(KEY_SAVED_AT)?
            .ok_or(RecordError::Incomplete("saved_at"))?;
        let saved_at = parse_timestamp(&saved_at).ok_or(RecordError::BadTimestamp)?;

        // Stored at millisecond precision, so compare at that precision.
        // Exactly max_age old is still valid.
        let age_ms = self.clock.now().timestamp_millis() - saved_at.timestamp_millis();
        if age_ms > self.max_age.num_milliseconds() {
            return Err(RecordError::Expired {
                age_days: age_ms / Duration::days(1).num_milliseconds(),
            });
        }

        let password = self.obfuscator.decode(&encoded)?;
        Ok(Some(Credentials { email, password }))
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .and_then(DateTime::from_timestamp_millis)
}

// ============================================================================
// Tests
// ============================================================================
