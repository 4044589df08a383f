use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::session::SessionProfile;

/// Session file name in the data directory
pub const SESSION_FILE: &str = "session.json";

/// Token lifetime assumed when the server does not report one.
const DEFAULT_TOKEN_LIFETIME_HOURS: i64 = 12;

/// Buffer time before expiry to trigger refresh (5 minutes)
const TOKEN_REFRESH_BUFFER_MINUTES: i64 = 5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionData {
    pub token: String,
    pub profile: SessionProfile,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl SessionData {
    pub fn new(token: String, profile: SessionProfile, expires_in_secs: Option<i64>) -> Self {
        let created_at = Utc::now();
        Self {
            token,
            profile,
            created_at,
            expires_at: expires_in_secs.and_then(|secs| expiry_after(created_at, secs)),
        }
    }

    fn expiry(&self) -> DateTime<Utc> {
        self.expires_at.unwrap_or_else(|| {
            self.created_at
                .checked_add_signed(Duration::hours(DEFAULT_TOKEN_LIFETIME_HOURS))
                .unwrap_or(self.created_at)
        })
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expiry()
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Check if the session will expire soon and should be refreshed
    pub fn needs_refresh(&self) -> bool {
        let expiry = self.expiry();
        let refresh_at = expiry
            .checked_sub_signed(Duration::minutes(TOKEN_REFRESH_BUFFER_MINUTES))
            .unwrap_or(expiry);
        Utc::now() > refresh_at
    }

    /// Get minutes remaining until expiry (for display)
    pub fn minutes_until_expiry(&self) -> i64 {
        (self.expiry() - Utc::now()).num_minutes().max(0)
    }
}

/// Expiry `secs` after `created_at`, or `None` when the server's lifetime
/// does not fit in a timestamp (the default lifetime then applies).
fn expiry_after(created_at: DateTime<Utc>, secs: i64) -> Option<DateTime<Utc>> {
    Duration::try_seconds(secs).and_then(|lifetime| created_at.checked_add_signed(lifetime))
}

/// The signed-in session persisted between runs.
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(SESSION_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load session from disk; `None` when there is no session file.
    pub fn load(&self) -> Result<Option<SessionData>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path)
            .context("Failed to read session file")?;
        let data: SessionData = serde_json::from_str(&contents)
            .context("Failed to parse session file")?;
        Ok(Some(data))
    }

    pub fn save(&self, data: &SessionData) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(data)?;
        std::fs::write(&self.path, contents).context("Failed to write session file")?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}
