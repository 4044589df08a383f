//! Application configuration management.
//!
//! Configuration is stored at `~/.config/cvforge/config.json`; a missing
//! file means defaults. A few settings can be overridden from the
//! environment (see `apply_env`).

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::DEFAULT_API_BASE_URL;
use crate::auth::credentials::DEFAULT_MAX_AGE_DAYS;
use crate::auth::{CredentialStore, LogoutBehavior, Obfuscator};
use crate::clock::Clock;
use crate::storage::{FileStore, KeyValueStore, KeyringStore, MemoryStore};

/// Application name used for config/data directory paths
const APP_NAME: &str = "cvforge";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// File backing the `file` storage backend
const STORAGE_FILE: &str = "local-storage.json";

/// Keychain account used by the `keyring` storage backend
const KEYRING_ACCOUNT: &str = "remember-me";

pub const ENV_API_URL: &str = "CVFORGE_API_URL";
pub const ENV_STORAGE: &str = "CVFORGE_STORAGE";
pub const ENV_STORAGE_SECRET: &str = "CVFORGE_STORAGE_SECRET";
pub const ENV_DATA_DIR: &str = "CVFORGE_DATA_DIR";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    File,
    Keyring,
    Memory,
}

impl std::str::FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(Self::File),
            "keyring" | "keychain" => Ok(Self::Keyring),
            "memory" => Ok(Self::Memory),
            other => Err(anyhow::anyhow!("Unknown storage backend: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub storage_backend: StorageBackend,
    pub remember_max_age_days: i64,
    pub auto_login_timeout_secs: u64,
    pub logout_behavior: LogoutBehavior,
    /// Overrides the built-in obfuscation secret. Changing it orphans
    /// every password remembered under the old one.
    pub obfuscation_secret: Option<String>,
    pub data_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            storage_backend: StorageBackend::default(),
            remember_max_age_days: DEFAULT_MAX_AGE_DAYS,
            auto_login_timeout_secs: 10,
            logout_behavior: LogoutBehavior::default(),
            obfuscation_secret: None,
            data_dir: None,
        }
    }
}

impl Config {
    /// Load from the default location, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Apply overrides from `lookup` (the process environment in `load`).
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = lookup(ENV_API_URL) {
            self.api_base_url = url;
        }
        if let Some(backend) = lookup(ENV_STORAGE) {
            self.storage_backend = backend.parse()?;
        }
        if let Some(secret) = lookup(ENV_STORAGE_SECRET) {
            self.obfuscation_secret = Some(secret);
        }
        if let Some(dir) = lookup(ENV_DATA_DIR) {
            self.data_dir = Some(PathBuf::from(dir));
        }
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory for the storage file, session file and logs.
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.data_dir {
            return Ok(dir.clone());
        }
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    pub fn auto_login_timeout(&self) -> Duration {
        Duration::from_secs(self.auto_login_timeout_secs)
    }

    pub fn obfuscator(&self) -> Result<Obfuscator> {
        match self.obfuscation_secret {
            Some(ref secret) => Obfuscator::new(secret).context("Invalid obfuscation secret"),
            None => Ok(Obfuscator::default()),
        }
    }

    pub fn open_storage(&self) -> Result<Arc<dyn KeyValueStore>> {
        let storage: Arc<dyn KeyValueStore> = match self.storage_backend {
            StorageBackend::File => Arc::new(FileStore::new(self.data_dir()?.join(STORAGE_FILE))),
            StorageBackend::Keyring => Arc::new(
                KeyringStore::new(KEYRING_ACCOUNT).context("Failed to open OS keychain")?,
            ),
            StorageBackend::Memory => Arc::new(MemoryStore::new()),
        };
        Ok(storage)
    }

    pub fn credential_store(
        &self,
        storage: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<CredentialStore> {
        if self.remember_max_age_days <= 0 {
            anyhow::bail!("remember_max_age_days must be positive");
        }
        let max_age = chrono::Duration::try_days(self.remember_max_age_days).ok_or_else(|| {
            anyhow::anyhow!(
                "remember_max_age_days is out of range: {}",
                self.remember_max_age_days
            )
        })?;
        Ok(CredentialStore::new(storage)
            .with_obfuscator(self.obfuscator()?)
            .with_clock(clock)
            .with_max_age(max_age))
    }
}
