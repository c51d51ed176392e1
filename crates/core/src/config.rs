//! Server configuration
//!
//! Loaded from `$INNKEEP_CONFIG`, else `innkeep.toml` in the project config
//! directory. A missing file yields defaults. `INNKEEP_DATABASE` and
//! `INNKEEP_BIND` override the file.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{Error, Result};

pub const CONFIG_ENV: &str = "INNKEEP_CONFIG";
pub const DATABASE_ENV: &str = "INNKEEP_DATABASE";
pub const BIND_ENV: &str = "INNKEEP_BIND";

/// Account created on first start when the staff table is empty
#[derive(Debug, Clone, Deserialize)]
pub struct BootstrapAdmin {
    pub username: String,
    pub password: String,
    #[serde(default = "default_admin_email")]
    pub email: String,
}

fn default_admin_email() -> String {
    "admin@localhost".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database_path: PathBuf,
    pub bind_addr: String,
    pub session_hours: i64,
    pub max_login_attempts: u32,
    pub busy_timeout_ms: u64,
    pub session_cleanup_secs: u64,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            bind_addr: "127.0.0.1:8080".to_string(),
            session_hours: 12,
            max_login_attempts: 5,
            busy_timeout_ms: 5_000,
            session_cleanup_secs: 300,
            bootstrap_admin: None,
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "innkeep", "innkeep")
}

fn default_database_path() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().join("innkeep.db"))
        .unwrap_or_else(|| PathBuf::from("innkeep.db"))
}

impl Config {
    /// Parse TOML content (for testing)
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a config file; a missing file yields defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        info!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Resolve the config file location and apply env overrides
    pub fn load() -> Result<Self> {
        let path = match std::env::var_os(CONFIG_ENV) {
            Some(p) => PathBuf::from(p),
            None => project_dirs()
                .map(|dirs| dirs.config_dir().join("innkeep.toml"))
                .unwrap_or_else(|| PathBuf::from("innkeep.toml")),
        };
        let mut config = Self::from_file(&path)?;
        config.apply_overrides(
            std::env::var(DATABASE_ENV).ok(),
            std::env::var(BIND_ENV).ok(),
        );
        Ok(config)
    }

    pub fn apply_overrides(&mut self, database: Option<String>, bind: Option<String>) {
        if let Some(database) = database.filter(|s| !s.is_empty()) {
            self.database_path = PathBuf::from(database);
        }
        if let Some(bind) = bind.filter(|s| !s.is_empty()) {
            self.bind_addr = bind;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.session_hours < 1 {
            return Err(Error::validation("session_hours must be at least 1"));
        }
        if self.max_login_attempts < 1 {
            return Err(Error::validation("max_login_attempts must be at least 1"));
        }
        if self.session_cleanup_secs == 0 {
            return Err(Error::validation("session_cleanup_secs must be positive"));
        }
        Ok(())
    }

    pub fn busy_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.busy_timeout_ms)
    }
}
