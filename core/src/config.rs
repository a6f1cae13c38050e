//! Relay configuration.
//!
//! Stores configuration in JSON format at `~/.portdisco/config.json`.
//! A missing file means defaults; command-line flags override both.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::{Error, Result};

/// Configuration data stored in JSON format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayConfig {
    /// Seconds between two polls of the listening sockets.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Whether loopback-bound listeners are reported.
    #[serde(default = "default_true")]
    pub include_localhost: bool,

    /// Upper bound on parent lookups when matching one process.
    #[serde(default = "default_max_ancestry_depth")]
    pub max_ancestry_depth: usize,

    /// Address the relay's HTTP listener binds to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

fn default_poll_interval() -> u64 {
    3
}

fn default_true() -> bool {
    true
}

fn default_max_ancestry_depth() -> usize {
    512
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            include_localhost: true,
            max_ancestry_depth: default_max_ancestry_depth(),
            bind_address: default_bind_address(),
        }
    }
}

impl RelayConfig {
    /// The polling period as a `Duration` (never zero).
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

/// Configuration store for the relay settings.
///
/// Handles reading and writing configuration to `~/.portdisco/config.json`.
pub struct ConfigStore {
    /// Path to the configuration file.
    config_path: PathBuf,
}

impl ConfigStore {
    /// Create a new config store with the default path.
    ///
    /// Default path: `~/.portdisco/config.json`
    pub fn new() -> Result<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))?;

        let config_path = home.join(".portdisco").join("config.json");

        Ok(Self { config_path })
    }

    /// Create a config store with a custom path (for testing).
    pub fn with_path(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    /// Path of the configuration file.
    pub fn path(&self) -> &PathBuf {
        &self.config_path
    }

    /// Load configuration from disk, or defaults if there is no file yet.
    pub async fn load(&self) -> Result<RelayConfig> {
        let content = match fs::read_to_string(&self.config_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(RelayConfig::default()),
            Err(e) => return Err(config_error("read", e)),
        };

        serde_json::from_str(&content).map_err(|e| config_error("parse", e))
    }

    /// Save configuration, creating the parent directory if needed.
    ///
    /// The file is replaced atomically through a sibling temp file.
    pub async fn save(&self, config: &RelayConfig) -> Result<()> {
        if let Some(dir) = self.config_path.parent() {
            fs::create_dir_all(dir)
                .await
                .map_err(|e| config_error("create directory for", e))?;
        }

        let content = serde_json::to_vec_pretty(config).map_err(|e| config_error("serialize", e))?;
        let temp_path = self.config_path.with_extension("json.tmp");

        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| config_error("create", e))?;
        file.write_all(&content)
            .await
            .map_err(|e| config_error("write", e))?;
        file.sync_all().await.map_err(|e| config_error("sync", e))?;

        fs::rename(&temp_path, &self.config_path)
            .await
            .map_err(|e| config_error("replace", e))
    }
}

fn config_error(action: &str, err: impl std::fmt::Display) -> Error {
    Error::Config(format!("Failed to {action} config: {err}"))
}
