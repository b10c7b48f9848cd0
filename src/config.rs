//! Configuration Management
//!
//! Loads the vminfo configuration file. The password is
//! never stored; it only comes from the environment.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable holding the gateway URL
pub const URL_ENV: &str = "VMINFO_URL";

/// Default interval between polls while waiting on an object
const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Gateway URL
    #[serde(default)]
    pub url: Option<String>,
    /// User name for session login
    #[serde(default)]
    pub username: Option<String>,
    /// Accept invalid TLS certificates
    #[serde(default)]
    pub insecure: bool,
    /// Interval between polls while waiting for an IP address
    #[serde(default)]
    pub wait_poll_interval_ms: Option<u64>,
    /// Give up waiting on a single object after this many seconds
    #[serde(default)]
    pub wait_timeout_secs: Option<u64>,
    /// Default deadline for a whole run
    #[serde(default)]
    pub deadline_secs: Option<u64>,
}

impl Config {
    /// Get the config file path
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("vminfo").join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content),
            Err(e) => {
                tracing::warn!("Failed to read {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    fn parse(content: &str) -> Self {
        serde_json::from_str(content).unwrap_or_else(|e| {
            tracing::warn!("Ignoring malformed config file: {}", e);
            Self::default()
        })
    }

    /// Get effective URL (CLI > environment > config)
    pub fn effective_url(&self, cli: Option<&str>) -> Option<String> {
        cli.map(String::from)
            .or_else(|| std::env::var(URL_ENV).ok().filter(|u| !u.is_empty()))
            .or_else(|| self.url.clone())
    }

    /// Get effective user name (CLI > environment > config); `None` lets
    /// the credentials fall back to the environment at login time
    pub fn effective_username(&self, cli: Option<&str>) -> Option<String> {
        cli.map(String::from)
            .or_else(|| std::env::var(crate::vsphere::auth::USERNAME_ENV).ok())
            .or_else(|| self.username.clone())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.wait_poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS))
    }

    pub fn wait_timeout(&self) -> Option<Duration> {
        self.wait_timeout_secs.map(Duration::from_secs)
    }

    /// Get effective deadline (CLI > config)
    pub fn deadline(&self, cli_secs: Option<u64>) -> Option<Duration> {
        cli_secs.or(self.deadline_secs).map(Duration::from_secs)
    }
}
