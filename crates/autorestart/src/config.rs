// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of FluxION.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

//! Configuration module for autorestart

use crate::error::{AutoRestartError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "autorestart.json";
pub const DEFAULT_API_BASE_URL: &str = "https://api.steampowered.com";

fn default_install_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_metadata_file() -> String {
    "steam.inf".to_owned()
}

fn default_300() -> u64 {
    300
}

fn default_30() -> u64 {
    30
}

fn default_app_id() -> u32 {
    730
}

fn default_quit() -> String {
    "quit".to_owned()
}

fn default_say() -> String {
    "say".to_owned()
}

fn default_qqquit() -> String {
    "qqquit".to_owned()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoRestartConfig {
    /// Server installation directory holding the version metadata
    #[serde(default = "default_install_dir")]
    pub install_dir: PathBuf,

    /// Metadata file name, relative to `install_dir`
    #[serde(default = "default_metadata_file")]
    pub metadata_file: String,

    /// Seconds between version checks (also the delay before the first one)
    #[serde(default = "default_300")]
    pub check_interval_secs: u64,

    /// Upper bound for a single version check request
    #[serde(default = "default_30")]
    pub request_timeout_secs: u64,

    /// Application id sent to the version check endpoint
    #[serde(default = "default_app_id")]
    pub app_id: u32,

    /// Custom API base URL for testing (overrides the public endpoint)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,

    /// Console command that terminates the server
    #[serde(default = "default_quit")]
    pub quit_command: String,

    /// Console command prefix used to broadcast chat messages
    #[serde(default = "default_say")]
    pub broadcast_command: String,

    /// Operator command that terminates the server without a version check
    #[serde(default = "default_qqquit")]
    pub manual_quit_command: String,

    /// Seconds to wait for the server to exit after a quit before signalling it
    #[serde(default = "default_30")]
    pub quit_grace_secs: u64,
}

impl Default for AutoRestartConfig {
    fn default() -> Self {
        Self {
            install_dir: default_install_dir(),
            metadata_file: default_metadata_file(),
            check_interval_secs: 300,
            request_timeout_secs: 30,
            app_id: default_app_id(),
            api_base_url: None,
            quit_command: default_quit(),
            broadcast_command: default_say(),
            manual_quit_command: default_qqquit(),
            quit_grace_secs: 30,
        }
    }
}

impl AutoRestartConfig {
    /// Delay before the first check and between checks
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    /// Upper bound for one version check request
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// How long the server gets to exit after `quit_command`
    pub fn quit_grace(&self) -> Duration {
        Duration::from_secs(self.quit_grace_secs)
    }

    /// Full path of the version metadata file
    pub fn metadata_path(&self) -> PathBuf {
        self.install_dir.join(&self.metadata_file)
    }

    /// Endpoint base URL, the public Steam API unless overridden
    pub fn api_base_url(&self) -> &str {
        self.api_base_url.as_deref().unwrap_or(DEFAULT_API_BASE_URL)
    }

    /// Reject settings the monitor cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.check_interval_secs == 0 {
            return Err(AutoRestartError::Config(
                "check_interval_secs must be greater than zero".to_owned(),
            ));
        }
        if self.quit_command.trim().is_empty() {
            return Err(AutoRestartError::Config(
                "quit_command must not be empty".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Load the config at `path`, writing a default one if it does not exist
pub fn load_config(path: &Path) -> Result<AutoRestartConfig> {
    let config = if path.exists() {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| AutoRestartError::Config(format!("Failed to parse config: {e}")))?
    } else {
        // Create with defaults
        let config = AutoRestartConfig::default();
        save_config(path, &config)?;
        config
    };

    config.validate()?;
    Ok(config)
}

/// Write the config to `path` atomically
pub fn save_config(path: &Path, config: &AutoRestartConfig) -> Result<()> {
    let temp_path = path.with_extension("tmp");
    let content = serde_json::to_string_pretty(config)?;

    // Atomic write
    std::fs::write(&temp_path, content)?;
    std::fs::rename(&temp_path, path)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AutoRestartConfig::default();
        assert_eq!(config.check_interval(), Duration::from_secs(300));
        assert_eq!(config.app_id, 730);
        assert_eq!(config.quit_command, "quit");
        assert_eq!(config.manual_quit_command, "qqquit");
        assert_eq!(config.api_base_url(), DEFAULT_API_BASE_URL);
        assert_eq!(config.metadata_path(), PathBuf::from("./steam.inf"));
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let config: AutoRestartConfig =
            serde_json::from_str(r#"{"install_dir": "/srv/cs2/game/csgo", "app_id": 740}"#)
                .unwrap();
        assert_eq!(config.app_id, 740);
        assert_eq!(config.check_interval_secs, 300);
        assert_eq!(
            config.metadata_path(),
            PathBuf::from("/srv/cs2/game/csgo/steam.inf")
        );
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("autorestart.json");

        let config = load_config(&path).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("tmp").exists());
        assert_eq!(config.check_interval_secs, 300);
    }

    #[test]
    fn test_load_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("autorestart.json");
        std::fs::write(&path, r#"{"check_interval_secs": 60, "quit_grace_secs": 5}"#).unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.check_interval(), Duration::from_secs(60));
        assert_eq!(config.quit_grace(), Duration::from_secs(5));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("autorestart.json");
        std::fs::write(&path, r#"{"check_interval_secs": 0}"#).unwrap();

        assert!(matches!(
            load_config(&path),
            Err(AutoRestartError::Config(_))
        ));
    }

    #[test]
    fn test_invalid_json_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("autorestart.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(matches!(
            load_config(&path),
            Err(AutoRestartError::Config(_))
        ));
    }
}
