//! Configuration loading

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;
use vitrine_core::DEFAULT_SLOT;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub assets: AssetsConfig,
    #[serde(default)]
    pub viewer: ViewerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Bind address for web server
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

/// Where saved scenes live
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Slot store directory
    #[serde(default = "default_store_path")]
    pub path: String,
    /// Slot the editor saves to and the viewer loads from
    #[serde(default = "default_slot")]
    pub slot: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            slot: default_slot(),
        }
    }
}

fn default_store_path() -> String {
    "scenes".to_string()
}

fn default_slot() -> String {
    DEFAULT_SLOT.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetsConfig {
    /// Directory holding fonts, models and svgs (served at /assets)
    #[serde(default = "default_assets_path")]
    pub path: String,
    /// Static web frontend
    #[serde(default = "default_web_path")]
    pub web: String,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            path: default_assets_path(),
            web: default_web_path(),
        }
    }
}

fn default_assets_path() -> String {
    "3d_assets".to_string()
}

fn default_web_path() -> String {
    "web".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewerConfig {
    /// Snapshots buffered per websocket client before it starts lagging
    #[serde(default = "default_snapshot_channel")]
    pub snapshot_channel: usize,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            snapshot_channel: default_snapshot_channel(),
        }
    }
}

fn default_snapshot_channel() -> usize {
    64
}

/// Load configuration from file, or use defaults if the file is missing
pub fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(Config::default())
    }
}
