// Configuration - TOML file with CLI overrides

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::downloader::{AudioCodec, EngineConfig};

const CONFIG_FILE_NAME: &str = "universal-downloader.toml";
const APP_DIR_NAME: &str = "universal-downloader";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub engine: EngineConfig,
    pub storage: StorageConfig,
    pub defaults: DefaultsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Parent of the per-request workspaces
    pub temp_root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            temp_root: std::env::temp_dir().join(APP_DIR_NAME),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Codec used when a request does not name one
    pub audio_codec: AudioCodec,
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;
    Ok(config)
}

/// Load config from the given path, the default locations, or fall back to defaults
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    for path in default_paths() {
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(&path);
        }
    }

    Ok(Config::default())
}

fn default_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(".").join(CONFIG_FILE_NAME)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join(APP_DIR_NAME).join("config.toml"));
    }
    paths
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if config.storage.temp_root.as_os_str().is_empty() {
        anyhow::bail!("storage.temp_root cannot be empty");
    }

    if config.engine.probe_timeout_secs == 0 || config.engine.fetch_timeout_secs == 0 {
        anyhow::bail!("Engine timeouts must be greater than 0");
    }

    if let Some(cookies) = &config.engine.cookies_path {
        if !Path::new(cookies).exists() {
            tracing::warn!("Cookies file does not exist: {}", cookies);
        }
    }

    Ok(())
}
