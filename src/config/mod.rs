//! Configuration management for gbuf-http
//!
//! Handles loading, validating, and persisting client configuration: HTTP
//! timeouts, default headers, schema include paths and schema caching.

use crate::error::{GbufError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub mod defaults;

pub use defaults::*;

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Total request timeout in seconds
    #[serde(default = "defaults::default_timeout")]
    pub timeout_secs: u64,

    /// Connect timeout in seconds
    #[serde(default = "defaults::default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// `User-Agent` sent with every request
    #[serde(default = "defaults::default_user_agent")]
    pub user_agent: String,

    /// Extra directories searched for `import`ed `.proto` files
    #[serde(default)]
    pub include_paths: Vec<PathBuf>,

    /// Keep parsed schemas in memory instead of re-reading them on every call
    #[serde(default)]
    pub cache_schemas: bool,

    /// Headers sent with every request unless the call overrides them
    #[serde(default)]
    pub default_headers: BTreeMap<String, String>,
}

impl Config {
    /// Load configuration from default location
    ///
    /// Tries in order:
    /// 1. XDG_CONFIG_HOME/gbuf/config.toml
    /// 2. ~/.config/gbuf/config.toml
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    /// Load configuration from the default location, falling back to
    /// defaults when no file exists
    pub fn load_or_default() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| GbufError::ConfigRead {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self =
            toml::from_str(&contents).map_err(|e| GbufError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| GbufError::ConfigWrite {
                path: parent.to_path_buf(),
                reason: e.to_string(),
            })?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| GbufError::InvalidConfig(e.to_string()))?;

        fs::write(path, contents).map_err(|e| GbufError::ConfigWrite {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Get the path to the config file
    pub fn config_path() -> Result<PathBuf> {
        let config_home = std::env::var("XDG_CONFIG_HOME")
            .ok()
            .and_then(|path| if path.is_empty() { None } else { Some(path) })
            .or_else(|| {
                dirs::home_dir().map(|home| home.join(".config").to_string_lossy().to_string())
            });

        config_home
            .ok_or_else(|| {
                GbufError::Internal(
                    "Could not determine config directory: XDG_CONFIG_HOME not set and no home directory found"
                        .to_string(),
                )
            })
            .map(|path| PathBuf::from(path).join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(GbufError::InvalidConfig(
                "timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.connect_timeout_secs == 0 {
            return Err(GbufError::InvalidConfig(
                "connect_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if let Some(name) = self.default_headers.keys().find(|name| name.trim().is_empty()) {
            return Err(GbufError::InvalidConfig(format!(
                "default_headers contains an empty header name: {name:?}"
            )));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            user_agent: default_user_agent(),
            include_paths: Vec::new(),
            cache_schemas: false,
            default_headers: BTreeMap::new(),
        }
    }
}
