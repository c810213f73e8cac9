//! Configuration file support
//!
//! Settings are read from TOML. Lookup order:
//!
//! 1. `./image-border.toml`
//! 2. `<config_dir>/image-border/config.toml`
//!
//! Command-line flags override file values through [`CliOverrides`].
//!
//! ```toml
//! [border]
//! margin_size = 200
//! border_thickness = 100
//! border_color = "255,255,255,255"
//!
//! [server]
//! port = 8000
//! bind = "127.0.0.1"
//! upload_limit_mb = 50
//! margin_offset = 20
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::border::{DEFAULT_BORDER_COLOR, DEFAULT_BORDER_THICKNESS, DEFAULT_MARGIN_SIZE};

/// File name looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "image-border.toml";

/// Directory under the user config dir
pub const CONFIG_DIR_NAME: &str = "image-border";

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 8000;

/// Default bind address
pub const DEFAULT_BIND: &str = "127.0.0.1";

/// Default upload limit in megabytes
pub const DEFAULT_UPLOAD_LIMIT_MB: usize = 50;

/// Margin added on top of the border thickness for uploads without an
/// explicit margin
pub const DEFAULT_MARGIN_OFFSET: i64 = 20;

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// `[border]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BorderConfig {
    pub margin_size: i64,
    pub border_thickness: i64,
    pub border_color: String,
}

impl Default for BorderConfig {
    fn default() -> Self {
        Self {
            margin_size: DEFAULT_MARGIN_SIZE,
            border_thickness: DEFAULT_BORDER_THICKNESS,
            border_color: DEFAULT_BORDER_COLOR.to_string(),
        }
    }
}

/// `[server]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub port: u16,
    pub bind: String,
    pub upload_limit_mb: usize,
    pub margin_offset: i64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
            upload_limit_mb: DEFAULT_UPLOAD_LIMIT_MB,
            margin_offset: DEFAULT_MARGIN_OFFSET,
        }
    }
}

/// Whole configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub border: BorderConfig,
    pub server: ServerSection,
}

/// Values given explicitly on the command line
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliOverrides {
    pub margin_size: Option<i64>,
    pub border_thickness: Option<i64>,
    pub border_color: Option<String>,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Border settings after merging file and command line, not yet validated
#[derive(Debug, Clone, PartialEq)]
pub struct BorderSettings {
    pub margin_size: i64,
    pub border_thickness: i64,
    pub border_color: String,
}

impl Config {
    /// Load the first config file found, or defaults if there is none
    pub fn load() -> Result<Self, ConfigError> {
        match Self::search_paths().into_iter().find(|p| p.is_file()) {
            Some(path) => Self::load_from_path(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load a specific config file
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Candidate config file locations, in lookup order
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join(CONFIG_DIR_NAME).join("config.toml"));
        }
        paths
    }

    /// Combine file values with command-line overrides (CLI wins)
    pub fn merge_with_cli(&self, overrides: &CliOverrides) -> BorderSettings {
        BorderSettings {
            margin_size: overrides.margin_size.unwrap_or(self.border.margin_size),
            border_thickness: overrides
                .border_thickness
                .unwrap_or(self.border.border_thickness),
            border_color: overrides
                .border_color
                .clone()
                .unwrap_or_else(|| self.border.border_color.clone()),
        }
    }
}
