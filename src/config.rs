//! # Configuration Module
//!
//! Server configuration loaded from a YAML (or JSON) file and/or environment
//! variables.
//!
//! ## Environment Variables
//!
//! ### `OBJR_URI_TYPE`
//!
//! How type and method names are rendered into route paths:
//! `default` (kebab-case), `full-name`, `all-lower` or `camel`.
//!
//! ### `OBJR_POOL_IDLE_SECS`
//!
//! Seconds an idle pooled handler instance is kept before it is evicted.
//! Default: `300`.
//!
//! ## Example
//!
//! ```yaml
//! name: user-service
//! uri_type: all-lower
//! pool_idle_timeout_secs: 60
//! ```
//!
//! ```rust
//! use objroute::config::{ServerConfig, UriType};
//!
//! let config = ServerConfig::from_yaml_str("uri_type: camel").unwrap();
//! assert_eq!(config.uri_type, UriType::Camel);
//! assert_eq!(config.pool_idle_timeout_secs, 300);
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default idle timeout of pooled instances, in seconds.
pub const DEFAULT_POOL_IDLE_SECS: u64 = 300;

/// Rendering of type/method names in generated route paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UriType {
    /// `ShowList` → `show-list`
    #[default]
    Default,
    /// `ShowList` → `ShowList`
    FullName,
    /// `ShowList` → `showlist`
    AllLower,
    /// `ShowList` → `showList`
    Camel,
}

impl UriType {
    /// Parse a configuration value; accepts `-` or `_` separators in any case.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "default" => Some(UriType::Default),
            "full-name" | "fullname" => Some(UriType::FullName),
            "all-lower" | "alllower" => Some(UriType::AllLower),
            "camel" => Some(UriType::Camel),
            _ => None,
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Service name used in logs
    pub name: String,
    pub uri_type: UriType,
    pub pool_idle_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "objroute".to_string(),
            uri_type: UriType::Default,
            pool_idle_timeout_secs: DEFAULT_POOL_IDLE_SECS,
        }
    }
}

/// Failure to load a configuration file.
#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Yaml(serde_yaml::Error),
    Json(serde_json::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "failed to read config '{}': {}", path.display(), source)
            }
            ConfigError::Yaml(e) => write!(f, "invalid YAML config: {e}"),
            ConfigError::Json(e) => write!(f, "invalid JSON config: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Yaml(e) => Some(e),
            ConfigError::Json(e) => Some(e),
        }
    }
}

impl ServerConfig {
    /// Defaults plus environment overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Load a `.json`, `.yaml` or `.yml` file, then apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content).map_err(ConfigError::Json)?
        } else {
            Self::from_yaml_str(&content)?
        };
        config.apply_env();
        Ok(config)
    }

    /// Parse YAML without consulting the environment.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(ConfigError::Yaml)
    }

    fn apply_env(&mut self) {
        if let Ok(val) = env::var("OBJR_URI_TYPE") {
            match UriType::parse(&val) {
                Some(uri_type) => self.uri_type = uri_type,
                None => tracing::warn!(value = %val, "Ignoring invalid OBJR_URI_TYPE"),
            }
        }
        if let Ok(val) = env::var("OBJR_POOL_IDLE_SECS") {
            match val.trim().parse() {
                Ok(secs) => self.pool_idle_timeout_secs = secs,
                Err(_) => tracing::warn!(value = %val, "Ignoring invalid OBJR_POOL_IDLE_SECS"),
            }
        }
    }

    #[must_use]
    pub fn pool_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.pool_idle_timeout_secs)
    }
}
