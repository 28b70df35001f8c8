//! Configuration module for the EasyDeploy telemetry client
//!
//! Provides layered configuration loading from files, environment variables, and defaults.
//!
//! # Configuration Precedence
//!
//! 1. CLI arguments (highest priority)
//! 2. Environment variables (`EASYDEPLOY_*`)
//! 3. Configuration file (TOML)
//! 4. Default values (lowest priority)
//!
//! # Example
//!
//! ```rust
//! use easydeploy::config::EasyDeployConfig;
//!
//! // Load defaults
//! let config = EasyDeployConfig::default();
//! assert_eq!(config.stream.log_buffer_capacity, 500);
//!
//! // Parse from TOML
//! let toml = r#"
//! [api]
//! base_url = "https://deploy.example.com/api"
//! "#;
//! let config: EasyDeployConfig = toml::from_str(toml).unwrap();
//! assert_eq!(config.api.base_url, "https://deploy.example.com/api");
//! ```

pub mod api;
pub mod auth;
pub mod error;
pub mod logging;
pub mod stream;

pub use api::ApiConfig;
pub use auth::AuthConfig;
pub use error::ConfigError;
pub use logging::{LogFormat, LoggingConfig};
pub use stream::StreamConfig;

// Re-export reconnect settings from the stream module
pub use crate::stream::{ReconnectConfig, ReconnectStrategy};

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Unified configuration for the telemetry client.
///
/// # Example
///
/// ```rust
/// use easydeploy::config::EasyDeployConfig;
///
/// let config = EasyDeployConfig::default();
/// assert_eq!(config.api.base_url, "http://localhost:8080");
/// assert_eq!(config.stream.reconnect.delay_ms, 5000);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EasyDeployConfig {
    /// Backend API location
    pub api: ApiConfig,
    /// Subscription behaviour (buffering, reconnects)
    pub stream: StreamConfig,
    /// Session storage and cookie sources
    pub auth: AuthConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl EasyDeployConfig {
    /// Load configuration from a TOML file
    ///
    /// If path is None, returns default configuration.
    /// If path doesn't exist, returns NotFound error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::NotFound(p.to_path_buf()));
                }
                let content = std::fs::read_to_string(p).map_err(|source| ConfigError::Read {
                    path: p.to_path_buf(),
                    source,
                })?;
                toml::from_str(&content).map_err(|e| ConfigError::Parse {
                    path: p.to_path_buf(),
                    message: e.message().to_string(),
                })
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supports EASYDEPLOY_* environment variables for common settings.
    /// Invalid values are silently ignored (defaults are kept).
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("EASYDEPLOY_API_URL") {
            if !url.trim().is_empty() {
                self.api.base_url = url;
            }
        }

        if let Ok(level) = std::env::var("EASYDEPLOY_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("EASYDEPLOY_LOG_FORMAT") {
            if let Ok(f) = format.parse() {
                self.logging.format = f;
            }
        }

        if let Ok(path) = std::env::var("EASYDEPLOY_STORAGE_PATH") {
            self.auth.storage_path = path.into();
        }
        if let Ok(cookie) = std::env::var("EASYDEPLOY_COOKIE") {
            self.auth.cookie = Some(cookie);
        }

        if let Ok(delay) = std::env::var("EASYDEPLOY_RECONNECT_DELAY_MS") {
            if let Ok(d) = delay.parse() {
                self.stream.reconnect.delay_ms = d;
            }
        }

        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        match reqwest::Url::parse(&self.api.base_url) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            Ok(url) => {
                return Err(ConfigError::Validation {
                    field: "api.base_url".to_string(),
                    message: format!("unsupported scheme '{}'", url.scheme()),
                });
            }
            Err(e) => {
                return Err(ConfigError::Validation {
                    field: "api.base_url".to_string(),
                    message: e.to_string(),
                });
            }
        }

        if self.stream.log_buffer_capacity == 0 {
            return Err(ConfigError::Validation {
                field: "stream.log_buffer_capacity".to_string(),
                message: "capacity must be non-zero".to_string(),
            });
        }

        self.stream.reconnect.validate()?;

        Ok(())
    }
}
