//! Backend API configuration

use serde::{Deserialize, Serialize};

/// Where the EasyDeploy backend lives and how long to wait for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base API origin. May or may not already end in `/api`.
    pub base_url: String,
    /// Timeout for establishing a stream connection
    pub connect_timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            connect_timeout_seconds: 10,
        }
    }
}
