//! Streaming subscription configuration

use crate::stream::ReconnectConfig;
use serde::{Deserialize, Serialize};

/// Settings shared by every telemetry subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Maximum number of log entries retained per subscription
    pub log_buffer_capacity: usize,
    /// Resolve the token again before every reconnect attempt
    pub reresolve_token_on_reconnect: bool,
    /// Reconnection policy
    pub reconnect: ReconnectConfig,
    /// Distance from the tail (in lines) that pauses auto-scroll
    pub scroll_threshold: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            log_buffer_capacity: crate::stream::DEFAULT_LOG_CAPACITY,
            reresolve_token_on_reconnect: true,
            reconnect: ReconnectConfig::default(),
            scroll_threshold: 2,
        }
    }
}
