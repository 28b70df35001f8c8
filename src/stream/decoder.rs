//! Event decoder: named SSE events into typed records.

use serde::Deserialize;
use thiserror::Error;

use super::sse::SseEvent;
use super::types::{LogEntry, MetricsSnapshot};

pub const EVENT_LOGS: &str = "logs";
pub const EVENT_METRICS: &str = "metrics";
pub const EVENT_HEARTBEAT: &str = "heartbeat";
pub const EVENT_APP_LOGS: &str = "app-logs";

/// A decoded stream event.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Incremental batch of log entries
    Logs(Vec<LogEntry>),
    /// Full metrics reading
    Metrics(MetricsSnapshot),
    /// Liveness signal; payload kept only for tracing
    Heartbeat(String),
    /// Cumulative log blob for a single application
    AppLogs(String),
}

impl StreamEvent {
    pub fn name(&self) -> &'static str {
        match self {
            StreamEvent::Logs(_) => EVENT_LOGS,
            StreamEvent::Metrics(_) => EVENT_METRICS,
            StreamEvent::Heartbeat(_) => EVENT_HEARTBEAT,
            StreamEvent::AppLogs(_) => EVENT_APP_LOGS,
        }
    }
}

/// Malformed payload. The batch is dropped; the stream continues.
#[derive(Debug, Error)]
#[error("invalid '{event}' payload: {source}")]
pub struct DecodeError {
    pub event: String,
    #[source]
    pub source: serde_json::Error,
}

/// Shapes accepted for the `app-logs` payload.
#[derive(Deserialize)]
#[serde(untagged)]
enum AppLogsPayload {
    Blob(String),
    Wrapped { logs: String },
}

/// Decode one wire event.
///
/// Returns `Ok(None)` for event names this client does not consume.
pub fn decode(event: &SseEvent) -> Result<Option<StreamEvent>, DecodeError> {
    let wrap = |source| DecodeError {
        event: event.event.clone(),
        source,
    };

    let decoded = match event.event.as_str() {
        EVENT_LOGS => StreamEvent::Logs(serde_json::from_str(&event.data).map_err(wrap)?),
        EVENT_METRICS => StreamEvent::Metrics(serde_json::from_str(&event.data).map_err(wrap)?),
        EVENT_HEARTBEAT => StreamEvent::Heartbeat(event.data.clone()),
        EVENT_APP_LOGS => {
            let payload: AppLogsPayload = serde_json::from_str(&event.data).map_err(wrap)?;
            StreamEvent::AppLogs(match payload {
                AppLogsPayload::Blob(logs) | AppLogsPayload::Wrapped { logs } => logs,
            })
        }
        other => {
            tracing::debug!(event = other, "Ignoring unhandled stream event");
            return Ok(None);
        }
    };

    Ok(Some(decoded))
}
