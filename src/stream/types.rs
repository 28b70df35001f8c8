//! Records carried by the telemetry streams.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Severity attached to a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
    Debug,
}

impl LogLevel {
    /// Case-insensitive parse; `WARNING` is accepted as `WARN`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INFO" => Some(LogLevel::Info),
            "WARN" | "WARNING" => Some(LogLevel::Warn),
            "ERROR" => Some(LogLevel::Error),
            "DEBUG" => Some(LogLevel::Debug),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Debug => "DEBUG",
        };
        f.write_str(s)
    }
}

/// One decoded log line. Immutable once received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Dedup key, unique within a session
    pub timestamp: String,
    pub message: String,
    #[serde(
        default,
        deserialize_with = "lenient_level",
        skip_serializing_if = "Option::is_none"
    )]
    pub level: Option<LogLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
}

impl LogEntry {
    pub fn new(timestamp: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            message: message.into(),
            level: None,
            service: None,
        }
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = Some(level);
        self
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }
}

/// Unknown or non-string levels become `None` instead of failing the whole batch.
fn lenient_level<'de, D>(deserializer: D) -> Result<Option<LogLevel>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(|v| v.as_str()).and_then(LogLevel::parse))
}

/// Aggregate resource summary shown at the top of the dashboard.
///
/// The backend is loose about numbers (byte counts arrive as floats, counters
/// occasionally as strings), so every numeric field is read leniently.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DashboardSummary {
    #[serde(deserialize_with = "lenient_count")]
    pub total_containers: u32,
    #[serde(deserialize_with = "lenient_count")]
    pub running_containers: u32,
    #[serde(deserialize_with = "lenient_number")]
    pub cpu_usage: f64,
    #[serde(deserialize_with = "lenient_number")]
    pub memory_usage: f64,
    #[serde(deserialize_with = "lenient_number")]
    pub memory_limit: f64,
    #[serde(deserialize_with = "lenient_number")]
    pub network_rx: f64,
    #[serde(deserialize_with = "lenient_number")]
    pub network_tx: f64,
    /// Fields the backend sends that this client has no typed slot for
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Gauge reading for a single container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContainerMetrics {
    #[serde(alias = "containerId", deserialize_with = "lenient_id")]
    pub id: String,
    #[serde(deserialize_with = "lenient_id")]
    pub name: String,
    #[serde(deserialize_with = "lenient_id")]
    pub status: String,
    #[serde(deserialize_with = "lenient_number")]
    pub cpu_usage: f64,
    #[serde(deserialize_with = "lenient_number")]
    pub memory_usage: f64,
    #[serde(deserialize_with = "lenient_number")]
    pub memory_limit: f64,
    #[serde(deserialize_with = "lenient_number")]
    pub network_rx: f64,
    #[serde(deserialize_with = "lenient_number")]
    pub network_tx: f64,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ContainerMetrics {
    /// Memory usage as a percentage of the limit, if a limit is known.
    pub fn memory_percent(&self) -> Option<f64> {
        if self.memory_limit > 0.0 {
            Some(self.memory_usage / self.memory_limit * 100.0)
        } else {
            None
        }
    }
}

/// Point-in-time metrics reading. Replaces the previous snapshot wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Epoch milliseconds
    #[serde(deserialize_with = "lenient_millis")]
    pub timestamp: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub dashboard: DashboardSummary,
    #[serde(default, deserialize_with = "null_as_default")]
    pub containers: Vec<ContainerMetrics>,
}

impl MetricsSnapshot {
    /// Wall-clock time of the reading, if the timestamp is representable.
    pub fn taken_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }
}

/// Numbers, numeric strings and `null`. Anything unreadable becomes `0.0`.
fn lenient_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let number = match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    Ok(number.filter(|n| n.is_finite()).unwrap_or(0.0))
}

/// Counters sent as integers, floats or strings. Rounded, negatives clamp to zero.
fn lenient_count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let n = lenient_number(deserializer)?;
    Ok(n.round().clamp(0.0, u32::MAX as f64) as u32)
}

/// Identifiers may be numeric on the wire.
fn lenient_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Number(n)) => n.to_string(),
        Some(serde_json::Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    })
}

/// Epoch milliseconds as an integer or a float; the reading is unusable without one.
fn lenient_millis<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let millis = match &value {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f.trunc() as i64),
        _ => None,
    };
    millis.ok_or_else(|| {
        serde::de::Error::custom(format!("invalid timestamp {}, expected epoch milliseconds", value))
    })
}

/// `null` is read as the type's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Per-subscription connectivity, reset on every (re)connect attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConnectionState {
    pub is_connected: bool,
    pub last_error: Option<String>,
    pub last_update: Option<DateTime<Utc>>,
}

/// What a subscriber observes: connectivity plus the variant's data, changed together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamSnapshot<V> {
    pub connection: ConnectionState,
    pub data: V,
}
