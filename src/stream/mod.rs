//! Streaming telemetry client.
//!
//! Server-push subscriptions for container logs, application logs and
//! dashboard metrics:
//!
//! - [`sse`] splits the byte stream into named events
//! - [`decoder`] turns events into typed records
//! - [`handler`] folds records into the subscriber-visible view
//!   ([`buffer::LogBuffer`] for logs)
//! - [`policy`] decides when to reconnect
//! - [`subscription`] owns the transport and ties it all together
//!
//! # Example
//!
//! ```no_run
//! use easydeploy::auth::AuthContext;
//! use easydeploy::config::EasyDeployConfig;
//! use easydeploy::stream::StreamClient;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EasyDeployConfig::default();
//! let client = StreamClient::from_config(&config, AuthContext::in_memory())?;
//! let mut logs = client.container_logs("c-123");
//! logs.enable()?;
//!
//! let mut rx = logs.watch();
//! while rx.changed().await.is_ok() {
//!     let snapshot = rx.borrow_and_update().clone();
//!     println!("{} entries, connected: {}", snapshot.data.len(), snapshot.connection.is_connected);
//! }
//! # Ok(())
//! # }
//! ```

pub mod buffer;
pub mod decoder;
pub mod handler;
pub mod policy;
pub mod sse;
pub mod subscription;
pub mod transport;
pub mod types;

pub use buffer::{LogBuffer, DEFAULT_LOG_CAPACITY};
pub use decoder::{decode, DecodeError, StreamEvent};
pub use handler::{AppLogsHandler, Applied, LogsHandler, MetricsHandler, StreamHandler};
pub use policy::{LinkState, ReconnectConfig, ReconnectPolicy, ReconnectStrategy, RetryDecision};
pub use sse::{sse_events, SseEvent};
pub use subscription::{StreamClient, StreamError, Subscription};
pub use transport::{ByteStream, HttpTransport, Transport, TransportError};
pub use types::{
    ConnectionState, ContainerMetrics, DashboardSummary, LogEntry, LogLevel, MetricsSnapshot,
    StreamSnapshot,
};
