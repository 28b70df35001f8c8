//! Per-variant reducers that turn decoded events into subscriber-visible data.

use chrono::{DateTime, Utc};

use super::buffer::LogBuffer;
use super::decoder::StreamEvent;
use super::types::{LogEntry, MetricsSnapshot};

/// Outcome of applying one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Data changed; `last_update` moves to the given time
    Changed(DateTime<Utc>),
    /// Nothing to publish
    Unchanged,
}

/// Folds decoded events into the view a subscriber observes.
pub trait StreamHandler: Send + 'static {
    type View: Clone + Default + Send + Sync + 'static;

    /// Apply one event. Events this handler does not consume return `Unchanged`.
    fn apply(&mut self, event: StreamEvent) -> Applied;

    /// Current view, published after every change.
    fn view(&self) -> Self::View;
}

/// Container log stream: merges `logs` batches into a [`LogBuffer`].
#[derive(Debug, Clone)]
pub struct LogsHandler {
    buffer: LogBuffer,
}

impl LogsHandler {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: LogBuffer::new(capacity),
        }
    }

    pub fn buffer(&self) -> &LogBuffer {
        &self.buffer
    }
}

impl StreamHandler for LogsHandler {
    type View = Vec<LogEntry>;

    fn apply(&mut self, event: StreamEvent) -> Applied {
        match event {
            StreamEvent::Logs(batch) if !batch.is_empty() => {
                let added = self.buffer.merge(batch);
                tracing::trace!(added, retained = self.buffer.len(), "Merged log batch");
                Applied::Changed(Utc::now())
            }
            _ => Applied::Unchanged,
        }
    }

    fn view(&self) -> Self::View {
        self.buffer.entries().to_vec()
    }
}

/// Dashboard metrics stream: each snapshot replaces the previous one.
#[derive(Debug, Clone, Default)]
pub struct MetricsHandler {
    latest: Option<MetricsSnapshot>,
}

impl MetricsHandler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StreamHandler for MetricsHandler {
    type View = Option<MetricsSnapshot>;

    fn apply(&mut self, event: StreamEvent) -> Applied {
        match event {
            StreamEvent::Metrics(snapshot) => {
                let at = snapshot.taken_at().unwrap_or_else(Utc::now);
                self.latest = Some(snapshot);
                Applied::Changed(at)
            }
            _ => Applied::Unchanged,
        }
    }

    fn view(&self) -> Self::View {
        self.latest.clone()
    }
}

/// Single-application log stream: the payload is the whole log so far.
#[derive(Debug, Clone, Default)]
pub struct AppLogsHandler {
    blob: String,
}

impl AppLogsHandler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StreamHandler for AppLogsHandler {
    type View = String;

    fn apply(&mut self, event: StreamEvent) -> Applied {
        match event {
            StreamEvent::AppLogs(blob) => {
                if blob == self.blob {
                    return Applied::Unchanged;
                }
                self.blob = blob;
                Applied::Changed(Utc::now())
            }
            _ => Applied::Unchanged,
        }
    }

    fn view(&self) -> Self::View {
        self.blob.clone()
    }
}
