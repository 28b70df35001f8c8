//! Terminal presentation of subscription snapshots.
//!
//! Views are plain state machines: feed them a snapshot, get back the text to
//! print. They never touch the subscription itself.

mod app_logs;
mod logs;
mod metrics;
mod scroll;

pub use app_logs::AppLogView;
pub use logs::{format_entry, LogView};
pub use metrics::{format_containers_table, format_metrics, format_metrics_json, human_bytes, MetricsView};
pub use scroll::ScrollState;

use colored::Colorize;

use crate::stream::ConnectionState;

/// One-line connectivity status.
pub fn format_connection(connection: &ConnectionState, color: bool) -> String {
    let mut line = if connection.is_connected {
        "● connected".to_string()
    } else {
        "○ disconnected".to_string()
    };
    if let Some(err) = &connection.last_error {
        line.push_str(&format!(" ({})", err));
    }
    if let Some(at) = connection.last_update {
        line.push_str(&format!(", last update {}", at.format("%H:%M:%S")));
    }
    if !color {
        return line;
    }
    if connection.is_connected {
        line.green().to_string()
    } else if connection.last_error.is_some() {
        line.red().to_string()
    } else {
        line.yellow().to_string()
    }
}
