//! Dashboard metrics rendering.

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use serde_json::json;

use super::format_connection;
use crate::stream::{ContainerMetrics, MetricsSnapshot, StreamSnapshot};

/// Redraws the dashboard whenever a new reading (or a connectivity change)
/// arrives.
#[derive(Debug, Clone, Default)]
pub struct MetricsView {
    last_timestamp: Option<i64>,
    last_connection: Option<(bool, Option<String>)>,
    color: bool,
}

impl MetricsView {
    pub fn new(color: bool) -> Self {
        Self {
            color,
            ..Default::default()
        }
    }

    /// Full frame to print, or `None` if nothing visible changed.
    pub fn update(&mut self, snapshot: &StreamSnapshot<Option<MetricsSnapshot>>) -> Option<String> {
        let timestamp = snapshot.data.as_ref().map(|m| m.timestamp);
        let connection = (
            snapshot.connection.is_connected,
            snapshot.connection.last_error.clone(),
        );
        if timestamp == self.last_timestamp
            && self.last_connection.as_ref() == Some(&connection)
        {
            return None;
        }
        self.last_timestamp = timestamp;
        self.last_connection = Some(connection);

        let mut frame = format_connection(&snapshot.connection, self.color);
        frame.push('\n');
        match &snapshot.data {
            Some(metrics) => frame.push_str(&format_metrics(metrics, self.color)),
            None => frame.push_str("Waiting for first metrics reading..."),
        }
        Some(frame)
    }
}

/// Summary line followed by the per-container table.
pub fn format_metrics(metrics: &MetricsSnapshot, color: bool) -> String {
    let d = &metrics.dashboard;
    let taken_at = metrics
        .taken_at()
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| metrics.timestamp.to_string());

    let mut out = format!(
        "{} | containers {}/{} running | cpu {:.1}% | mem {} / {} | net rx {} tx {}\n",
        taken_at,
        d.running_containers,
        d.total_containers,
        d.cpu_usage,
        human_bytes(d.memory_usage),
        human_bytes(d.memory_limit),
        human_bytes(d.network_rx),
        human_bytes(d.network_tx),
    );
    out.push_str(&format_containers_table(&metrics.containers, color));
    out
}

/// Format containers as a table
pub fn format_containers_table(containers: &[ContainerMetrics], color: bool) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Name", "ID", "Status", "CPU", "Memory", "Net RX", "Net TX"]);

    for c in containers {
        let memory = match c.memory_percent() {
            Some(pct) => format!("{} ({:.1}%)", human_bytes(c.memory_usage), pct),
            None => human_bytes(c.memory_usage),
        };
        table.add_row(vec![
            Cell::new(&c.name),
            Cell::new(short_id(&c.id)),
            Cell::new(status_label(&c.status, color)),
            Cell::new(format!("{:.1}%", c.cpu_usage)),
            Cell::new(memory),
            Cell::new(human_bytes(c.network_rx)),
            Cell::new(human_bytes(c.network_tx)),
        ]);
    }

    table.to_string()
}

/// Format a metrics reading as JSON
pub fn format_metrics_json(metrics: Option<&MetricsSnapshot>) -> String {
    serde_json::to_string_pretty(&json!({ "metrics": metrics })).unwrap_or_default()
}

fn status_label(status: &str, color: bool) -> String {
    if !color {
        return status.to_string();
    }
    match status.to_ascii_lowercase().as_str() {
        "running" | "healthy" => status.green().to_string(),
        "exited" | "dead" | "error" | "unhealthy" => status.red().to_string(),
        _ => status.yellow().to_string(),
    }
}

fn short_id(id: &str) -> &str {
    id.get(..12).unwrap_or(id)
}

/// Binary units, one decimal place.
pub fn human_bytes(bytes: f64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = if bytes.is_finite() { bytes.max(0.0) } else { 0.0 };
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{:.0} B", value)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
