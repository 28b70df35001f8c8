//! Terminal rendering for log streams.

use colored::Colorize;

use super::scroll::ScrollState;
use super::format_connection;
use crate::stream::{ConnectionState, LogEntry, LogLevel, StreamSnapshot};

/// Renders newly arrived log entries and connection changes.
///
/// The dedup buffer is re-published whole on every batch; the view keeps a
/// cursor (timestamp of the last printed entry) so only the tail beyond it is
/// printed. While auto-scroll is paused nothing is printed and new entries
/// are counted instead.
#[derive(Debug, Clone)]
pub struct LogView {
    scroll: ScrollState,
    cursor: Option<String>,
    unseen: usize,
    last_connection: Option<(bool, Option<String>)>,
    color: bool,
}

impl LogView {
    pub fn new(scroll_threshold: usize, color: bool) -> Self {
        Self {
            scroll: ScrollState::new(scroll_threshold),
            cursor: None,
            unseen: 0,
            last_connection: None,
            color,
        }
    }

    pub fn scroll(&self) -> &ScrollState {
        &self.scroll
    }

    pub fn scroll_mut(&mut self) -> &mut ScrollState {
        &mut self.scroll
    }

    /// Entries received while paused.
    pub fn unseen(&self) -> usize {
        self.unseen
    }

    /// Lines to print for this snapshot, status line first.
    pub fn update(&mut self, snapshot: &StreamSnapshot<Vec<LogEntry>>) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(status) = self.connection_changed(&snapshot.connection) {
            lines.push(status);
        }

        let fresh = self.fresh(&snapshot.data);
        if fresh.is_empty() {
            return lines;
        }

        if self.scroll.is_auto_scroll() {
            lines.extend(fresh.iter().map(|e| format_entry(e, self.color)));
            self.cursor = fresh.last().map(|e| e.timestamp.clone());
            self.unseen = 0;
        } else {
            self.unseen = fresh.len();
        }
        lines
    }

    /// Footer hint shown while paused.
    pub fn jump_hint(&self) -> Option<String> {
        if self.scroll.show_jump_to_latest() && self.unseen > 0 {
            Some(format!("-- {} new lines, scroll to latest to resume --", self.unseen))
        } else {
            None
        }
    }

    fn fresh<'a>(&self, entries: &'a [LogEntry]) -> &'a [LogEntry] {
        match &self.cursor {
            Some(cursor) => match entries.iter().rposition(|e| &e.timestamp == cursor) {
                Some(i) => &entries[i + 1..],
                // Cursor evicted: everything retained is newer
                None => entries,
            },
            None => entries,
        }
    }

    fn connection_changed(&mut self, connection: &ConnectionState) -> Option<String> {
        let key = (connection.is_connected, connection.last_error.clone());
        if self.last_connection.as_ref() == Some(&key) {
            return None;
        }
        let first = self.last_connection.is_none();
        self.last_connection = Some(key);
        // Don't announce the initial "not connected yet" state
        if first && !connection.is_connected && connection.last_error.is_none() {
            return None;
        }
        Some(format_connection(connection, self.color))
    }
}

/// `timestamp LEVEL [service] message`
pub fn format_entry(entry: &LogEntry, color: bool) -> String {
    let mut line = String::with_capacity(entry.timestamp.len() + entry.message.len() + 16);
    line.push_str(&entry.timestamp);
    if let Some(level) = entry.level {
        line.push(' ');
        line.push_str(&format_level(level, color));
    }
    if let Some(service) = &entry.service {
        line.push_str(&format!(" [{}]", service));
    }
    line.push(' ');
    line.push_str(&entry.message);
    line
}

fn format_level(level: LogLevel, color: bool) -> String {
    let label = format!("{:<5}", level.to_string());
    if !color {
        return label;
    }
    match level {
        LogLevel::Error => label.red().bold().to_string(),
        LogLevel::Warn => label.yellow().to_string(),
        LogLevel::Info => label.green().to_string(),
        LogLevel::Debug => label.dimmed().to_string(),
    }
}
