//! Bounded, duplicate-free log buffer.
//!
//! Upstream may redeliver overlapping windows after a reconnect. Merging is
//! keyed by timestamp so redelivery is idempotent, and only the trailing
//! `capacity` entries are kept.

use std::collections::HashMap;

use super::types::LogEntry;

/// Default number of retained log entries.
pub const DEFAULT_LOG_CAPACITY: usize = 500;

/// Log entries in arrival order, unique by timestamp, capped at `capacity`.
#[derive(Debug, Clone)]
pub struct LogBuffer {
    entries: Vec<LogEntry>,
    capacity: usize,
}

impl LogBuffer {
    /// Creates an empty buffer. A zero capacity is treated as one.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    /// Merge a decoded batch.
    ///
    /// A duplicate timestamp keeps the slot of its first occurrence and takes
    /// the value of its last. Entries are not re-sorted. Returns the number of
    /// entries whose timestamp was not present before.
    pub fn merge(&mut self, batch: Vec<LogEntry>) -> usize {
        if batch.is_empty() {
            return 0;
        }

        let before = self.entries.len();
        let mut merged: Vec<LogEntry> = Vec::with_capacity(before + batch.len());
        let mut slots: HashMap<String, usize> = HashMap::with_capacity(before + batch.len());

        for entry in self.entries.drain(..).chain(batch) {
            match slots.get(&entry.timestamp) {
                Some(&slot) => merged[slot] = entry,
                None => {
                    slots.insert(entry.timestamp.clone(), merged.len());
                    merged.push(entry);
                }
            }
        }

        let added = merged.len().saturating_sub(before);
        if merged.len() > self.capacity {
            merged.drain(..merged.len() - self.capacity);
        }
        self.entries = merged;
        added
    }

    /// Entries in retained order (oldest first).
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}
