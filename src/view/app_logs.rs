//! Application log blob rendering.

use super::format_connection;
use crate::stream::StreamSnapshot;

/// Prints what was appended to the application log blob since the last
/// update. A blob that no longer extends what was printed (log rotated or
/// truncated upstream) is printed again in full.
#[derive(Debug, Clone, Default)]
pub struct AppLogView {
    printed: String,
    last_connection: Option<(bool, Option<String>)>,
    color: bool,
}

impl AppLogView {
    pub fn new(color: bool) -> Self {
        Self {
            color,
            ..Default::default()
        }
    }

    /// Text to write for this snapshot. Empty when nothing changed.
    pub fn update(&mut self, snapshot: &StreamSnapshot<String>) -> String {
        let mut out = String::new();

        let connection = (
            snapshot.connection.is_connected,
            snapshot.connection.last_error.clone(),
        );
        if self.last_connection.as_ref() != Some(&connection) {
            let first = self.last_connection.is_none();
            self.last_connection = Some(connection);
            if !(first && !snapshot.connection.is_connected && snapshot.connection.last_error.is_none()) {
                out.push_str(&format_connection(&snapshot.connection, self.color));
                out.push('\n');
            }
        }

        let blob = &snapshot.data;
        if blob.len() == self.printed.len() && *blob == self.printed {
            return out;
        }
        match blob.strip_prefix(self.printed.as_str()) {
            Some(suffix) if !self.printed.is_empty() => out.push_str(suffix),
            _ => {
                if !self.printed.is_empty() {
                    out.push_str("--- log replaced ---\n");
                }
                out.push_str(blob);
            }
        }
        self.printed.clone_from(blob);
        out
    }
}
