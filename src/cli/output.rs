//! Output formatting helpers for CLI commands

use crate::auth::{Session, TokenSource};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use serde_json::json;

/// View model for session display
#[derive(Debug, Clone, serde::Serialize)]
pub struct SessionView {
    pub authenticated: bool,
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub roles: Vec<String>,
    pub token: Option<String>,
    pub token_source: Option<String>,
}

impl SessionView {
    /// `session` is the structured entry (if any); `resolved` is where the
    /// token actually resolves from, which may be a fallback source.
    pub fn new(session: Option<&Session>, resolved: Option<(&str, TokenSource)>) -> Self {
        let user = session.and_then(|s| s.user.as_ref());
        Self {
            authenticated: session.map(|s| s.is_authenticated).unwrap_or(false),
            user_id: user.map(|u| u.id.clone()).filter(|id| !id.is_empty()),
            email: user.map(|u| u.email.clone()).filter(|e| !e.is_empty()),
            name: user.and_then(|u| u.name.clone()),
            roles: user
                .map(|u| u.roles.iter().map(|r| r.to_string()).collect())
                .unwrap_or_default(),
            token: resolved.map(|(token, _)| redact_token(token)),
            token_source: resolved.map(|(_, source)| source.to_string()),
        }
    }
}

/// First four characters, the rest elided.
pub fn redact_token(token: &str) -> String {
    let visible: String = token.chars().take(4).collect();
    if token.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("{}…", visible)
    }
}

/// Format session as a table
pub fn format_session_table(view: &SessionView) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Field", "Value"]);

    let status = if view.authenticated {
        "Authenticated".green().to_string()
    } else {
        "Not authenticated".yellow().to_string()
    };
    let none = || "-".to_string();

    table.add_row(vec![Cell::new("Status"), Cell::new(status)]);
    table.add_row(vec![
        Cell::new("User"),
        Cell::new(view.user_id.clone().unwrap_or_else(none)),
    ]);
    table.add_row(vec![
        Cell::new("Email"),
        Cell::new(view.email.clone().unwrap_or_else(none)),
    ]);
    table.add_row(vec![
        Cell::new("Name"),
        Cell::new(view.name.clone().unwrap_or_else(none)),
    ]);
    table.add_row(vec![
        Cell::new("Roles"),
        Cell::new(if view.roles.is_empty() {
            none()
        } else {
            view.roles.join(", ")
        }),
    ]);
    let token = match (&view.token, &view.token_source) {
        (Some(token), Some(source)) => format!("{} (from {})", token, source),
        _ => "none".red().to_string(),
    };
    table.add_row(vec![Cell::new("Token"), Cell::new(token)]);

    table.to_string()
}

/// Format session as JSON
pub fn format_session_json(view: &SessionView) -> String {
    serde_json::to_string_pretty(&json!({ "session": view })).unwrap_or_default()
}
