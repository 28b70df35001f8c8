//! Logs and app-logs command implementations

use crate::cli::follow::{follow, Render};
use crate::cli::{connect, AppLogsArgs, GlobalArgs, LogsArgs};
use crate::stream::{LogEntry, StreamSnapshot};
use crate::view::{AppLogView, LogView};
use std::io::Write;

/// Stdin commands: `p` pauses output, an empty line or `g` jumps back to the latest entry.
struct LogRenderer {
    view: LogView,
}

impl Render<Vec<LogEntry>> for LogRenderer {
    fn render(&mut self, snapshot: &StreamSnapshot<Vec<LogEntry>>) {
        for line in self.view.update(snapshot) {
            println!("{}", line);
        }
        if let Some(hint) = self.view.jump_hint() {
            eprintln!("{}", hint);
        }
    }

    fn on_input(&mut self, line: &str) -> bool {
        match line {
            "p" => {
                // Same effect as scrolling far away from the tail
                self.view.scroll_mut().on_user_scroll(usize::MAX);
                eprintln!("-- paused, press Enter to resume --");
                false
            }
            "" | "g" => {
                let resumed = self.view.scroll().show_jump_to_latest();
                self.view.scroll_mut().scroll_to_latest();
                resumed
            }
            _ => false,
        }
    }

    fn wants_input(&self) -> bool {
        true
    }
}

struct AppLogRenderer {
    view: AppLogView,
}

impl Render<String> for AppLogRenderer {
    fn render(&mut self, snapshot: &StreamSnapshot<String>) {
        let text = self.view.update(snapshot);
        if !text.is_empty() {
            let mut stdout = std::io::stdout().lock();
            let _ = stdout.write_all(text.as_bytes());
            let _ = stdout.flush();
        }
    }
}

/// Handle `easydeploy logs` command
pub async fn run_logs(
    global: &GlobalArgs,
    args: &LogsArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let (config, client, color) = connect(global)?;

    let mut subscription = client.container_logs(&args.container_id);
    subscription.enable()?;
    tracing::info!(container_id = %args.container_id, "Following container logs");

    let mut renderer = LogRenderer {
        view: LogView::new(config.stream.scroll_threshold, color),
    };
    follow(&subscription, &mut renderer).await
}

/// Handle `easydeploy app-logs` command
pub async fn run_app_logs(
    global: &GlobalArgs,
    args: &AppLogsArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let (_config, client, color) = connect(global)?;

    let mut subscription = client.app_logs(&args.app_id);
    subscription.enable()?;
    tracing::info!(app_id = %args.app_id, "Following application logs");

    let mut renderer = AppLogRenderer {
        view: AppLogView::new(color),
    };
    follow(&subscription, &mut renderer).await
}
