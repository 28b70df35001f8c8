//! Metrics command implementation

use crate::cli::follow::{follow, Render};
use crate::cli::{connect, GlobalArgs, MetricsArgs};
use crate::stream::{MetricsSnapshot, StreamSnapshot};
use crate::view::{format_metrics_json, MetricsView};

struct MetricsRenderer {
    view: MetricsView,
    json: bool,
    once: bool,
    readings: usize,
}

impl Render<Option<MetricsSnapshot>> for MetricsRenderer {
    fn render(&mut self, snapshot: &StreamSnapshot<Option<MetricsSnapshot>>) {
        if self.json {
            // Only readings, connectivity changes go to the log
            if let Some(metrics) = &snapshot.data {
                if self.view.update(snapshot).is_some() {
                    println!("{}", format_metrics_json(Some(metrics)));
                    self.readings += 1;
                }
            }
            return;
        }

        if let Some(frame) = self.view.update(snapshot) {
            println!("{}", frame);
            if snapshot.data.is_some() {
                self.readings += 1;
            }
        }
    }

    fn done(&self) -> bool {
        self.once && self.readings > 0
    }
}

/// Handle `easydeploy metrics` command
pub async fn run_metrics(
    global: &GlobalArgs,
    args: &MetricsArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let (_config, client, color) = connect(global)?;

    let mut subscription = client.dashboard_metrics();
    subscription.enable()?;

    let mut renderer = MetricsRenderer {
        view: MetricsView::new(color && !args.json),
        json: args.json,
        once: args.once,
        readings: 0,
    };
    follow(&subscription, &mut renderer).await
}
