//! Drive a subscription until interrupted or the link gives up.

use crate::stream::{LinkState, StreamHandler, StreamSnapshot, Subscription};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Turns snapshots into terminal output.
pub trait Render<V> {
    fn render(&mut self, snapshot: &StreamSnapshot<V>);

    /// A line typed on stdin. Returns true if the current snapshot should be
    /// rendered again.
    fn on_input(&mut self, _line: &str) -> bool {
        false
    }

    /// Stop following once this returns true.
    fn done(&self) -> bool {
        false
    }

    /// Whether stdin lines should be fed to [`Render::on_input`].
    fn wants_input(&self) -> bool {
        false
    }
}

/// Render every published snapshot until Ctrl-C, until the renderer is done,
/// or until the subscription reaches a terminal link state.
pub async fn follow<H, R>(
    subscription: &Subscription<H>,
    renderer: &mut R,
) -> Result<(), Box<dyn std::error::Error>>
where
    H: StreamHandler,
    R: Render<H::View>,
{
    let mut snapshots = subscription.watch();
    let mut link = subscription.link();
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = renderer.wants_input();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let current = snapshots.borrow_and_update().clone();
    renderer.render(&current);

    let state = *link.borrow_and_update();
    if state.is_terminal() {
        return Err(terminal_error(state, &current.connection.last_error));
    }

    while !renderer.done() {
        tokio::select! {
            _ = &mut ctrl_c => {
                tracing::info!("Received SIGINT, shutting down...");
                return Ok(());
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                let current = snapshots.borrow_and_update().clone();
                renderer.render(&current);
            }
            changed = link.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                let state = *link.borrow_and_update();
                if state.is_terminal() {
                    return Err(terminal_error(state, &subscription.snapshot().connection.last_error));
                }
            }
            line = stdin.next_line(), if stdin_open => {
                match line {
                    Ok(Some(line)) => {
                        if renderer.on_input(line.trim()) {
                            let current = snapshots.borrow().clone();
                            renderer.render(&current);
                        }
                    }
                    _ => stdin_open = false,
                }
            }
        }
    }

    Ok(())
}

fn terminal_error(state: LinkState, last_error: &Option<String>) -> Box<dyn std::error::Error> {
    let reason = last_error.as_deref().unwrap_or("no error recorded");
    match state {
        LinkState::Exhausted => format!("Gave up reconnecting: {}", reason).into(),
        _ => format!("Stream closed: {}", reason).into(),
    }
}
