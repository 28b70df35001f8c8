//! Auto-scroll / manual-scroll state.

/// Follows the tail until the user scrolls away; only an explicit
/// "scroll to latest" resumes following.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrollState {
    auto_scroll: bool,
    threshold: usize,
}

impl ScrollState {
    /// `threshold` is how far from the bottom (in lines) the viewport may be
    /// before auto-scroll turns off.
    pub fn new(threshold: usize) -> Self {
        Self {
            auto_scroll: true,
            threshold,
        }
    }

    pub fn is_auto_scroll(&self) -> bool {
        self.auto_scroll
    }

    /// Whether the "scroll to latest" affordance should be shown.
    pub fn show_jump_to_latest(&self) -> bool {
        !self.auto_scroll
    }

    /// Report the viewport's distance from the bottom after a user scroll.
    /// Moving back near the bottom does not resume auto-scroll.
    pub fn on_user_scroll(&mut self, distance_from_bottom: usize) {
        if distance_from_bottom > self.threshold && self.auto_scroll {
            tracing::debug!(distance_from_bottom, "Auto-scroll paused");
            self.auto_scroll = false;
        }
    }

    pub fn scroll_to_latest(&mut self) {
        self.auto_scroll = true;
    }
}

impl Default for ScrollState {
    fn default() -> Self {
        Self::new(2)
    }
}
