use std::time::Duration;

use crate::types::Role;

/// Sleeps and bounded waits used while driving the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pacing {
    /// Base pause before each action.
    pub action_delay: Duration,
    /// Upper bound of the random extra pause added to `action_delay`.
    pub action_jitter: Duration,
    /// Pause after a scroll or "load more" click.
    pub scroll_settle: Duration,
    /// Pause after a reload or back navigation.
    pub reload_settle: Duration,
    /// How long to wait for a menu entry or dialog to show up.
    pub control_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            action_delay: Duration::from_secs(2),
            action_jitter: Duration::from_millis(750),
            scroll_settle: Duration::from_secs(2),
            reload_settle: Duration::from_secs(5),
            control_timeout: Duration::from_secs(3),
            poll_interval: Duration::from_millis(250),
        }
    }
}

impl Pacing {
    /// No sleeping at all. For in-memory pages.
    pub fn immediate() -> Self {
        Self {
            action_delay: Duration::ZERO,
            action_jitter: Duration::ZERO,
            scroll_settle: Duration::ZERO,
            reload_settle: Duration::ZERO,
            control_timeout: Duration::ZERO,
            poll_interval: Duration::ZERO,
        }
    }
}

/// Everything the deletion loop needs to know. Fixed for the whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub role: Role,
    /// Stop after this many items were handed to the executor.
    pub max_items: Option<u64>,
    /// Leading positions of the first enumeration that are never touched.
    pub preserve_first: usize,
    pub initial_scroll_rounds: u32,
    pub post_refresh_scroll_rounds: u32,
    /// Consecutive growth attempts without any page change before the feed
    /// counts as exhausted.
    pub growth_stall_limit: u32,
    /// Hard cap on growth attempts for a single `next_item` call.
    pub growth_round_limit: u32,
    /// Successful actions between forced reloads. 0 disables them.
    pub refresh_every: u32,
    pub max_attempts: u32,
    /// Re-checks of an action's post-condition before it counts as rejected.
    pub verify_polls: u32,
    /// Consecutive error-page reloads tolerated before aborting.
    pub error_page_budget: u32,
    /// Consecutive item failures that force a reload.
    pub stale_refresh_after: u32,
    pub pacing: Pacing,
}

impl RunConfig {
    pub const DEFAULT_REFRESH_EVERY: u32 = 50;

    pub fn new(role: Role) -> Self {
        Self {
            role,
            max_items: None,
            preserve_first: 1,
            initial_scroll_rounds: 5,
            post_refresh_scroll_rounds: 3,
            growth_stall_limit: 2,
            growth_round_limit: 40,
            refresh_every: Self::DEFAULT_REFRESH_EVERY,
            max_attempts: 2,
            verify_polls: 4,
            error_page_budget: 3,
            stale_refresh_after: 5,
            pacing: Pacing::default(),
        }
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn limit_reached(&self, dispatched: u64) -> bool {
        self.max_items.is_some_and(|max| dispatched >= max)
    }
}
