use std::time::Duration;

use tracing::{debug, info};

use crate::config::RunConfig;
use crate::types::RunCounters;

/// Paces actions and decides when the page is due for a reload.
#[derive(Debug, Clone)]
pub struct ThrottleController {
    delay: Duration,
    jitter: Duration,
    refresh_every: u32,
}

impl ThrottleController {
    pub fn new(config: &RunConfig) -> Self {
        Self {
            delay: config.pacing.action_delay,
            jitter: config.pacing.action_jitter,
            refresh_every: config.refresh_every,
        }
    }

    /// Base delay plus a random share of the jitter, so the request rate
    /// does not look machine-timed.
    pub fn next_delay(&self) -> Duration {
        if self.jitter.is_zero() {
            return self.delay;
        }
        self.delay + self.jitter.mul_f32(rand::random::<f32>())
    }

    pub fn before_action(&self) {
        let pause = self.next_delay();
        if !pause.is_zero() {
            debug!(pause_ms = pause.as_millis() as u64, "throttling");
            std::thread::sleep(pause);
        }
    }

    /// Counts a successful action. Returns `true` when a full reload is due,
    /// in which case the counter has already been reset.
    pub fn after_action(&self, counters: &mut RunCounters, succeeded: bool) -> bool {
        if !succeeded || self.refresh_every == 0 {
            return false;
        }
        counters.since_last_refresh += 1;
        if counters.since_last_refresh >= self.refresh_every {
            info!(
                every = self.refresh_every,
                processed = counters.processed_count,
                "refresh cadence reached"
            );
            counters.since_last_refresh = 0;
            return true;
        }
        false
    }
}
