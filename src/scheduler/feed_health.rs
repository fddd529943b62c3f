//! Background health probe for the quote feed
//!
//! While the feed's fallback latch is tripped every quote is served from
//! mock data, so something has to notice the upstream coming back. This
//! task probes the upstream health endpoint on a fixed interval and the
//! probe clears the latch on success.

use crate::state::AppState;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Periodic upstream health probe
pub struct FeedHealthScheduler {
    state: Arc<AppState>,
    interval: Duration,
}

impl FeedHealthScheduler {
    pub fn new(state: Arc<AppState>) -> Self {
        let interval = Duration::from_secs(state.config.feed_health_interval_secs.max(1));
        Self { state, interval }
    }

    /// Spawn the probe loop on the runtime
    pub fn start(self) {
        if self.state.config.mock_only || self.state.config.feed_url.is_none() {
            info!("No live quote upstream configured, health probe not started");
            return;
        }

        info!(
            "Feed health probe started, interval {}s",
            self.interval.as_secs()
        );

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            // The first tick fires immediately; skip it so the server
            // finishes starting before the first probe.
            ticker.tick().await;

            loop {
                ticker.tick().await;

                // Probing only matters while degraded. The probe itself
                // clears the latch when the upstream answers.
                if self.state.feed.is_degraded() {
                    let healthy = self.state.feed.health_check().await;
                    debug!("Feed health probe: healthy={}", healthy);
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_floor() {
        let state = Arc::new(AppState::new_for_testing());
        let scheduler = FeedHealthScheduler::new(state);
        assert!(scheduler.interval >= Duration::from_secs(1));
    }
}
