//! # Joiner
//!
//! Fan-in point of the aggregation branches. Pauses for a fixed duration so
//! the freshness check starts well after the insert.

use std::time::Duration;
use tracing::debug;

use super::clock::Clock;
use crate::config::JoinConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Joiner {
    pause: Duration,
}

impl Joiner {
    pub fn new(pause: Duration) -> Self {
        Self { pause }
    }

    pub fn from_config(config: &JoinConfig) -> Self {
        Self::new(config.pause())
    }

    pub fn pause(&self) -> Duration {
        self.pause
    }

    /// Suspend for the configured pause without blocking other tasks
    pub async fn run(&self, clock: &dyn Clock) {
        debug!(pause_secs = self.pause.as_secs(), "Joiner pausing");
        clock.sleep(self.pause).await;
    }
}
