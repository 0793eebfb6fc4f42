//! # Freshness Checker
//!
//! Sensor that polls the output table until its most recent aggregate record
//! is younger than the freshness window, or gives up once the timeout has
//! elapsed.
//!
//! ```text
//!            poke: fresh
//! Polling ─────────────────> Satisfied
//!    │  ^
//!    │  │ sleep(poke_interval)
//!    └──┘ poke: stale, elapsed < timeout
//!    │
//!    └─────────────────────> TimedOut
//!            poke: stale, elapsed >= timeout
//! ```
//!
//! The first poke happens as soon as the checker starts. Every decision is a
//! pure function of the start instant, the poke instant and the latest
//! timestamp, see [`FreshnessChecker::evaluate`]; [`FreshnessChecker::run`]
//! only adds the store reads and the non-blocking sleeps between pokes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::clock::{earlier_by, later_by, Clock};
use crate::config::FreshnessConfig;
use crate::database::MedalStore;
use crate::error::WorkflowResult;
use crate::events::{EventPublisher, WorkflowEvent};

/// `latest > now - window`; an empty table is never fresh. A window reaching
/// past the first representable instant admits every record.
pub fn is_fresh(latest: Option<DateTime<Utc>>, now: DateTime<Utc>, window: Duration) -> bool {
    match (latest, earlier_by(now, window)) {
        (Some(created_at), Some(cutoff)) => created_at > cutoff,
        (Some(_), None) => true,
        (None, _) => false,
    }
}

/// Timings of the sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreshnessPolicy {
    pub window: Duration,
    pub poke_interval: Duration,
    pub timeout: Duration,
}

impl FreshnessPolicy {
    pub fn new(window: Duration, poke_interval: Duration, timeout: Duration) -> Self {
        Self {
            window,
            poke_interval,
            timeout,
        }
    }

    pub fn from_config(config: &FreshnessConfig) -> Self {
        Self::new(config.window(), config.poke_interval(), config.timeout())
    }
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self::from_config(&FreshnessConfig::default())
    }
}

/// Where the sensor stands after a poke
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SensorState {
    Polling {
        attempts: u32,
        next_poke_at: DateTime<Utc>,
    },
    Satisfied {
        attempts: u32,
        elapsed: Duration,
        observed: DateTime<Utc>,
    },
    TimedOut {
        attempts: u32,
        elapsed: Duration,
        last_seen: Option<DateTime<Utc>>,
    },
}

impl SensorState {
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Polling { attempts, .. }
            | Self::Satisfied { attempts, .. }
            | Self::TimedOut { attempts, .. } => *attempts,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Polling { .. })
    }

    pub fn is_satisfied(&self) -> bool {
        matches!(self, Self::Satisfied { .. })
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Polling { .. } => "polling",
            Self::Satisfied { .. } => "satisfied",
            Self::TimedOut { .. } => "timed_out",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FreshnessChecker {
    policy: FreshnessPolicy,
    publisher: Option<EventPublisher>,
}

impl FreshnessChecker {
    pub fn new(policy: FreshnessPolicy) -> Self {
        Self {
            policy,
            publisher: None,
        }
    }

    /// Publish a `freshness.poked` event after every poke
    pub fn with_publisher(mut self, publisher: EventPublisher) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn policy(&self) -> &FreshnessPolicy {
        &self.policy
    }

    /// Decide the outcome of poke number `attempt` made at `now`
    pub fn evaluate(
        &self,
        started_at: DateTime<Utc>,
        attempt: u32,
        now: DateTime<Utc>,
        latest: Option<DateTime<Utc>>,
    ) -> SensorState {
        let elapsed = (now - started_at).to_std().unwrap_or(Duration::ZERO);

        match latest {
            Some(observed) if is_fresh(latest, now, self.policy.window) => SensorState::Satisfied {
                attempts: attempt,
                elapsed,
                observed,
            },
            _ if elapsed >= self.policy.timeout => SensorState::TimedOut {
                attempts: attempt,
                elapsed,
                last_seen: latest,
            },
            _ => SensorState::Polling {
                attempts: attempt,
                next_poke_at: later_by(now, self.policy.poke_interval),
            },
        }
    }

    /// Poke until satisfied or timed out. Store errors abort the sensor.
    pub async fn run(&self, store: &dyn MedalStore, clock: &dyn Clock) -> WorkflowResult<SensorState> {
        let started_at = clock.now();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let latest = store.latest_created_at().await?;
            let now = clock.now();
            let state = self.evaluate(started_at, attempt, now, latest);

            debug!(
                attempt,
                latest = ?latest,
                state = state.label(),
                "Freshness poke"
            );
            self.publish_poke(&state, latest).await;

            match state {
                SensorState::Polling { .. } => clock.sleep(self.policy.poke_interval).await,
                SensorState::Satisfied { .. } => {
                    info!(attempts = attempt, "Freshness check satisfied");
                    return Ok(state);
                }
                SensorState::TimedOut { .. } => {
                    warn!(
                        attempts = attempt,
                        timeout_secs = self.policy.timeout.as_secs(),
                        "Freshness check timed out"
                    );
                    return Ok(state);
                }
            }
        }
    }

    async fn publish_poke(&self, state: &SensorState, latest: Option<DateTime<Utc>>) {
        let Some(publisher) = &self.publisher else {
            return;
        };
        let event = WorkflowEvent::FreshnessPoked {
            attempt: state.attempts(),
            state: state.label().to_string(),
            latest_created_at: latest,
        };
        if let Err(e) = publisher.publish(event).await {
            warn!(error = %e, "Failed to publish freshness poke");
        }
    }
}
