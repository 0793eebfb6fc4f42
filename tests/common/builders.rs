//! Test harness for whole-workflow runs on virtual time.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use medal_workflow::{
    Category, EventPublisher, FixedSelection, InMemoryMedalStore, ManualClock, PublishedEvent,
    RandomSelector, SelectionSource, WorkflowConfig, WorkflowRunner,
};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Fixed start instant so timestamps in assertions are readable
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 8, 11, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub fn seconds_after(start: DateTime<Utc>, seconds: i64) -> DateTime<Utc> {
    start + chrono::Duration::seconds(seconds)
}

/// Clock, store and runner for one test
pub struct WorkflowHarness {
    pub clock: ManualClock,
    pub store: Arc<InMemoryMedalStore>,
    pub runner: WorkflowRunner,
}

pub struct WorkflowHarnessBuilder {
    config: WorkflowConfig,
    selector: Arc<dyn SelectionSource>,
    source_counts: Vec<(Category, i64)>,
    failing_inserts: Option<String>,
    publisher: Option<EventPublisher>,
}

impl Default for WorkflowHarnessBuilder {
    fn default() -> Self {
        Self {
            config: WorkflowConfig::default(),
            selector: Arc::new(RandomSelector::with_seed(1)),
            source_counts: vec![
                (Category::Bronze, 1_100),
                (Category::Silver, 1_050),
                (Category::Gold, 1_080),
            ],
            failing_inserts: None,
            publisher: None,
        }
    }
}

impl WorkflowHarnessBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selecting(mut self, value: &str) -> Self {
        self.selector = Arc::new(FixedSelection::new(value));
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.selector = Arc::new(RandomSelector::with_seed(seed));
        self
    }

    pub fn with_config(mut self, config: WorkflowConfig) -> Self {
        self.config = config;
        self
    }

    pub fn join_pause_seconds(mut self, seconds: u64) -> Self {
        self.config.join.pause_seconds = seconds;
        self
    }

    pub fn failing_inserts(mut self, message: &str) -> Self {
        self.failing_inserts = Some(message.to_string());
        self
    }

    pub fn with_publisher(mut self, publisher: EventPublisher) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn build(self) -> WorkflowHarness {
        let clock = ManualClock::new(epoch());
        let mut store = InMemoryMedalStore::new()
            .with_source_counts(self.source_counts);
        if let Some(message) = self.failing_inserts {
            store = store.failing_inserts(message);
        }
        let store = Arc::new(store);

        let mut runner = WorkflowRunner::new(self.config, store.clone())
            .expect("valid test configuration")
            .with_selector(self.selector)
            .with_clock(Arc::new(clock.clone()));
        if let Some(publisher) = self.publisher {
            runner = runner.with_publisher(publisher);
        }

        WorkflowHarness {
            clock,
            store,
            runner,
        }
    }
}

/// Drain every event already sitting in the channel
pub fn drain(receiver: &mut broadcast::Receiver<PublishedEvent>) -> Vec<PublishedEvent> {
    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push(event);
    }
    events
}
