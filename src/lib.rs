#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Medal Workflow
//!
//! A small batch workflow over an Olympic results dataset, modeled as a DAG:
//!
//! ```text
//! create_schema -> create_table -> pick_medal -> pick_medal_task
//!     -> one of calc_Bronze | calc_Silver | calc_Gold
//!     -> generate_delay -> check_correctness
//! ```
//!
//! Each run picks a medal tier at random, routes to the aggregator for that
//! tier, inserts one aggregate record with the tier's row count, waits a
//! fixed delay, then polls until the newest record is recent enough (or
//! gives up).
//!
//! ## Module Organization
//!
//! - [`orchestration`] - DAG, step components and the [`WorkflowRunner`]
//! - [`database`] - The [`MedalStore`] seam, PostgreSQL and in-memory stores
//! - [`models`] - Categories, branch identifiers and aggregate records
//! - [`state_machine`] - Per-step state machine
//! - [`config`] - Layered YAML and environment configuration
//! - [`events`] - Lifecycle event broadcast
//! - [`logging`] - Structured `tracing` setup
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use medal_workflow::config::ConfigManager;
//! use medal_workflow::logging::init_structured_logging;
//! use medal_workflow::WorkflowRunner;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! init_structured_logging();
//!
//! let manager = ConfigManager::load()?;
//! let runner = WorkflowRunner::from_config_manager(&manager).await?;
//! let report = runner.run().await?.into_result()?;
//! println!("inserted {:?}", report.record);
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! Every test runs against [`InMemoryMedalStore`] and a [`ManualClock`], so no
//! database is needed:
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # Unit and integration tests
//! ```

pub mod config;
pub mod constants;
pub mod database;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod state_machine;

pub use config::{ConfigManager, ConfigurationError, WorkflowConfig};
pub use database::{DatabaseConnection, InMemoryMedalStore, MedalStore, PgMedalStore};
pub use error::{WorkflowError, WorkflowResult};
pub use events::{EventPublisher, PublishedEvent, WorkflowEvent};
pub use models::{AggregateRecord, BranchId, Category};
pub use orchestration::{
    Clock, FixedSelection, FreshnessChecker, FreshnessPolicy, JoinCondition, ManualClock,
    RandomSelector, RunOutcome, RunReport, SelectionSource, SensorState, SystemClock,
    WorkflowDag, WorkflowRunner,
};
pub use state_machine::{StepEvent, StepState, StepStateMachine};
