//! # Orchestration Engine
//!
//! The medal workflow's steps and the runner that executes them.
//!
//! ## Architecture
//!
//! The workflow is a static DAG ([`dag`]) evaluated in topological order by
//! the [`runner`]. Each step kind has its own component:
//!
//! - **Selector** ([`selector`]): emits one category per run
//! - **Router** ([`router`]): maps the emitted value to one aggregation branch, or none
//! - **Aggregator** ([`aggregator`]): counts one category and inserts an aggregate record
//! - **Joiner** ([`joiner`]): fan-in with an `any` join condition, then a fixed pause
//! - **Freshness Checker** ([`freshness`]): polls for a recent record until satisfied or timed out
//!
//! Supporting pieces: fan-in policies ([`join`]), the run-scoped value map
//! ([`handoff`]) and the injectable time source ([`clock`]).

pub mod aggregator;
pub mod clock;
pub mod dag;
pub mod freshness;
pub mod handoff;
pub mod join;
pub mod joiner;
pub mod router;
pub mod runner;
pub mod selector;

pub use aggregator::Aggregator;
pub use clock::{Clock, ManualClock, SystemClock};
pub use dag::{StepKind, StepNode, WorkflowDag};
pub use freshness::{is_fresh, FreshnessChecker, FreshnessPolicy, SensorState};
pub use handoff::HandOff;
pub use join::{JoinCondition, JoinDecision, UpstreamSummary};
pub use joiner::Joiner;
pub use router::{route, route_category, route_value};
pub use runner::{RunOutcome, RunReport, StepReport, WorkflowRunner};
pub use selector::{FixedSelection, RandomSelector, SelectionSource};
