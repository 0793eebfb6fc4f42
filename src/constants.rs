//! # Workflow Constants
//!
//! Step identifiers, lifecycle event names and default timings that define the
//! shape of the medal workflow.

use std::time::Duration;

/// Identifiers of the workflow's steps, one per DAG node
pub mod steps {
    pub const CREATE_SCHEMA: &str = "create_schema";
    pub const CREATE_TABLE: &str = "create_table";
    pub const PICK_MEDAL: &str = "pick_medal";
    pub const PICK_MEDAL_TASK: &str = "pick_medal_task";
    pub const CALC_BRONZE: &str = "calc_Bronze";
    pub const CALC_SILVER: &str = "calc_Silver";
    pub const CALC_GOLD: &str = "calc_Gold";
    pub const GENERATE_DELAY: &str = "generate_delay";
    pub const CHECK_CORRECTNESS: &str = "check_correctness";

    /// Prefix shared by the three aggregation branches
    pub const CALC_PREFIX: &str = "calc_";
}

/// Lifecycle events published while a run progresses
pub mod events {
    // Run lifecycle events
    pub const RUN_STARTED: &str = "run.started";
    pub const RUN_COMPLETED: &str = "run.completed";
    pub const RUN_FAILED: &str = "run.failed";

    // Step lifecycle events
    pub const STEP_STARTED: &str = "step.started";
    pub const STEP_SUCCEEDED: &str = "step.succeeded";
    pub const STEP_FAILED: &str = "step.failed";
    pub const STEP_SKIPPED: &str = "step.skipped";
    pub const STEP_UPSTREAM_FAILED: &str = "step.upstream_failed";

    // Branching and sensing
    pub const BRANCH_SELECTED: &str = "workflow.branch_selected";
    pub const NO_BRANCH_SELECTED: &str = "workflow.no_branch_selected";
    pub const FRESHNESS_POKED: &str = "freshness.poked";
}

/// Default workflow name
pub const DEFAULT_WORKFLOW_NAME: &str = "medal_count_workflow";

/// Default Joiner pause
pub const DEFAULT_JOIN_PAUSE: Duration = Duration::from_secs(15);

/// Default freshness window
pub const DEFAULT_FRESHNESS_WINDOW: Duration = Duration::from_secs(30);

/// Default interval between freshness pokes
pub const DEFAULT_POKE_INTERVAL: Duration = Duration::from_secs(10);

/// Default overall freshness timeout
pub const DEFAULT_FRESHNESS_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound for every configured pause, window, interval and timeout
pub const MAX_CONFIGURED_DURATION: Duration = Duration::from_secs(24 * 60 * 60);

/// Key under which a step's emitted value is stored in the hand-off map
pub const RETURN_VALUE_KEY: &str = "return_value";
