//! # Workflow Events
//!
//! Every lifecycle event a run can publish. The variant fixes the event name
//! (see [`crate::constants::events`]); its fields become the event context.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::constants::events;
use crate::models::BranchId;
use crate::orchestration::RunOutcome;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WorkflowEvent {
    RunStarted {
        run_id: Uuid,
        workflow: String,
        tags: Vec<String>,
    },
    RunCompleted {
        run_id: Uuid,
        outcome: RunOutcome,
    },
    RunFailed {
        run_id: Uuid,
        outcome: RunOutcome,
    },
    StepStarted {
        run_id: Uuid,
        step: String,
    },
    StepSucceeded {
        run_id: Uuid,
        step: String,
        output: Option<Value>,
    },
    StepFailed {
        run_id: Uuid,
        step: String,
        error: String,
    },
    StepSkipped {
        run_id: Uuid,
        step: String,
    },
    StepUpstreamFailed {
        run_id: Uuid,
        step: String,
    },
    BranchSelected {
        run_id: Uuid,
        branch: BranchId,
    },
    NoBranchSelected {
        run_id: Uuid,
        selection: Value,
    },
    FreshnessPoked {
        attempt: u32,
        state: String,
        latest_created_at: Option<DateTime<Utc>>,
    },
}

impl WorkflowEvent {
    /// Published name of the event
    pub fn name(&self) -> &'static str {
        match self {
            Self::RunStarted { .. } => events::RUN_STARTED,
            Self::RunCompleted { .. } => events::RUN_COMPLETED,
            Self::RunFailed { .. } => events::RUN_FAILED,
            Self::StepStarted { .. } => events::STEP_STARTED,
            Self::StepSucceeded { .. } => events::STEP_SUCCEEDED,
            Self::StepFailed { .. } => events::STEP_FAILED,
            Self::StepSkipped { .. } => events::STEP_SKIPPED,
            Self::StepUpstreamFailed { .. } => events::STEP_UPSTREAM_FAILED,
            Self::BranchSelected { .. } => events::BRANCH_SELECTED,
            Self::NoBranchSelected { .. } => events::NO_BRANCH_SELECTED,
            Self::FreshnessPoked { .. } => events::FRESHNESS_POKED,
        }
    }

    /// Run the event belongs to; sensor pokes carry none
    pub fn run_id(&self) -> Option<Uuid> {
        match self {
            Self::RunStarted { run_id, .. }
            | Self::RunCompleted { run_id, .. }
            | Self::RunFailed { run_id, .. }
            | Self::StepStarted { run_id, .. }
            | Self::StepSucceeded { run_id, .. }
            | Self::StepFailed { run_id, .. }
            | Self::StepSkipped { run_id, .. }
            | Self::StepUpstreamFailed { run_id, .. }
            | Self::BranchSelected { run_id, .. }
            | Self::NoBranchSelected { run_id, .. } => Some(*run_id),
            Self::FreshnessPoked { .. } => None,
        }
    }

    /// Step the event is about, for step lifecycle events
    pub fn step(&self) -> Option<&str> {
        match self {
            Self::StepStarted { step, .. }
            | Self::StepSucceeded { step, .. }
            | Self::StepFailed { step, .. }
            | Self::StepSkipped { step, .. }
            | Self::StepUpstreamFailed { step, .. } => Some(step),
            _ => None,
        }
    }
}
