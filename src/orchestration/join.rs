//! # Join Conditions
//!
//! Fan-in policy of a step: given the states of its predecessors, decide
//! whether the step runs, is skipped, inherits a failure, or must wait.
//!
//! | condition | runs when                                   | upstream_failed when        | otherwise |
//! |-----------|---------------------------------------------|-----------------------------|-----------|
//! | `All`     | every predecessor succeeded                 | any predecessor failed      | skipped   |
//! | `Any`     | one succeeded, or every predecessor skipped | none succeeded, one failed  | -         |
//! | `One`     | exactly one succeeded                       | any predecessor failed      | skipped   |
//!
//! `Any` running after an all-skipped fan-in is deliberate: it is how the
//! Joiner still executes when the Router selected no branch.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::state_machine::StepState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinCondition {
    #[default]
    All,
    Any,
    One,
}

/// Outcome of evaluating a join condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinDecision {
    Run,
    Skip,
    UpstreamFailed,
    /// At least one predecessor has not reached a terminal state
    Wait,
}

/// Tally of predecessor states
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpstreamSummary {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub unfinished: usize,
}

impl UpstreamSummary {
    pub fn from_states<'a>(states: impl IntoIterator<Item = &'a StepState>) -> Self {
        states
            .into_iter()
            .fold(Self::default(), |mut summary, state| {
                match state {
                    StepState::Success => summary.succeeded += 1,
                    StepState::Skipped => summary.skipped += 1,
                    StepState::Failed | StepState::UpstreamFailed => summary.failed += 1,
                    StepState::Pending | StepState::Running => summary.unfinished += 1,
                }
                summary
            })
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.skipped + self.failed + self.unfinished
    }
}

impl JoinCondition {
    /// Decide what a step does given its predecessors' states.
    /// A step without predecessors always runs.
    pub fn evaluate(&self, upstream: &[StepState]) -> JoinDecision {
        let summary = UpstreamSummary::from_states(upstream);
        if summary.total() == 0 {
            return JoinDecision::Run;
        }

        match self {
            Self::All => {
                if summary.unfinished > 0 {
                    JoinDecision::Wait
                } else if summary.failed > 0 {
                    JoinDecision::UpstreamFailed
                } else if summary.skipped > 0 {
                    JoinDecision::Skip
                } else {
                    JoinDecision::Run
                }
            }
            Self::Any => {
                if summary.succeeded > 0 {
                    JoinDecision::Run
                } else if summary.unfinished > 0 {
                    JoinDecision::Wait
                } else if summary.failed > 0 {
                    JoinDecision::UpstreamFailed
                } else {
                    JoinDecision::Run
                }
            }
            Self::One => {
                if summary.unfinished > 0 {
                    JoinDecision::Wait
                } else if summary.failed > 0 {
                    JoinDecision::UpstreamFailed
                } else if summary.succeeded == 1 {
                    JoinDecision::Run
                } else {
                    JoinDecision::Skip
                }
            }
        }
    }
}

impl fmt::Display for JoinCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Any => write!(f, "any"),
            Self::One => write!(f, "one"),
        }
    }
}
