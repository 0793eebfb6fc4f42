//! Error types for the medal workflow.
//!

use crate::config::ConfigurationError;
use crate::state_machine::StateMachineError;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WorkflowError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("State transition error: {0}")]
    StateTransitionError(String),
    /// A step of the workflow failed; downstream steps were not executed
    #[error("Step {step} failed: {reason}")]
    StepFailed { step: String, reason: String },
    /// The freshness check never observed a recent aggregate record
    #[error(
        "Freshness check timed out after {attempts} pokes ({waited:?}): no record newer than {window:?}"
    )]
    FreshnessTimeout {
        attempts: u32,
        waited: Duration,
        window: Duration,
    },
    #[error("Internal error: {0}")]
    Internal(String),
}

impl WorkflowError {
    /// Build a step failure from any displayable cause
    pub fn step_failed(step: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::StepFailed {
            step: step.into(),
            reason: reason.to_string(),
        }
    }

    /// True when the failure came from the freshness sensor rather than a SQL step
    pub fn is_freshness_timeout(&self) -> bool {
        matches!(self, Self::FreshnessTimeout { .. })
    }
}

impl From<sqlx::Error> for WorkflowError {
    fn from(err: sqlx::Error) -> Self {
        WorkflowError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for WorkflowError {
    fn from(error: serde_json::Error) -> Self {
        WorkflowError::ValidationError(format!("JSON serialization error: {error}"))
    }
}

impl From<ConfigurationError> for WorkflowError {
    fn from(error: ConfigurationError) -> Self {
        WorkflowError::ConfigurationError(error.to_string())
    }
}

impl From<StateMachineError> for WorkflowError {
    fn from(error: StateMachineError) -> Self {
        WorkflowError::StateTransitionError(error.to_string())
    }
}

pub type WorkflowResult<T> = anyhow::Result<T, WorkflowError>;
