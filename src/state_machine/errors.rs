use thiserror::Error;

/// Errors raised while driving a step state machine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StateMachineError {
    #[error("Invalid state transition for {step} from {from} on {event}")]
    InvalidTransition {
        step: String,
        from: String,
        event: String,
    },

    #[error("Step {step} is already in terminal state {state}")]
    AlreadyTerminal { step: String, state: String },
}

/// Result type alias for state machine operations
pub type StateMachineResult<T> = Result<T, StateMachineError>;
