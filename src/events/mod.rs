pub mod publisher;
pub mod workflow_event;

// Re-export key types for convenience
pub use publisher::{EventPublisher, PublishError, PublishedEvent};
pub use workflow_event::WorkflowEvent;
