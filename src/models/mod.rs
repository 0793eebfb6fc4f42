pub mod aggregate_record;
pub mod category;

// Re-export core models for easy access
pub use aggregate_record::AggregateRecord;
pub use category::{BranchId, Category};
