use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::WorkflowResult;
use crate::models::{AggregateRecord, Category};

/// Storage operations the workflow's SQL steps need
///
/// Implementations own the output table and read the external dataset.
/// Every method is a single statement; none of them retries.
#[async_trait]
pub trait MedalStore: Send + Sync {
    /// Create the output schema if it does not exist
    async fn create_schema(&self) -> WorkflowResult<()>;

    /// Create the output table if it does not exist
    async fn create_table(&self) -> WorkflowResult<()>;

    /// Count source rows for `category` and insert one aggregate record
    /// stamped with `created_at`
    ///
    /// The timestamp comes from the caller's clock, the same one the
    /// freshness check compares against, never from the database server.
    async fn insert_aggregate(
        &self,
        category: Category,
        created_at: DateTime<Utc>,
    ) -> WorkflowResult<AggregateRecord>;

    /// Timestamp of the most recent aggregate record, `None` when the table is empty
    async fn latest_created_at(&self) -> WorkflowResult<Option<DateTime<Utc>>>;
}
