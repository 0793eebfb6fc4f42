//! # Aggregator
//!
//! One per category. Counts the category's source rows and inserts a single
//! aggregate record through the [`MedalStore`], stamped with the workflow
//! [`Clock`]. Failures propagate unchanged and are never retried.

use tracing::{debug, instrument};

use super::clock::Clock;
use crate::database::MedalStore;
use crate::error::{WorkflowError, WorkflowResult};
use crate::models::{AggregateRecord, BranchId, Category};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Aggregator {
    category: Category,
}

impl Aggregator {
    pub fn new(category: Category) -> Self {
        Self { category }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn step_id(&self) -> BranchId {
        self.category.branch_id()
    }

    #[instrument(skip(self, store, clock), fields(category = %self.category))]
    pub async fn execute(
        &self,
        store: &dyn MedalStore,
        clock: &dyn Clock,
    ) -> WorkflowResult<AggregateRecord> {
        let record = store.insert_aggregate(self.category, clock.now()).await?;

        if record.category != self.category {
            return Err(WorkflowError::Internal(format!(
                "{} inserted a {} record",
                self.step_id(),
                record.category
            )));
        }
        if record.count < 0 {
            return Err(WorkflowError::ValidationError(format!(
                "Negative count {} for {}",
                record.count, self.category
            )));
        }

        debug!(
            record_id = record.id,
            count = record.count,
            created_at = %record.created_at,
            "Aggregate record inserted"
        );
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::InMemoryMedalStore;
    use crate::orchestration::clock::ManualClock;
    use chrono::Utc;

    async fn provisioned_store() -> InMemoryMedalStore {
        let store = InMemoryMedalStore::new()
            .with_source_counts([(Category::Bronze, 5), (Category::Gold, 11)]);
        store.create_schema().await.unwrap();
        store.create_table().await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_execute_inserts_one_record_for_its_category() {
        let clock = ManualClock::new(Utc::now());
        let store = provisioned_store().await;

        let record = Aggregator::new(Category::Gold)
            .execute(&store, &clock)
            .await
            .unwrap();

        assert_eq!(record.category, Category::Gold);
        assert_eq!(record.count, 11);
        assert_eq!(record.created_at, clock.now());
        assert_eq!(store.records(), vec![record]);
    }

    #[tokio::test]
    async fn test_category_without_source_rows_counts_zero() {
        let clock = ManualClock::new(Utc::now());
        let store = provisioned_store().await;

        let record = Aggregator::new(Category::Silver)
            .execute(&store, &clock)
            .await
            .unwrap();
        assert_eq!(record.count, 0);
    }

    #[tokio::test]
    async fn test_insert_failure_propagates() {
        let clock = ManualClock::new(Utc::now());
        let store = InMemoryMedalStore::new().failing_inserts("dataset unreachable");

        let err = Aggregator::new(Category::Bronze)
            .execute(&store, &clock)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            WorkflowError::DatabaseError("dataset unreachable".to_string())
        );
        assert!(store.records().is_empty());
    }

    #[test]
    fn test_step_id() {
        assert_eq!(Aggregator::new(Category::Silver).step_id().as_str(), "calc_Silver");
    }
}
