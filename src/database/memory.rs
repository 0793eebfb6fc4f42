//! # In-Memory Store
//!
//! [`MedalStore`] kept in process memory. Records carry the timestamp the
//! caller passes in, so a run driven by a
//! [`ManualClock`](crate::orchestration::clock::ManualClock) is reproducible.
//! Failures can be injected to exercise the workflow's error paths.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;

use super::store::MedalStore;
use crate::error::{WorkflowError, WorkflowResult};
use crate::models::{AggregateRecord, Category};

#[derive(Debug)]
pub struct InMemoryMedalStore {
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    schema_created: bool,
    table_created: bool,
    records: Vec<AggregateRecord>,
    next_id: i64,
    source_counts: HashMap<Category, i64>,
    insert_failure: Option<String>,
    ddl_failure: Option<String>,
}

impl InMemoryMedalStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState {
                next_id: 1,
                ..MemoryState::default()
            }),
        }
    }

    /// Number of source rows per category the aggregators will count
    pub fn with_source_counts(self, counts: impl IntoIterator<Item = (Category, i64)>) -> Self {
        self.state.lock().source_counts.extend(counts);
        self
    }

    /// Make every insert fail with `message`, as an unreachable dataset would
    pub fn failing_inserts(self, message: impl Into<String>) -> Self {
        self.state.lock().insert_failure = Some(message.into());
        self
    }

    /// Make schema and table creation fail with `message`
    pub fn failing_ddl(self, message: impl Into<String>) -> Self {
        self.state.lock().ddl_failure = Some(message.into());
        self
    }

    /// Add a record left over from an earlier run; creates the table if needed
    pub fn seed_record(&self, category: Category, count: i64, created_at: DateTime<Utc>) {
        let mut state = self.state.lock();
        state.schema_created = true;
        state.table_created = true;
        let id = state.next_id;
        state.next_id += 1;
        state.records.push(AggregateRecord {
            id,
            category,
            count,
            created_at,
        });
    }

    /// Snapshot of every stored record, oldest first
    pub fn records(&self) -> Vec<AggregateRecord> {
        self.state.lock().records.clone()
    }
}

impl Default for InMemoryMedalStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MedalStore for InMemoryMedalStore {
    async fn create_schema(&self) -> WorkflowResult<()> {
        let mut state = self.state.lock();
        if let Some(message) = &state.ddl_failure {
            return Err(WorkflowError::DatabaseError(message.clone()));
        }
        state.schema_created = true;
        Ok(())
    }

    async fn create_table(&self) -> WorkflowResult<()> {
        let mut state = self.state.lock();
        if let Some(message) = &state.ddl_failure {
            return Err(WorkflowError::DatabaseError(message.clone()));
        }
        if !state.schema_created {
            return Err(WorkflowError::DatabaseError(
                "schema does not exist".to_string(),
            ));
        }
        state.table_created = true;
        Ok(())
    }

    async fn insert_aggregate(
        &self,
        category: Category,
        created_at: DateTime<Utc>,
    ) -> WorkflowResult<AggregateRecord> {
        let mut state = self.state.lock();
        if let Some(message) = &state.insert_failure {
            return Err(WorkflowError::DatabaseError(message.clone()));
        }
        if !state.table_created {
            return Err(WorkflowError::DatabaseError(
                "output table does not exist".to_string(),
            ));
        }

        let record = AggregateRecord {
            id: state.next_id,
            category,
            count: state.source_counts.get(&category).copied().unwrap_or(0),
            created_at,
        };
        state.next_id += 1;
        state.records.push(record.clone());
        Ok(record)
    }

    async fn latest_created_at(&self) -> WorkflowResult<Option<DateTime<Utc>>> {
        let state = self.state.lock();
        if !state.table_created {
            return Err(WorkflowError::DatabaseError(
                "output table does not exist".to_string(),
            ));
        }
        Ok(state.records.iter().map(|record| record.created_at).max())
    }
}
