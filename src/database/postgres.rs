//! # PostgreSQL Store
//!
//! [`MedalStore`] over a SQLx pool. Identifiers come from validated
//! configuration and are double-quoted; values are always bound.
//!
//! The count and the insert happen in one statement. `created_at` is bound
//! from the workflow clock rather than the server's `NOW()`, so the freshness
//! check compares timestamps from a single time source:
//!
//! ```sql
//! INSERT INTO "medal_workflow"."games" (medal_type, count, created_at)
//! VALUES ($1, (SELECT COUNT(*) FROM "olympic_dataset"."athlete_event_results" WHERE "medal" = $1), $2)
//! RETURNING id, medal_type, count, created_at
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, instrument};

use super::store::MedalStore;
use crate::config::{OutputTableConfig, SourceDatasetConfig};
use crate::error::WorkflowResult;
use crate::models::{AggregateRecord, Category};

#[derive(Debug, Clone)]
pub struct PgMedalStore {
    pool: PgPool,
    create_schema_sql: String,
    create_table_sql: String,
    insert_sql: String,
    latest_sql: String,
}

impl PgMedalStore {
    pub fn new(pool: PgPool, output: &OutputTableConfig, source: &SourceDatasetConfig) -> Self {
        let statements = Statements::build(output, source);
        Self {
            pool,
            create_schema_sql: statements.create_schema,
            create_table_sql: statements.create_table,
            insert_sql: statements.insert,
            latest_sql: statements.latest,
        }
    }
}

#[async_trait]
impl MedalStore for PgMedalStore {
    #[instrument(skip(self))]
    async fn create_schema(&self) -> WorkflowResult<()> {
        sqlx::query(&self.create_schema_sql)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn create_table(&self) -> WorkflowResult<()> {
        sqlx::query(&self.create_table_sql)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[instrument(skip(self), fields(category = %category, created_at = %created_at))]
    async fn insert_aggregate(
        &self,
        category: Category,
        created_at: DateTime<Utc>,
    ) -> WorkflowResult<AggregateRecord> {
        let record = sqlx::query_as::<_, AggregateRecord>(&self.insert_sql)
            .bind(category.as_str())
            .bind(created_at)
            .fetch_one(&self.pool)
            .await?;

        debug!(
            record_id = record.id,
            count = record.count,
            "Inserted aggregate record"
        );
        Ok(record)
    }

    #[instrument(skip(self))]
    async fn latest_created_at(&self) -> WorkflowResult<Option<DateTime<Utc>>> {
        let latest = sqlx::query_scalar::<_, Option<DateTime<Utc>>>(&self.latest_sql)
            .fetch_one(&self.pool)
            .await?;
        Ok(latest)
    }
}

/// SQL text for every statement the store issues
struct Statements {
    create_schema: String,
    create_table: String,
    insert: String,
    latest: String,
}

impl Statements {
    fn build(output: &OutputTableConfig, source: &SourceDatasetConfig) -> Self {
        let schema = quote_ident(&output.schema);
        let table = format!("{schema}.{}", quote_ident(&output.table));
        let source_table = quote_qualified(&source.table);
        let category_column = quote_ident(&source.category_column);

        Self {
            create_schema: format!("CREATE SCHEMA IF NOT EXISTS {schema}"),
            create_table: format!(
                "CREATE TABLE IF NOT EXISTS {table} (\
                 id BIGSERIAL PRIMARY KEY, \
                 medal_type TEXT NOT NULL, \
                 count BIGINT NOT NULL DEFAULT 0 CHECK (count >= 0), \
                 created_at TIMESTAMPTZ NOT NULL DEFAULT NOW())"
            ),
            insert: format!(
                "INSERT INTO {table} (medal_type, count, created_at) \
                 VALUES ($1, (SELECT COUNT(*) FROM {source_table} WHERE {category_column} = $1), $2) \
                 RETURNING id, medal_type, count, created_at"
            ),
            latest: format!("SELECT MAX(created_at) FROM {table}"),
        }
    }
}

fn quote_ident(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

fn quote_qualified(name: &str) -> String {
    name.split('.').map(quote_ident).collect::<Vec<_>>().join(".")
}
