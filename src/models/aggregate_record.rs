//! # Aggregate Record
//!
//! The row an aggregation branch writes: how many source records carry its
//! category, stamped with the insertion time. Created once per run, never
//! updated or deleted by the workflow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};

use super::category::Category;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateRecord {
    pub id: i64,
    pub category: Category,
    pub count: i64,
    pub created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for AggregateRecord {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let medal_type: String = row.try_get("medal_type")?;
        let category = medal_type
            .parse::<Category>()
            .map_err(|e| sqlx::Error::ColumnDecode {
                index: "medal_type".to_string(),
                source: e.into(),
            })?;

        Ok(Self {
            id: row.try_get("id")?,
            category,
            count: row.try_get("count")?,
            created_at: row.try_get("created_at")?,
        })
    }
}
