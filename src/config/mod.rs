//! # Medal Workflow Configuration
//!
//! Typed configuration for the workflow, loaded from layered YAML files and
//! environment variables by [`ConfigManager`].
//!
//! ## Architecture
//!
//! - **Defaults everywhere**: every section deserializes with `serde(default)`,
//!   so an empty file yields the stock workflow (15s pause, 30s window, 10s
//!   poke interval, 30s timeout)
//! - **Environment Awareness**: `medal_workflow.<env>.yaml` overrides the base file
//! - **Explicit Validation**: identifiers and intervals are checked before use
//!
//! ## Usage
//!
//! ```rust,no_run
//! use medal_workflow::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let pause = manager.config().join.pause();
//! let window = manager.config().freshness.window();
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

use crate::constants;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure mirroring `config/medal_workflow.yaml`
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Workflow identity
    pub workflow: WorkflowSection,

    /// Database connection settings
    pub database: DatabaseConfig,

    /// Where aggregate records are written
    pub output: OutputTableConfig,

    /// The pre-existing dataset the aggregators count from
    pub source: SourceDatasetConfig,

    /// Joiner pause
    pub join: JoinConfig,

    /// Freshness checker timings
    pub freshness: FreshnessConfig,

    /// Lifecycle event channel
    pub events: EventsConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkflowSection {
    pub name: String,
    pub tags: Vec<String>,
}

impl Default for WorkflowSection {
    fn default() -> Self {
        Self {
            name: constants::DEFAULT_WORKFLOW_NAME.to_string(),
            tags: vec!["medals".to_string()],
        }
    }
}

/// Database connection and pooling configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
    pub max_connections: u32,
    pub acquire_timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "localhost".to_string(),
            port: 5432,
            username: "postgres".to_string(),
            password: "postgres".to_string(),
            database: "medal_workflow_development".to_string(),
            max_connections: 5,
            acquire_timeout_seconds: 10,
        }
    }
}

impl DatabaseConfig {
    /// Connection URL, preferring an explicit `url` (or `DATABASE_URL`) over the parts
    pub fn database_url(&self) -> String {
        if let Some(url) = &self.url {
            return url.clone();
        }
        if let Ok(url) = std::env::var("DATABASE_URL") {
            return url;
        }
        format!(
            "postgresql://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database
        )
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_seconds)
    }
}

/// Schema and table receiving aggregate records
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputTableConfig {
    pub schema: String,
    pub table: String,
}

impl Default for OutputTableConfig {
    fn default() -> Self {
        Self {
            schema: "medal_workflow".to_string(),
            table: "games".to_string(),
        }
    }
}

impl OutputTableConfig {
    /// Schema-qualified table name
    pub fn qualified_table(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }
}

/// External dataset providing per-category event rows
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SourceDatasetConfig {
    /// Table name, optionally schema-qualified (`schema.table`)
    pub table: String,
    /// Column holding the category's textual form
    pub category_column: String,
}

impl Default for SourceDatasetConfig {
    fn default() -> Self {
        Self {
            table: "olympic_dataset.athlete_event_results".to_string(),
            category_column: "medal".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct JoinConfig {
    pub pause_seconds: u64,
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            pause_seconds: constants::DEFAULT_JOIN_PAUSE.as_secs(),
        }
    }
}

impl JoinConfig {
    pub fn pause(&self) -> Duration {
        Duration::from_secs(self.pause_seconds)
    }
}

/// Freshness checker timings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FreshnessConfig {
    /// A record is fresh when it is younger than this
    pub window_seconds: u64,
    /// Delay between two pokes
    pub poke_interval_seconds: u64,
    /// Overall budget before the checker gives up
    pub timeout_seconds: u64,
}

impl Default for FreshnessConfig {
    fn default() -> Self {
        Self {
            window_seconds: constants::DEFAULT_FRESHNESS_WINDOW.as_secs(),
            poke_interval_seconds: constants::DEFAULT_POKE_INTERVAL.as_secs(),
            timeout_seconds: constants::DEFAULT_FRESHNESS_TIMEOUT.as_secs(),
        }
    }
}

impl FreshnessConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_seconds)
    }

    pub fn poke_interval(&self) -> Duration {
        Duration::from_secs(self.poke_interval_seconds)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EventsConfig {
    pub capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self { capacity: 1000 }
    }
}

impl WorkflowConfig {
    /// Validate the configuration, rejecting values the workflow cannot run with
    pub fn validate(&self) -> ConfigResult<()> {
        if self.workflow.name.trim().is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "workflow.name",
                "workflow section",
            ));
        }

        validate_identifier("output.schema", &self.output.schema)?;
        validate_identifier("output.table", &self.output.table)?;
        validate_qualified_identifier("source.table", &self.source.table)?;
        validate_identifier("source.category_column", &self.source.category_column)?;

        if self.database.max_connections == 0 {
            return Err(ConfigurationError::invalid_value(
                "database.max_connections",
                "0",
                "Pool needs at least one connection",
            ));
        }

        for (field, value) in [
            ("freshness.window_seconds", self.freshness.window_seconds),
            (
                "freshness.poke_interval_seconds",
                self.freshness.poke_interval_seconds,
            ),
            ("freshness.timeout_seconds", self.freshness.timeout_seconds),
        ] {
            if value == 0 {
                return Err(ConfigurationError::invalid_value(
                    field,
                    "0",
                    "Freshness timings must be greater than zero",
                ));
            }
            validate_duration_bound(field, value)?;
        }
        validate_duration_bound("join.pause_seconds", self.join.pause_seconds)?;

        if self.events.capacity == 0 {
            return Err(ConfigurationError::invalid_value(
                "events.capacity",
                "0",
                "Event channel capacity must be greater than zero",
            ));
        }

        if self.join.pause_seconds >= self.freshness.window_seconds {
            warn!(
                pause_seconds = self.join.pause_seconds,
                window_seconds = self.freshness.window_seconds,
                "Joiner pause is not shorter than the freshness window; the freshness check will time out"
            );
        }

        Ok(())
    }
}

fn validate_duration_bound(field: &str, seconds: u64) -> ConfigResult<()> {
    let max = constants::MAX_CONFIGURED_DURATION.as_secs();
    if seconds > max {
        return Err(ConfigurationError::invalid_value(
            field,
            seconds.to_string(),
            format!("Must be at most {max} seconds"),
        ));
    }
    Ok(())
}

/// Check that a SQL identifier is safe to interpolate (letters, digits, underscore)
pub(crate) fn is_valid_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    value.len() <= 63 && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn validate_identifier(field: &str, value: &str) -> ConfigResult<()> {
    if is_valid_identifier(value) {
        Ok(())
    } else {
        Err(ConfigurationError::invalid_value(
            field,
            value,
            "Must be a plain SQL identifier ([A-Za-z_][A-Za-z0-9_]*, at most 63 characters)",
        ))
    }
}

fn validate_qualified_identifier(field: &str, value: &str) -> ConfigResult<()> {
    let parts: Vec<&str> = value.split('.').collect();
    if parts.len() > 2 || !parts.iter().all(|part| is_valid_identifier(part)) {
        return Err(ConfigurationError::invalid_value(
            field,
            value,
            "Must be `table` or `schema.table` made of plain SQL identifiers",
        ));
    }
    Ok(())
}
