//! # Database Operations
//!
//! Persistence seam of the workflow: the [`MedalStore`] trait and its two
//! implementations.
//!
//! ## Key Components
//!
//! - [`connection`] - Pool construction from [`DatabaseConfig`](crate::config::DatabaseConfig)
//! - [`store`] - The `MedalStore` trait the workflow steps talk to
//! - [`postgres`] - SQLx-backed store (schema/table DDL, insert-with-count, latest timestamp)
//! - [`memory`] - In-process store for tests, with injectable failures
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use medal_workflow::config::WorkflowConfig;
//! use medal_workflow::database::{DatabaseConnection, PgMedalStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = WorkflowConfig::default();
//! let db = DatabaseConnection::connect(&config.database).await?;
//! let store = PgMedalStore::new(db.pool().clone(), &config.output, &config.source);
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod memory;
pub mod postgres;
pub mod store;

pub use connection::DatabaseConnection;
pub use memory::InMemoryMedalStore;
pub use postgres::PgMedalStore;
pub use store::MedalStore;
