//! Async adapter layer for relational stores.
//!
//! One [`Adapter`] API covers pooled autocommit execution, transactions,
//! and nested savepoints. Statements are described abstractly (queries,
//! changesets, filters), rendered per dialect by a [`builder::StatementBuilder`],
//! and routed through whatever execution context the adapter carries:
//! the pool when idle, a pinned connection inside a transaction.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use sql_adapter::prelude::*;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let driver = SqliteDriver::open(SqliteOptions::new("app.db".to_owned())).await?;
//! let adapter = Adapter::new(AdapterConfig::sqlite(), Arc::new(driver));
//!
//! let tx = adapter.begin().await?;
//! let id = tx.insert("users", &Changes::new().set("name", "alice")).await?;
//! tx.commit().await?;
//!
//! let mut rows = adapter
//!     .query(&Query::new("users").filter(Filter::eq("id", id)))
//!     .await?;
//! while let Some(row) = rows.next().await? {
//!     println!("{:?}", row.get("name"));
//! }
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod builder;
pub mod config;
pub mod context;
pub mod cursor;
pub mod driver;
pub mod error;
pub mod log;
pub mod prelude;
pub mod query;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod types;

pub use adapter::Adapter;
pub use config::AdapterConfig;
pub use cursor::{Cursor, Row};
pub use error::{DriverError, Error};
pub use types::Value;
