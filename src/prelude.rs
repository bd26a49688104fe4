//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::adapter::Adapter;
pub use crate::builder::{SqlBuilder, StatementBuilder};
pub use crate::config::AdapterConfig;
pub use crate::context::ExecutionContext;
pub use crate::cursor::{Cursor, Row};
pub use crate::driver::{Driver, ExecResult, RowSet, TransactionHandle};
pub use crate::error::{DriverError, Error};
pub use crate::log::{LogEvent, LogSink, TracingLogSink};
pub use crate::query::{AggregateMode, Changes, Filter, Query, Sort, Statement};
pub use crate::types::Value;

#[cfg(feature = "sqlite")]
pub use crate::sqlite::{
    SqliteDriver, SqliteOptions, SqliteOptionsBuilder, classify_sqlite_error,
};
