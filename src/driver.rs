use std::sync::Arc;

use async_trait::async_trait;

use crate::error::DriverError;
use crate::types::Value;

/// Outcome of a statement that does not return rows.
///
/// Backends that cannot report one of the fields leave it at zero rather
/// than fail the call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub last_insert_id: i64,
    pub rows_affected: u64,
}

/// A live connection source for one database.
///
/// Implementations are shared behind an `Arc` and must tolerate concurrent
/// calls; each call may be served by any pooled connection.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Opens a transaction on a dedicated connection.
    ///
    /// # Errors
    /// Returns an error when no connection can be acquired or the begin
    /// statement fails.
    async fn begin(&self) -> Result<Box<dyn TransactionHandle>, DriverError>;

    /// Runs a row-returning statement on a pooled connection.
    ///
    /// # Errors
    /// Returns an error when the statement cannot be prepared or executed.
    async fn query(&self, statement: &str, args: &[Value]) -> Result<Box<dyn RowSet>, DriverError>;

    /// Runs a non-row statement on a pooled connection.
    ///
    /// # Errors
    /// Returns an error when the statement cannot be prepared or executed.
    async fn exec(&self, statement: &str, args: &[Value]) -> Result<ExecResult, DriverError>;

    /// Releases pooled connections. Further calls fail.
    ///
    /// # Errors
    /// Returns an error when the underlying pool refuses to shut down.
    async fn close(&self) -> Result<(), DriverError>;
}

/// One open transaction, pinned to a single connection.
///
/// The handle is shared by every adapter in a savepoint chain, so methods
/// take `&self`; exclusivity is the caller's contract, not the type's.
#[async_trait]
pub trait TransactionHandle: Send + Sync {
    /// # Errors
    /// Returns an error when the statement cannot be prepared or executed.
    async fn query(&self, statement: &str, args: &[Value]) -> Result<Box<dyn RowSet>, DriverError>;

    /// # Errors
    /// Returns an error when the statement cannot be prepared or executed.
    async fn exec(&self, statement: &str, args: &[Value]) -> Result<ExecResult, DriverError>;

    /// # Errors
    /// Returns an error when the database rejects the commit.
    async fn commit(&self) -> Result<(), DriverError>;

    /// # Errors
    /// Returns an error when the database rejects the rollback.
    async fn rollback(&self) -> Result<(), DriverError>;
}

/// Forward-only stream of rows from one executed statement.
#[async_trait]
pub trait RowSet: Send {
    /// Column names, in result order.
    fn columns(&self) -> Arc<Vec<String>>;

    /// Fetches the next row, or `None` once the set is exhausted.
    ///
    /// # Errors
    /// Returns an error when decoding the row fails mid-stream.
    async fn next_row(&mut self) -> Result<Option<Vec<Value>>, DriverError>;

    /// Releases the statement. Implementations tolerate repeated calls.
    ///
    /// # Errors
    /// Returns an error when releasing server-side state fails.
    async fn close(&mut self) -> Result<(), DriverError>;
}
