use async_trait::async_trait;

use crate::driver::{ExecResult, RowSet, TransactionHandle};
use crate::error::DriverError;
use crate::types::Value;

use super::pool::PooledWorker;
use super::rows::SqliteRowSet;
use super::worker::SqliteWorker;

/// One open transaction, keeping its pooled worker leased for the
/// duration.
///
/// The worker returns to the pool when the handle drops; the recycle hook
/// rolls back anything still open, so an abandoned handle cannot leak its
/// transaction into the next lease.
pub(super) struct SqliteTransaction {
    worker: SqliteWorker,
    _lease: PooledWorker,
}

impl SqliteTransaction {
    pub(super) async fn begin(lease: PooledWorker) -> Result<Self, DriverError> {
        let worker = SqliteWorker::clone(&lease);
        // IMMEDIATE takes the write lock up front instead of on first
        // write, converting mid-transaction busy errors into begin errors.
        worker.exec("BEGIN IMMEDIATE".to_owned(), Vec::new()).await?;
        Ok(Self {
            worker,
            _lease: lease,
        })
    }
}

#[async_trait]
impl TransactionHandle for SqliteTransaction {
    async fn query(&self, statement: &str, args: &[Value]) -> Result<Box<dyn RowSet>, DriverError> {
        let columns = self
            .worker
            .open_cursor(statement.to_owned(), args.to_vec())
            .await?;
        Ok(Box::new(SqliteRowSet::new(
            self.worker.clone(),
            columns,
            None,
        )))
    }

    async fn exec(&self, statement: &str, args: &[Value]) -> Result<ExecResult, DriverError> {
        self.worker.exec(statement.to_owned(), args.to_vec()).await
    }

    async fn commit(&self) -> Result<(), DriverError> {
        self.worker
            .exec("COMMIT".to_owned(), Vec::new())
            .await
            .map(|_| ())
    }

    async fn rollback(&self) -> Result<(), DriverError> {
        self.worker
            .exec("ROLLBACK".to_owned(), Vec::new())
            .await
            .map(|_| ())
    }
}
