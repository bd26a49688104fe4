use std::sync::Arc;

use async_trait::async_trait;

use crate::driver::RowSet;
use crate::error::DriverError;
use crate::types::Value;

use super::pool::PooledWorker;
use super::worker::SqliteWorker;

/// Streams rows from a cursor held open on a worker thread.
///
/// Pool-routed reads keep their lease until the cursor closes, so the
/// worker cannot be handed to another caller mid-stream; reads inside a
/// transaction share the transaction's worker and carry no lease.
pub(super) struct SqliteRowSet {
    worker: SqliteWorker,
    columns: Arc<Vec<String>>,
    lease: Option<PooledWorker>,
    open: bool,
}

impl SqliteRowSet {
    pub(super) fn new(
        worker: SqliteWorker,
        columns: Arc<Vec<String>>,
        lease: Option<PooledWorker>,
    ) -> Self {
        Self {
            worker,
            columns,
            lease,
            open: true,
        }
    }
}

#[async_trait]
impl RowSet for SqliteRowSet {
    fn columns(&self) -> Arc<Vec<String>> {
        Arc::clone(&self.columns)
    }

    async fn next_row(&mut self) -> Result<Option<Vec<Value>>, DriverError> {
        if !self.open {
            return Ok(None);
        }
        self.worker.fetch_row().await
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        let closed = self.worker.close_cursor().await;
        drop(self.lease.take());
        closed
    }
}

impl Drop for SqliteRowSet {
    fn drop(&mut self) {
        if self.open {
            // Queued ahead of the lease's return, so the recycle probe
            // runs after the cursor is gone.
            self.worker.close_cursor_nowait();
        }
    }
}
