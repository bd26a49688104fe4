use deadpool::managed::{self, Metrics, Pool, RecycleError, RecycleResult};

use crate::error::DriverError;

use super::dispatcher::OpenSpec;
use super::worker::SqliteWorker;

/// Deadpool manager that spawns one connection worker per pool slot.
pub(super) struct WorkerManager {
    spec: OpenSpec,
}

impl managed::Manager for WorkerManager {
    type Type = SqliteWorker;
    type Error = DriverError;

    async fn create(&self) -> Result<SqliteWorker, DriverError> {
        SqliteWorker::connect(self.spec.clone()).await
    }

    async fn recycle(
        &self,
        worker: &mut SqliteWorker,
        _: &Metrics,
    ) -> RecycleResult<DriverError> {
        // A caller dropped mid-stream or mid-transaction leaves the
        // connection holding its cursor or transaction; the next lease
        // must start clean.
        worker.close_cursor().await.map_err(RecycleError::Backend)?;
        let in_transaction = worker.ping().await.map_err(RecycleError::Backend)?;
        if in_transaction {
            tracing::warn!("connection returned with an open transaction, rolling back");
            worker
                .exec("ROLLBACK".to_owned(), Vec::new())
                .await
                .map_err(RecycleError::Backend)?;
        }
        Ok(())
    }
}

pub(super) type WorkerPool = Pool<WorkerManager>;
pub(super) type PooledWorker = managed::Object<WorkerManager>;

pub(super) fn build(spec: OpenSpec, max_size: usize) -> Result<WorkerPool, DriverError> {
    Pool::builder(WorkerManager { spec })
        .max_size(max_size)
        .build()
        .map_err(|err| DriverError::Pool(err.to_string()))
}
