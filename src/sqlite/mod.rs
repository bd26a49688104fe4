//! `SQLite` backend.
//!
//! Each pooled connection is owned by a dedicated worker thread and driven
//! over a channel; transactions lease one worker for their whole lifetime,
//! so savepoints and cursor reads stay on the connection that began them.

mod dispatcher;
mod pool;
mod rows;
mod tx;
mod worker;

pub mod errors;
pub mod params;

pub use errors::classify_sqlite_error;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use crate::driver::{Driver, ExecResult, RowSet, TransactionHandle};
use crate::error::DriverError;
use crate::types::Value;

use dispatcher::OpenSpec;
use pool::WorkerPool;
use rows::SqliteRowSet;
use tx::SqliteTransaction;

/// Options for configuring a `SQLite` driver.
#[derive(Debug, Clone)]
pub struct SqliteOptions {
    pub db_path: String,
    pub pool_size: usize,
    pub busy_timeout: Duration,
    pub wal: bool,
    pub foreign_keys: bool,
}

impl SqliteOptions {
    #[must_use]
    pub fn new(db_path: String) -> Self {
        Self {
            db_path,
            pool_size: 4,
            busy_timeout: Duration::from_secs(5),
            wal: true,
            foreign_keys: true,
        }
    }

    /// Options for a named shared in-memory database.
    ///
    /// Every worker in the pool opens the same URI, so they all see one
    /// database for as long as the driver holds a connection.
    #[must_use]
    pub fn memory(name: &str) -> Self {
        let mut opts = Self::new(format!("file:{name}?mode=memory&cache=shared"));
        opts.wal = false;
        opts
    }
}

/// Fluent builder for `SQLite` options.
#[derive(Debug, Clone)]
pub struct SqliteOptionsBuilder {
    opts: SqliteOptions,
}

impl SqliteOptionsBuilder {
    #[must_use]
    pub fn new(db_path: String) -> Self {
        Self {
            opts: SqliteOptions::new(db_path),
        }
    }

    #[must_use]
    pub fn pool_size(mut self, pool_size: usize) -> Self {
        self.opts.pool_size = pool_size;
        self
    }

    #[must_use]
    pub fn busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.opts.busy_timeout = busy_timeout;
        self
    }

    #[must_use]
    pub fn wal(mut self, wal: bool) -> Self {
        self.opts.wal = wal;
        self
    }

    #[must_use]
    pub fn foreign_keys(mut self, foreign_keys: bool) -> Self {
        self.opts.foreign_keys = foreign_keys;
        self
    }

    #[must_use]
    pub fn finish(self) -> SqliteOptions {
        self.opts
    }

    /// Build the driver.
    ///
    /// # Errors
    /// Returns `DriverError` if pool creation or the initial smoke test
    /// fails.
    pub async fn build(self) -> Result<SqliteDriver, DriverError> {
        SqliteDriver::open(self.finish()).await
    }
}

/// Driver over a pool of worker-owned `SQLite` connections.
pub struct SqliteDriver {
    pool: WorkerPool,
}

impl SqliteDriver {
    #[must_use]
    pub fn builder(db_path: String) -> SqliteOptionsBuilder {
        SqliteOptionsBuilder::new(db_path)
    }

    /// Opens the pool and smoke-tests one connection.
    ///
    /// # Errors
    /// Returns `DriverError::Connection` when the database cannot be
    /// opened, or `DriverError::Pool` when the pool rejects its
    /// configuration.
    pub async fn open(opts: SqliteOptions) -> Result<Self, DriverError> {
        let spec = OpenSpec {
            path: opts.db_path,
            busy_timeout: opts.busy_timeout,
            wal: opts.wal,
            foreign_keys: opts.foreign_keys,
        };
        let pool = pool::build(spec, opts.pool_size)?;
        // Fail now, not on first use, when the path is unusable.
        let _probe = pool.get().await?;
        Ok(Self { pool })
    }

    /// Runs a batch of semicolon-separated statements on one connection.
    ///
    /// # Errors
    /// Returns the first error the batch hits.
    pub async fn execute_batch(&self, statements: &str) -> Result<(), DriverError> {
        let lease = self.pool.get().await?;
        lease.execute_batch(statements.to_owned()).await
    }
}

#[async_trait]
impl Driver for SqliteDriver {
    async fn begin(&self) -> Result<Box<dyn TransactionHandle>, DriverError> {
        let lease = self.pool.get().await?;
        let tx = SqliteTransaction::begin(lease).await?;
        Ok(Box::new(tx))
    }

    async fn query(&self, statement: &str, args: &[Value]) -> Result<Box<dyn RowSet>, DriverError> {
        let lease = self.pool.get().await?;
        let columns = lease.open_cursor(statement.to_owned(), args.to_vec()).await?;
        let worker = worker::SqliteWorker::clone(&lease);
        Ok(Box::new(SqliteRowSet::new(worker, columns, Some(lease))))
    }

    async fn exec(&self, statement: &str, args: &[Value]) -> Result<ExecResult, DriverError> {
        let lease = self.pool.get().await?;
        lease.exec(statement.to_owned(), args.to_vec()).await
    }

    async fn close(&self) -> Result<(), DriverError> {
        self.pool.close();
        Ok(())
    }
}

impl fmt::Debug for SqliteDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = self.pool.status();
        f.debug_struct("SqliteDriver")
            .field("size", &status.size)
            .field("available", &status.available)
            .finish()
    }
}
