use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::builder::{SqlBuilder, StatementBuilder};
use crate::config::AdapterConfig;
use crate::context::ExecutionContext;
use crate::cursor::Cursor;
use crate::driver::{Driver, ExecResult, RowSet};
use crate::error::{DriverError, Error};
use crate::log::{self, LogEvent, LogSink};
use crate::query::{AggregateMode, Changes, Filter, Query, Statement};
use crate::types::Value;

/// Uniform entry point for statement execution against one database.
///
/// An adapter is cheap to clone; clones share the driver, configuration,
/// and log sinks. [`begin`] returns a fresh adapter whose calls run inside
/// the new transaction while the original keeps routing through the pool,
/// so a transaction is a chain of adapters rather than a mode switch.
///
/// [`begin`]: Adapter::begin
#[derive(Clone)]
pub struct Adapter {
    config: Arc<AdapterConfig>,
    builder: Arc<dyn StatementBuilder>,
    driver: Arc<dyn Driver>,
    context: ExecutionContext,
    sinks: Arc<Vec<Arc<dyn LogSink>>>,
    cancel: CancellationToken,
}

/// Outcome of the raced driver call, before classification.
enum CallError {
    Cancelled,
    Driver(DriverError),
}

impl CallError {
    fn message(&self) -> String {
        match self {
            Self::Cancelled => Error::Cancelled.to_string(),
            Self::Driver(err) => err.to_string(),
        }
    }
}

impl Adapter {
    #[must_use]
    pub fn new(config: AdapterConfig, driver: Arc<dyn Driver>) -> Self {
        let config = Arc::new(config);
        Self {
            builder: Arc::new(SqlBuilder::new(Arc::clone(&config))),
            config,
            context: ExecutionContext::Idle(Arc::clone(&driver)),
            driver,
            sinks: Arc::new(Vec::new()),
            cancel: CancellationToken::new(),
        }
    }

    /// Replaces the statement builder.
    #[must_use]
    pub fn with_builder(mut self, builder: Arc<dyn StatementBuilder>) -> Self {
        self.builder = builder;
        self
    }

    /// Registers a sink that receives an event per executed statement.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        let mut sinks = self.sinks.as_ref().clone();
        sinks.push(sink);
        self.sinks = Arc::new(sinks);
        self
    }

    /// Ties every call on this adapter (and adapters begun from it) to the
    /// token; a fired token surfaces as [`Error::Cancelled`].
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    #[must_use]
    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    #[must_use]
    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Opens a transaction, or a savepoint when one is already open.
    ///
    /// Outside a transaction this takes a dedicated connection from the
    /// driver. Inside one it issues `SAVEPOINT` on the same connection and
    /// returns an adapter one level deeper; the parent must not be used
    /// again until the child is committed or rolled back.
    ///
    /// # Errors
    /// Returns the classified driver error when the transaction or
    /// savepoint cannot be opened.
    pub async fn begin(&self) -> Result<Self, Error> {
        match &self.context {
            ExecutionContext::Idle(driver) => {
                let begun = tokio::select! {
                    biased;
                    () = self.cancel.cancelled() => return Err(Error::Cancelled),
                    begun = driver.begin() => begun,
                };
                let handle = begun.map_err(|err| self.config.classify(err))?;
                let mut child = self.clone();
                child.context = ExecutionContext::Transaction {
                    handle: Arc::from(handle),
                    depth: 0,
                };
                Ok(child)
            }
            ExecutionContext::Transaction { handle, depth } => {
                let name = ExecutionContext::savepoint_name(depth + 1);
                self.run_exec(&Statement::new(format!("SAVEPOINT {name}"), Vec::new()))
                    .await?;
                let mut child = self.clone();
                child.context = ExecutionContext::Transaction {
                    handle: Arc::clone(handle),
                    depth: depth + 1,
                };
                Ok(child)
            }
        }
    }

    /// Commits this level: `RELEASE SAVEPOINT` inside a savepoint, a real
    /// commit at the top level.
    ///
    /// # Errors
    /// Returns [`Error::NoActiveTransaction`] outside a transaction, or
    /// the classified driver error when the database rejects the commit.
    pub async fn commit(self) -> Result<(), Error> {
        match &self.context {
            ExecutionContext::Idle(_) => Err(Error::NoActiveTransaction),
            ExecutionContext::Transaction { handle, depth: 0 } => {
                let finished = tokio::select! {
                    biased;
                    () = self.cancel.cancelled() => return Err(Error::Cancelled),
                    finished = handle.commit() => finished,
                };
                finished.map_err(|err| self.config.classify(err))
            }
            ExecutionContext::Transaction { depth, .. } => {
                let name = ExecutionContext::savepoint_name(*depth);
                self.run_exec(&Statement::new(
                    format!("RELEASE SAVEPOINT {name}"),
                    Vec::new(),
                ))
                .await
                .map(|_| ())
            }
        }
    }

    /// Rolls back this level: `ROLLBACK TO SAVEPOINT` inside a savepoint,
    /// a real rollback at the top level.
    ///
    /// # Errors
    /// Returns [`Error::NoActiveTransaction`] outside a transaction, or
    /// the classified driver error when the rollback fails.
    pub async fn rollback(self) -> Result<(), Error> {
        match &self.context {
            ExecutionContext::Idle(_) => Err(Error::NoActiveTransaction),
            ExecutionContext::Transaction { handle, depth: 0 } => {
                let finished = tokio::select! {
                    biased;
                    () = self.cancel.cancelled() => return Err(Error::Cancelled),
                    finished = handle.rollback() => finished,
                };
                finished.map_err(|err| self.config.classify(err))
            }
            ExecutionContext::Transaction { depth, .. } => {
                let name = ExecutionContext::savepoint_name(*depth);
                self.run_exec(&Statement::new(
                    format!("ROLLBACK TO SAVEPOINT {name}"),
                    Vec::new(),
                ))
                .await
                .map(|_| ())
            }
        }
    }

    /// Runs a find query and returns a lazy cursor over its rows.
    ///
    /// # Errors
    /// Returns the classified driver error when the statement fails, or
    /// [`Error::Cancelled`] when the token fires first.
    pub async fn query(&self, query: &Query) -> Result<Cursor, Error> {
        let statement = self.builder.find(query);
        let rows = self.run_query(&statement).await?;
        Ok(Cursor::new(
            rows,
            Arc::clone(&self.config),
            self.cancel.clone(),
        ))
    }

    /// Computes a single aggregate over the filtered collection.
    ///
    /// A `NULL` aggregate (no matching rows) is reported as zero.
    ///
    /// # Errors
    /// Returns the classified driver error when the statement fails, or
    /// [`Error::Scan`] when the result cannot be read as an integer.
    pub async fn aggregate(
        &self,
        query: &Query,
        mode: AggregateMode,
        field: &str,
    ) -> Result<i64, Error> {
        let statement = self.builder.aggregate(query, mode, field);
        let mut rows = self.run_query(&statement).await?;
        let fetched = tokio::select! {
            biased;
            () = self.cancel.cancelled() => {
                let _ = rows.close().await;
                return Err(Error::Cancelled);
            }
            fetched = rows.next_row() => fetched,
        };
        let scanned = match fetched {
            Ok(Some(values)) => match values.into_iter().next() {
                None | Some(Value::Null) => Ok(0),
                Some(Value::Int(v)) => Ok(v),
                Some(other) => Err(Error::Scan(format!(
                    "aggregate value is not an integer: {other}"
                ))),
            },
            Ok(None) => Err(Error::Scan("aggregate query returned no rows".to_owned())),
            Err(err) => Err(self.config.classify(err)),
        };
        let closed = rows.close().await;
        let value = scanned?;
        closed.map_err(|err| self.config.classify(err))?;
        Ok(value)
    }

    /// Runs a prebuilt statement that returns no rows.
    ///
    /// # Errors
    /// Returns the classified driver error when the statement fails, or
    /// [`Error::Cancelled`] when the token fires first.
    pub async fn exec(&self, statement: &str, args: Vec<Value>) -> Result<ExecResult, Error> {
        self.run_exec(&Statement::new(statement, args)).await
    }

    /// Inserts one row and returns its generated id.
    ///
    /// # Errors
    /// Returns the classified driver error when the insert fails.
    pub async fn insert(&self, collection: &str, changes: &Changes) -> Result<i64, Error> {
        let statement = self.builder.insert(collection, changes);
        let result = self.run_exec(&statement).await?;
        Ok(result.last_insert_id)
    }

    /// Inserts several rows with one statement and returns their ids.
    ///
    /// Only the first id comes from the database; the rest are predicted
    /// by stepping it with the configured increment. Backends that report
    /// a different row's id for a multi-row insert, or non-contiguous
    /// allocation under concurrent writers, break the prediction.
    ///
    /// # Errors
    /// Returns the classified driver error when the insert fails.
    pub async fn insert_all(
        &self,
        collection: &str,
        fields: &[&str],
        changesets: &[Changes],
    ) -> Result<Vec<i64>, Error> {
        let fields: Vec<String> = fields.iter().map(|f| (*f).to_owned()).collect();
        let statement = self.builder.insert_all(collection, &fields, changesets);
        let result = self.run_exec(&statement).await?;
        let step = self.config.increment_step();
        let mut ids = vec![result.last_insert_id];
        for i in 1..changesets.len() {
            ids.push(result.last_insert_id + step * i as i64);
        }
        Ok(ids)
    }

    /// Applies the changes to every row matching the filter.
    ///
    /// # Errors
    /// Returns the classified driver error when the update fails.
    pub async fn update(
        &self,
        collection: &str,
        changes: &Changes,
        filter: &Filter,
    ) -> Result<(), Error> {
        let statement = self.builder.update(collection, changes, filter);
        self.run_exec(&statement).await.map(|_| ())
    }

    /// Deletes every row matching the filter.
    ///
    /// # Errors
    /// Returns the classified driver error when the delete fails.
    pub async fn delete(&self, collection: &str, filter: &Filter) -> Result<(), Error> {
        let statement = self.builder.delete(collection, filter);
        self.run_exec(&statement).await.map(|_| ())
    }

    /// Shuts down the driver behind every clone of this adapter.
    ///
    /// # Errors
    /// Returns the classified driver error when shutdown fails.
    pub async fn close(&self) -> Result<(), Error> {
        self.driver
            .close()
            .await
            .map_err(|err| self.config.classify(err))
    }

    async fn run_query(&self, statement: &Statement) -> Result<Box<dyn RowSet>, Error> {
        let started = Instant::now();
        let outcome = tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(CallError::Cancelled),
            fetched = self.context.run_query(&statement.text, &statement.args) => {
                fetched.map_err(CallError::Driver)
            }
        };
        self.emit(&statement.text, started.elapsed(), outcome.as_ref().err());
        match outcome {
            Ok(rows) => Ok(rows),
            Err(CallError::Cancelled) => Err(Error::Cancelled),
            Err(CallError::Driver(err)) => Err(self.config.classify(err)),
        }
    }

    async fn run_exec(&self, statement: &Statement) -> Result<ExecResult, Error> {
        let started = Instant::now();
        let outcome = tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(CallError::Cancelled),
            executed = self.context.run_exec(&statement.text, &statement.args) => {
                executed.map_err(CallError::Driver)
            }
        };
        self.emit(&statement.text, started.elapsed(), outcome.as_ref().err());
        match outcome {
            Ok(result) => Ok(result),
            Err(CallError::Cancelled) => Err(Error::Cancelled),
            Err(CallError::Driver(err)) => Err(self.config.classify(err)),
        }
    }

    fn emit(&self, statement: &str, elapsed: Duration, failure: Option<&CallError>) {
        if self.sinks.is_empty() {
            return;
        }
        log::dispatch(
            &self.sinks,
            LogEvent {
                statement: statement.to_owned(),
                elapsed,
                error: failure.map(CallError::message),
            },
        );
    }
}

impl fmt::Debug for Adapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Adapter")
            .field("context", &self.context)
            .field("sinks", &self.sinks.len())
            .finish()
    }
}
