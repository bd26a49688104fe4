//! Scripted in-memory driver for exercising the adapter without a real
//! database. Each test binary pulls in the pieces it needs.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use sql_adapter::driver::{Driver, ExecResult, RowSet, TransactionHandle};
use sql_adapter::error::DriverError;
use sql_adapter::log::{LogEvent, LogSink};
use sql_adapter::types::Value;

/// One statement the mock driver saw, tagged with where it ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded {
    pub scope: &'static str,
    pub statement: String,
}

impl Recorded {
    pub fn pool(statement: &str) -> Self {
        Self {
            scope: "pool",
            statement: statement.to_owned(),
        }
    }

    pub fn tx(statement: &str) -> Self {
        Self {
            scope: "tx",
            statement: statement.to_owned(),
        }
    }
}

struct QueryScript {
    columns: Vec<String>,
    rows: Vec<Result<Vec<Value>, DriverError>>,
}

#[derive(Default)]
struct State {
    recorded: Vec<Recorded>,
    begin_results: VecDeque<Result<(), DriverError>>,
    exec_results: VecDeque<Result<ExecResult, DriverError>>,
    query_results: VecDeque<Result<QueryScript, DriverError>>,
}

#[derive(Default)]
struct Inner {
    state: Mutex<State>,
    fetches: AtomicUsize,
    releases: AtomicUsize,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    fn run(&self, scope: &'static str, statement: &str) -> Result<ExecResult, DriverError> {
        let mut state = self.lock();
        state.recorded.push(Recorded {
            scope,
            statement: statement.to_owned(),
        });
        state
            .exec_results
            .pop_front()
            .unwrap_or(Ok(ExecResult::default()))
    }

    fn open(
        self: &Arc<Self>,
        scope: &'static str,
        statement: &str,
    ) -> Result<Box<dyn RowSet>, DriverError> {
        let mut state = self.lock();
        state.recorded.push(Recorded {
            scope,
            statement: statement.to_owned(),
        });
        let script = match state.query_results.pop_front() {
            Some(Ok(script)) => script,
            Some(Err(err)) => return Err(err),
            None => QueryScript {
                columns: Vec::new(),
                rows: Vec::new(),
            },
        };
        Ok(Box::new(ScriptedRows {
            columns: Arc::new(script.columns),
            rows: script.rows.into(),
            inner: Arc::clone(self),
            closed: false,
        }))
    }
}

/// Driver double that records every statement and replays scripted
/// results. Unscripted execs succeed with a zeroed [`ExecResult`] and
/// unscripted queries return an empty row set, so transaction and
/// savepoint bookkeeping never eats a script entry by accident.
#[derive(Clone, Default)]
pub struct RecordingDriver {
    inner: Arc<Inner>,
}

impl RecordingDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script_begin(&self, result: Result<(), DriverError>) {
        self.inner.lock().begin_results.push_back(result);
    }

    pub fn script_exec(&self, result: Result<ExecResult, DriverError>) {
        self.inner.lock().exec_results.push_back(result);
    }

    pub fn script_rows(&self, columns: &[&str], rows: Vec<Result<Vec<Value>, DriverError>>) {
        self.inner.lock().query_results.push_back(Ok(QueryScript {
            columns: columns.iter().map(|c| (*c).to_owned()).collect(),
            rows,
        }));
    }

    pub fn script_query_failure(&self, err: DriverError) {
        self.inner.lock().query_results.push_back(Err(err));
    }

    pub fn recorded(&self) -> Vec<Recorded> {
        self.inner.lock().recorded.clone()
    }

    pub fn statements(&self) -> Vec<String> {
        self.inner
            .lock()
            .recorded
            .iter()
            .map(|r| r.statement.clone())
            .collect()
    }

    /// Row fetches answered so far, across every cursor, including the
    /// pull that reports exhaustion.
    pub fn fetches(&self) -> usize {
        self.inner.fetches.load(Ordering::SeqCst)
    }

    /// Row sets released so far, across every cursor.
    pub fn releases(&self) -> usize {
        self.inner.releases.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Driver for RecordingDriver {
    async fn begin(&self) -> Result<Box<dyn TransactionHandle>, DriverError> {
        let scripted = {
            let mut state = self.inner.lock();
            state.recorded.push(Recorded::pool("<begin>"));
            state.begin_results.pop_front()
        };
        if let Some(Err(err)) = scripted {
            return Err(err);
        }
        Ok(Box::new(RecordingTx {
            inner: Arc::clone(&self.inner),
        }))
    }

    async fn query(&self, statement: &str, _args: &[Value]) -> Result<Box<dyn RowSet>, DriverError> {
        self.inner.open("pool", statement)
    }

    async fn exec(&self, statement: &str, _args: &[Value]) -> Result<ExecResult, DriverError> {
        self.inner.run("pool", statement)
    }

    async fn close(&self) -> Result<(), DriverError> {
        Ok(())
    }
}

struct RecordingTx {
    inner: Arc<Inner>,
}

#[async_trait]
impl TransactionHandle for RecordingTx {
    async fn query(&self, statement: &str, _args: &[Value]) -> Result<Box<dyn RowSet>, DriverError> {
        self.inner.open("tx", statement)
    }

    async fn exec(&self, statement: &str, _args: &[Value]) -> Result<ExecResult, DriverError> {
        self.inner.run("tx", statement)
    }

    async fn commit(&self) -> Result<(), DriverError> {
        self.inner.run("tx", "<commit>").map(|_| ())
    }

    async fn rollback(&self) -> Result<(), DriverError> {
        self.inner.run("tx", "<rollback>").map(|_| ())
    }
}

/// Row set replaying a scripted sequence.
struct ScriptedRows {
    columns: Arc<Vec<String>>,
    rows: VecDeque<Result<Vec<Value>, DriverError>>,
    inner: Arc<Inner>,
    closed: bool,
}

#[async_trait]
impl RowSet for ScriptedRows {
    fn columns(&self) -> Arc<Vec<String>> {
        Arc::clone(&self.columns)
    }

    async fn next_row(&mut self) -> Result<Option<Vec<Value>>, DriverError> {
        self.inner.fetches.fetch_add(1, Ordering::SeqCst);
        match self.rows.pop_front() {
            Some(Ok(values)) => Ok(Some(values)),
            Some(Err(err)) => Err(err),
            None => Ok(None),
        }
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        if !self.closed {
            self.closed = true;
            self.inner.releases.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// Driver whose calls never complete, for exercising cancellation.
pub struct HangingDriver;

#[async_trait]
impl Driver for HangingDriver {
    async fn begin(&self) -> Result<Box<dyn TransactionHandle>, DriverError> {
        std::future::pending().await
    }

    async fn query(&self, _statement: &str, _args: &[Value]) -> Result<Box<dyn RowSet>, DriverError> {
        std::future::pending().await
    }

    async fn exec(&self, _statement: &str, _args: &[Value]) -> Result<ExecResult, DriverError> {
        std::future::pending().await
    }

    async fn close(&self) -> Result<(), DriverError> {
        Ok(())
    }
}

/// Sink that forwards every event into a channel the test can await.
pub struct NotifySink {
    sender: tokio::sync::mpsc::UnboundedSender<LogEvent>,
}

impl NotifySink {
    pub fn channel() -> (Arc<Self>, tokio::sync::mpsc::UnboundedReceiver<LogEvent>) {
        let (sender, receiver) = tokio::sync::mpsc::unbounded_channel();
        (Arc::new(Self { sender }), receiver)
    }
}

impl LogSink for NotifySink {
    fn emit(&self, event: &LogEvent) {
        let _ = self.sender.send(event.clone());
    }
}
