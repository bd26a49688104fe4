use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Sender};
use std::thread;

use tokio::runtime::Handle;
use tokio::sync::oneshot;

use crate::driver::ExecResult;
use crate::error::DriverError;
use crate::types::Value;

use super::dispatcher::{self, Command, OpenSpec};

static NEXT_WORKER_ID: AtomicU64 = AtomicU64::new(0);

/// Client half of a worker thread that owns one `SQLite` connection.
///
/// Statements and their row iterators borrow the connection and cannot
/// cross an await point, so the connection lives on its own thread and
/// every call is relayed over a channel.
#[derive(Clone)]
pub(super) struct SqliteWorker {
    inner: Arc<WorkerInner>,
}

struct WorkerInner {
    sender: Sender<Command>,
}

impl Drop for WorkerInner {
    fn drop(&mut self) {
        let _ = self.sender.send(Command::Shutdown);
    }
}

impl SqliteWorker {
    /// Spawns the worker thread and waits for it to open the connection.
    ///
    /// # Errors
    /// Returns [`DriverError::Connection`] if the thread cannot be spawned
    /// or the database cannot be opened.
    pub(super) async fn connect(spec: OpenSpec) -> Result<Self, DriverError> {
        let (sender, receiver) = mpsc::channel::<Command>();
        let (ready_tx, ready_rx) = oneshot::channel();
        let id = NEXT_WORKER_ID.fetch_add(1, Ordering::Relaxed);
        let handle = Handle::try_current().ok();
        thread::Builder::new()
            .name(format!("sqlite-worker-{id}"))
            .spawn(move || {
                let runtime_guard = handle.as_ref().map(|h| h.enter());
                dispatcher::run(&spec, &receiver, ready_tx);
                drop(runtime_guard);
            })
            .map_err(|err| {
                DriverError::Connection(format!("failed to spawn SQLite worker thread: {err}"))
            })?;
        ready_rx
            .await
            .map_err(|_| DriverError::Connection("SQLite worker exited before opening".into()))??;
        tracing::debug!(worker = id, "SQLite worker connected");
        Ok(Self {
            inner: Arc::new(WorkerInner { sender }),
        })
    }

    fn send_command(&self, command: Command) -> Result<(), DriverError> {
        self.inner
            .sender
            .send(command)
            .map_err(|_| DriverError::Connection("SQLite worker closed".into()))
    }

    /// Runs a statement that returns no rows.
    ///
    /// # Errors
    /// Returns any [`DriverError`] from preparing or executing the
    /// statement, or if the worker goes away mid-call.
    pub(super) async fn exec(
        &self,
        statement: String,
        args: Vec<Value>,
    ) -> Result<ExecResult, DriverError> {
        let (tx, rx) = oneshot::channel();
        self.send_command(Command::Exec {
            statement,
            args,
            respond_to: tx,
        })?;
        rx.await.map_err(|_| {
            DriverError::Connection("SQLite worker dropped while executing statement".into())
        })?
    }

    /// Runs a batch of statements in one call.
    ///
    /// # Errors
    /// Returns any [`DriverError`] the batch hits, or if the worker goes
    /// away mid-call.
    pub(super) async fn execute_batch(&self, statements: String) -> Result<(), DriverError> {
        let (tx, rx) = oneshot::channel();
        self.send_command(Command::Batch {
            statements,
            respond_to: tx,
        })?;
        rx.await.map_err(|_| {
            DriverError::Connection("SQLite worker dropped while executing batch".into())
        })?
    }

    /// Starts a row-returning statement; the cursor stays open on the
    /// worker until [`close_cursor`](Self::close_cursor) or shutdown.
    ///
    /// # Errors
    /// Returns any [`DriverError`] from preparing or starting the
    /// statement, or if the worker goes away mid-call.
    pub(super) async fn open_cursor(
        &self,
        statement: String,
        args: Vec<Value>,
    ) -> Result<Arc<Vec<String>>, DriverError> {
        let (tx, rx) = oneshot::channel();
        self.send_command(Command::OpenCursor {
            statement,
            args,
            respond_to: tx,
        })?;
        rx.await.map_err(|_| {
            DriverError::Connection("SQLite worker dropped while opening cursor".into())
        })?
    }

    /// Fetches the next row of the open cursor.
    ///
    /// # Errors
    /// Returns any [`DriverError`] from stepping the statement, or if no
    /// cursor is open, or if the worker goes away mid-call.
    pub(super) async fn fetch_row(&self) -> Result<Option<Vec<Value>>, DriverError> {
        let (tx, rx) = oneshot::channel();
        self.send_command(Command::FetchRow { respond_to: tx })?;
        rx.await.map_err(|_| {
            DriverError::Connection("SQLite worker dropped while fetching row".into())
        })?
    }

    /// Closes the open cursor; a no-op when none is open.
    ///
    /// # Errors
    /// Returns [`DriverError::Connection`] if the worker goes away
    /// mid-call.
    pub(super) async fn close_cursor(&self) -> Result<(), DriverError> {
        let (tx, rx) = oneshot::channel();
        self.send_command(Command::CloseCursor { respond_to: tx })?;
        rx.await.map_err(|_| {
            DriverError::Connection("SQLite worker dropped while closing cursor".into())
        })?
    }

    /// Queues a cursor close without waiting for the acknowledgement.
    pub(super) fn close_cursor_nowait(&self) {
        let (tx, _rx) = oneshot::channel();
        let _ = self.send_command(Command::CloseCursor { respond_to: tx });
    }

    /// Liveness probe; reports whether a transaction is open.
    ///
    /// # Errors
    /// Returns [`DriverError::Connection`] if the worker goes away
    /// mid-call.
    pub(super) async fn ping(&self) -> Result<bool, DriverError> {
        let (tx, rx) = oneshot::channel();
        self.send_command(Command::Ping { respond_to: tx })?;
        rx.await
            .map_err(|_| DriverError::Connection("SQLite worker dropped while pinging".into()))
    }
}
