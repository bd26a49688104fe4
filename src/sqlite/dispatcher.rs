use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::Duration;

use rusqlite::{Connection, ToSql};
use tokio::sync::oneshot;

use crate::driver::ExecResult;
use crate::error::DriverError;
use crate::types::Value;

use super::params;

/// How a worker opens its connection.
#[derive(Debug, Clone)]
pub(super) struct OpenSpec {
    pub path: String,
    pub busy_timeout: Duration,
    pub wal: bool,
    pub foreign_keys: bool,
}

pub(super) enum Command {
    Exec {
        statement: String,
        args: Vec<Value>,
        respond_to: oneshot::Sender<Result<ExecResult, DriverError>>,
    },
    Batch {
        statements: String,
        respond_to: oneshot::Sender<Result<(), DriverError>>,
    },
    OpenCursor {
        statement: String,
        args: Vec<Value>,
        respond_to: oneshot::Sender<Result<Arc<Vec<String>>, DriverError>>,
    },
    FetchRow {
        respond_to: oneshot::Sender<Result<Option<Vec<Value>>, DriverError>>,
    },
    CloseCursor {
        respond_to: oneshot::Sender<Result<(), DriverError>>,
    },
    Ping {
        respond_to: oneshot::Sender<bool>,
    },
    Shutdown,
}

/// Thread body: open the connection, report readiness, serve commands
/// until shutdown.
pub(super) fn run(
    spec: &OpenSpec,
    receiver: &Receiver<Command>,
    ready: oneshot::Sender<Result<(), DriverError>>,
) {
    let conn = match open_connection(spec) {
        Ok(conn) => conn,
        Err(err) => {
            let _ = ready.send(Err(err));
            return;
        }
    };
    if ready.send(Ok(())).is_err() {
        return;
    }
    serve(&conn, receiver);
}

fn open_connection(spec: &OpenSpec) -> Result<Connection, DriverError> {
    let conn = Connection::open(&spec.path)?;
    conn.busy_timeout(spec.busy_timeout)?;
    if spec.wal {
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
    }
    if spec.foreign_keys {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    }
    Ok(conn)
}

fn serve(conn: &Connection, receiver: &Receiver<Command>) {
    while let Ok(command) = receiver.recv() {
        match command {
            Command::Exec {
                statement,
                args,
                respond_to,
            } => {
                let _ = respond_to.send(run_exec(conn, &statement, &args));
            }
            Command::Batch {
                statements,
                respond_to,
            } => {
                let _ = respond_to.send(conn.execute_batch(&statements).map_err(DriverError::from));
            }
            Command::OpenCursor {
                statement,
                args,
                respond_to,
            } => {
                if !serve_cursor(conn, receiver, &statement, &args, respond_to) {
                    return;
                }
            }
            Command::FetchRow { respond_to } => {
                let _ = respond_to.send(Err(DriverError::Execution(
                    "No cursor open on this connection".into(),
                )));
            }
            Command::CloseCursor { respond_to } => {
                let _ = respond_to.send(Ok(()));
            }
            Command::Ping { respond_to } => {
                let _ = respond_to.send(!conn.is_autocommit());
            }
            Command::Shutdown => return,
        }
    }
}

fn run_exec(conn: &Connection, statement: &str, args: &[Value]) -> Result<ExecResult, DriverError> {
    let params = params::to_sqlite_values(args);
    let param_refs: Vec<&dyn ToSql> = params.iter().map(|value| value as &dyn ToSql).collect();
    let rows_affected = {
        let mut stmt = conn.prepare(statement)?;
        stmt.execute(&param_refs[..])?
    };
    Ok(ExecResult {
        last_insert_id: conn.last_insert_rowid(),
        rows_affected: rows_affected as u64,
    })
}

/// Inner loop while a statement's rows are being streamed.
///
/// The prepared statement borrows the connection, so it lives on this
/// stack frame; until the cursor closes, commands that need the
/// connection for anything else are refused. Returns `false` when the
/// thread should exit.
fn serve_cursor(
    conn: &Connection,
    receiver: &Receiver<Command>,
    statement: &str,
    args: &[Value],
    respond_to: oneshot::Sender<Result<Arc<Vec<String>>, DriverError>>,
) -> bool {
    let mut stmt = match conn.prepare(statement) {
        Ok(stmt) => stmt,
        Err(err) => {
            let _ = respond_to.send(Err(err.into()));
            return true;
        }
    };
    let columns: Arc<Vec<String>> = Arc::new(
        stmt.column_names()
            .iter()
            .map(|name| (*name).to_owned())
            .collect(),
    );
    let width = columns.len();
    let params = params::to_sqlite_values(args);
    let param_refs: Vec<&dyn ToSql> = params.iter().map(|value| value as &dyn ToSql).collect();
    let mut rows = match stmt.query(&param_refs[..]) {
        Ok(rows) => rows,
        Err(err) => {
            let _ = respond_to.send(Err(err.into()));
            return true;
        }
    };
    if respond_to.send(Ok(columns)).is_err() {
        // Caller went away before the first row; drop the statement.
        return true;
    }
    let mut finished = false;
    while let Ok(command) = receiver.recv() {
        match command {
            Command::FetchRow { respond_to } => {
                let fetched = if finished {
                    Ok(None)
                } else {
                    next_row(&mut rows, width)
                };
                if !matches!(fetched, Ok(Some(_))) {
                    finished = true;
                }
                let _ = respond_to.send(fetched);
            }
            Command::CloseCursor { respond_to } => {
                let _ = respond_to.send(Ok(()));
                return true;
            }
            Command::Ping { respond_to } => {
                let _ = respond_to.send(!conn.is_autocommit());
            }
            Command::Exec { respond_to, .. } => {
                let _ = respond_to.send(Err(cursor_busy()));
            }
            Command::Batch { respond_to, .. } => {
                let _ = respond_to.send(Err(cursor_busy()));
            }
            Command::OpenCursor { respond_to, .. } => {
                let _ = respond_to.send(Err(cursor_busy()));
            }
            Command::Shutdown => return false,
        }
    }
    false
}

fn next_row(
    rows: &mut rusqlite::Rows<'_>,
    width: usize,
) -> Result<Option<Vec<Value>>, DriverError> {
    match rows.next() {
        Ok(Some(row)) => params::read_row(row, width).map(Some),
        Ok(None) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

fn cursor_busy() -> DriverError {
    DriverError::Execution("Cursor open on this connection; close it first".into())
}
