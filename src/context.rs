use std::fmt;
use std::sync::Arc;

use crate::driver::{Driver, ExecResult, RowSet, TransactionHandle};
use crate::error::DriverError;
use crate::types::Value;

/// Where an adapter routes its statements.
///
/// `Idle` goes through the driver's pool; `Transaction` pins every call to
/// the one connection holding the open transaction. `depth` counts nested
/// savepoints below the real transaction, zero at the top level.
#[derive(Clone)]
pub enum ExecutionContext {
    Idle(Arc<dyn Driver>),
    Transaction {
        handle: Arc<dyn TransactionHandle>,
        depth: u32,
    },
}

impl ExecutionContext {
    #[must_use]
    pub fn in_transaction(&self) -> bool {
        matches!(self, Self::Transaction { .. })
    }

    /// Savepoint depth, or `None` outside a transaction.
    #[must_use]
    pub fn depth(&self) -> Option<u32> {
        match self {
            Self::Idle(_) => None,
            Self::Transaction { depth, .. } => Some(*depth),
        }
    }

    /// Name of the savepoint opened at `depth`.
    #[must_use]
    pub fn savepoint_name(depth: u32) -> String {
        format!("s{depth}")
    }

    pub(crate) async fn run_query(
        &self,
        statement: &str,
        args: &[Value],
    ) -> Result<Box<dyn RowSet>, DriverError> {
        match self {
            Self::Idle(driver) => driver.query(statement, args).await,
            Self::Transaction { handle, .. } => handle.query(statement, args).await,
        }
    }

    pub(crate) async fn run_exec(
        &self,
        statement: &str,
        args: &[Value],
    ) -> Result<ExecResult, DriverError> {
        match self {
            Self::Idle(driver) => driver.exec(statement, args).await,
            Self::Transaction { handle, .. } => handle.exec(statement, args).await,
        }
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle(_) => f.write_str("Idle"),
            Self::Transaction { depth, .. } => {
                f.debug_struct("Transaction").field("depth", depth).finish()
            }
        }
    }
}
