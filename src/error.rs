use thiserror::Error;

/// Errors raised below the classification boundary: drivers, pools, and the
/// channels that talk to them.
#[derive(Debug, Error)]
pub enum DriverError {
    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Other driver error: {0}")]
    Other(String),
}

#[cfg(feature = "sqlite")]
impl From<deadpool::managed::PoolError<DriverError>> for DriverError {
    fn from(err: deadpool::managed::PoolError<DriverError>) -> Self {
        match err {
            deadpool::managed::PoolError::Backend(inner) => inner,
            other => DriverError::Pool(other.to_string()),
        }
    }
}

/// Domain errors returned by adapter operations.
///
/// Store-specific failures arrive here through the classifier configured on
/// [`AdapterConfig`](crate::config::AdapterConfig), so callers match on a
/// small closed set of kinds instead of driver types. `NoActiveTransaction`
/// and `Cancelled` are raised locally and never come out of a classifier
/// running over store errors.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Unique constraint violated: {0}")]
    UniqueConstraint(String),

    #[error("Foreign key constraint violated: {0}")]
    ForeignKeyConstraint(String),

    #[error("Check constraint violated: {0}")]
    CheckConstraint(String),

    #[error("No active transaction")]
    NoActiveTransaction,

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Row scan error: {0}")]
    Scan(String),

    #[error(transparent)]
    Driver(#[from] DriverError),
}
