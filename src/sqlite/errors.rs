use rusqlite::ffi;

use crate::error::{DriverError, Error};

/// Maps `SQLite` failures onto the adapter's portable error kinds.
///
/// Only constraint violations get a portable kind; everything else keeps
/// its driver error so callers can still reach the original code.
#[must_use]
pub fn classify_sqlite_error(err: DriverError) -> Error {
    match err {
        DriverError::Sqlite(rusqlite::Error::SqliteFailure(code, message)) => {
            let detail = message.clone().unwrap_or_else(|| code.to_string());
            match code.extended_code {
                ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                    Error::UniqueConstraint(detail)
                }
                ffi::SQLITE_CONSTRAINT_FOREIGNKEY => Error::ForeignKeyConstraint(detail),
                ffi::SQLITE_CONSTRAINT_CHECK => Error::CheckConstraint(detail),
                _ => Error::Driver(DriverError::Sqlite(rusqlite::Error::SqliteFailure(
                    code, message,
                ))),
            }
        }
        other => Error::Driver(other),
    }
}
