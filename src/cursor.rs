use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::AdapterConfig;
use crate::driver::RowSet;
use crate::error::Error;
use crate::types::Value;

/// One materialized result row.
///
/// Column names and the lookup index are shared across every row of a
/// cursor, so cloning a `Row` only copies its values.
#[derive(Debug, Clone)]
pub struct Row {
    columns: Arc<Vec<String>>,
    index: Arc<HashMap<String, usize>>,
    values: Vec<Value>,
}

impl Row {
    /// Value of the named column, or `None` when the column is absent.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        match self.index.get(column) {
            Some(&i) => self.values.get(i),
            None => self
                .columns
                .iter()
                .position(|c| c == column)
                .and_then(|i| self.values.get(i)),
        }
    }

    #[must_use]
    pub fn get_index(&self, i: usize) -> Option<&Value> {
        self.values.get(i)
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    #[must_use]
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

/// Forward-only view over a statement's rows.
///
/// Rows are fetched on demand; nothing is buffered ahead of [`next`].
/// The underlying statement is released when the cursor is exhausted,
/// fails, or is closed, whichever comes first. A finished cursor cannot
/// be restarted.
///
/// [`next`]: Cursor::next
pub struct Cursor {
    rows: Option<Box<dyn RowSet>>,
    columns: Arc<Vec<String>>,
    index: Arc<HashMap<String, usize>>,
    config: Arc<AdapterConfig>,
    cancel: CancellationToken,
}

impl Cursor {
    pub(crate) fn new(
        rows: Box<dyn RowSet>,
        config: Arc<AdapterConfig>,
        cancel: CancellationToken,
    ) -> Self {
        let columns = rows.columns();
        let index = Arc::new(
            columns
                .iter()
                .enumerate()
                .map(|(i, name)| (name.clone(), i))
                .collect(),
        );
        Self {
            rows: Some(rows),
            columns,
            index,
            config,
            cancel,
        }
    }

    /// Column names of the result, available before the first row.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Fetches the next row.
    ///
    /// Returns `Ok(None)` once the set is exhausted. After an error or
    /// cancellation the cursor is closed and stays exhausted.
    ///
    /// # Errors
    /// Returns the classified driver error when fetching fails, or
    /// [`Error::Cancelled`] when the token fires between rows.
    pub async fn next(&mut self) -> Result<Option<Row>, Error> {
        let Some(rows) = self.rows.as_mut() else {
            return Ok(None);
        };
        let fetched = tokio::select! {
            biased;
            () = self.cancel.cancelled() => {
                self.release().await;
                return Err(Error::Cancelled);
            }
            fetched = rows.next_row() => fetched,
        };
        match fetched {
            Ok(Some(values)) => Ok(Some(Row {
                columns: Arc::clone(&self.columns),
                index: Arc::clone(&self.index),
                values,
            })),
            Ok(None) => {
                self.release().await;
                Ok(None)
            }
            Err(err) => {
                self.release().await;
                Err(self.config.classify(err))
            }
        }
    }

    /// Drains the remaining rows into a vector.
    ///
    /// # Errors
    /// Returns the first error [`next`](Cursor::next) reports.
    pub async fn fetch_all(mut self) -> Result<Vec<Row>, Error> {
        let mut out = Vec::new();
        while let Some(row) = self.next().await? {
            out.push(row);
        }
        Ok(out)
    }

    /// Releases the underlying statement.
    ///
    /// Safe to call more than once; only the first call reaches the driver.
    ///
    /// # Errors
    /// Returns the classified driver error when the release itself fails.
    pub async fn close(&mut self) -> Result<(), Error> {
        let Some(mut rows) = self.rows.take() else {
            return Ok(());
        };
        rows.close().await.map_err(|err| self.config.classify(err))
    }

    /// Close that swallows failures, for paths already reporting an error.
    async fn release(&mut self) {
        if let Some(mut rows) = self.rows.take() {
            let _ = rows.close().await;
        }
    }
}

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("columns", &self.columns)
            .field("open", &self.rows.is_some())
            .finish()
    }
}
