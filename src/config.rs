use std::fmt;
use std::sync::Arc;

use crate::error::{DriverError, Error};

/// Maps driver errors onto domain [`Error`] kinds.
pub type ErrorClassifier = Arc<dyn Fn(DriverError) -> Error + Send + Sync>;

/// Reports the store's auto-increment step, used to predict generated keys
/// for multi-row inserts.
pub type IncrementStep = Arc<dyn Fn() -> i64 + Send + Sync>;

/// Dialect description shared read-only by every adapter derived from one
/// store: placeholder style, identifier quoting, the empty-insert shape, the
/// error classifier, and the optional increment step.
#[derive(Clone)]
pub struct AdapterConfig {
    /// Placeholder token, e.g. `?` or `$`.
    pub placeholder: String,
    /// Whether placeholders carry a 1-based ordinal (`$1`, `$2`) instead of
    /// being purely positional.
    pub ordinal: bool,
    /// Whether an insert with no values takes the `DEFAULT VALUES` shape
    /// rather than `() VALUES ()`.
    pub insert_default_values: bool,
    /// Identifier quote character.
    pub escape_char: char,
    classifier: ErrorClassifier,
    increment: Option<IncrementStep>,
}

impl AdapterConfig {
    /// Build a config with the passthrough classifier (driver errors surface
    /// as [`Error::Driver`]) and the default increment step of 1.
    #[must_use]
    pub fn new(
        placeholder: impl Into<String>,
        ordinal: bool,
        insert_default_values: bool,
        escape_char: char,
    ) -> Self {
        Self {
            placeholder: placeholder.into(),
            ordinal,
            insert_default_values,
            escape_char,
            classifier: Arc::new(Error::Driver),
            increment: None,
        }
    }

    /// Dialect preset for the bundled `SQLite` driver, classifier included.
    #[cfg(feature = "sqlite")]
    #[must_use]
    pub fn sqlite() -> Self {
        Self::new("?", false, true, '"').with_classifier(crate::sqlite::classify_sqlite_error)
    }

    /// Dialect preset for PostgreSQL-style stores: `$n` placeholders,
    /// double-quote escaping, `DEFAULT VALUES` inserts.
    #[must_use]
    pub fn postgres() -> Self {
        Self::new("$", true, true, '"')
    }

    /// Dialect preset for MySQL-style stores: `?` placeholders, backtick
    /// escaping, `() VALUES ()` inserts.
    #[must_use]
    pub fn mysql() -> Self {
        Self::new("?", false, false, '`')
    }

    /// Replace the error classifier.
    #[must_use]
    pub fn with_classifier(
        mut self,
        classifier: impl Fn(DriverError) -> Error + Send + Sync + 'static,
    ) -> Self {
        self.classifier = Arc::new(classifier);
        self
    }

    /// Supply a store-specific increment step for generated-key prediction.
    #[must_use]
    pub fn with_increment_step(mut self, step: impl Fn() -> i64 + Send + Sync + 'static) -> Self {
        self.increment = Some(Arc::new(step));
        self
    }

    /// Run a driver error through the configured classifier.
    #[must_use]
    pub fn classify(&self, err: DriverError) -> Error {
        (self.classifier)(err)
    }

    /// Auto-increment step for generated-key prediction; 1 unless configured.
    #[must_use]
    pub fn increment_step(&self) -> i64 {
        self.increment.as_ref().map_or(1, |step| step())
    }

    /// Placeholder text for the argument at `position` (1-based).
    #[must_use]
    pub fn placeholder_at(&self, position: usize) -> String {
        if self.ordinal {
            format!("{}{position}", self.placeholder)
        } else {
            self.placeholder.clone()
        }
    }

    /// Quote an identifier, segment-wise across `.`; `*` passes through.
    #[must_use]
    pub fn escape_ident(&self, ident: &str) -> String {
        let quote = self.escape_char;
        ident
            .split('.')
            .map(|segment| {
                if segment == "*" {
                    segment.to_owned()
                } else {
                    format!("{quote}{segment}{quote}")
                }
            })
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl fmt::Debug for AdapterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterConfig")
            .field("placeholder", &self.placeholder)
            .field("ordinal", &self.ordinal)
            .field("insert_default_values", &self.insert_default_values)
            .field("escape_char", &self.escape_char)
            .field("custom_increment", &self.increment.is_some())
            .finish()
    }
}
