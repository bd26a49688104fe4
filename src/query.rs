use crate::types::Value;

/// Finished statement text plus its ordered arguments, as handed to a
/// driver.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub text: String,
    pub args: Vec<Value>,
}

impl Statement {
    #[must_use]
    pub fn new(text: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            text: text.into(),
            args,
        }
    }
}

/// Sort direction for one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub field: String,
    pub descending: bool,
}

impl Sort {
    #[must_use]
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    #[must_use]
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }
}

/// Predicate tree for WHERE clauses: field comparisons composed with
/// `and`/`or`.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Eq(String, Value),
    Ne(String, Value),
    Lt(String, Value),
    Lte(String, Value),
    Gt(String, Value),
    Gte(String, Value),
    In(String, Vec<Value>),
}

impl Filter {
    /// Predicate matching every row; renders no WHERE clause.
    #[must_use]
    pub fn none() -> Self {
        Self::And(Vec::new())
    }

    #[must_use]
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq(field.into(), value.into())
    }

    #[must_use]
    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Ne(field.into(), value.into())
    }

    #[must_use]
    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Lt(field.into(), value.into())
    }

    #[must_use]
    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Lte(field.into(), value.into())
    }

    #[must_use]
    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Gt(field.into(), value.into())
    }

    #[must_use]
    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Gte(field.into(), value.into())
    }

    #[must_use]
    pub fn is_in(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self::In(field.into(), values)
    }

    /// Conjoin with another predicate, flattening nested `And`s.
    #[must_use]
    pub fn and(self, other: Filter) -> Self {
        match self {
            Self::And(mut inner) => {
                inner.push(other);
                Self::And(inner)
            }
            first => Self::And(vec![first, other]),
        }
    }

    /// Disjoin with another predicate, flattening nested `Or`s.
    #[must_use]
    pub fn or(self, other: Filter) -> Self {
        match self {
            Self::Or(mut inner) => {
                inner.push(other);
                Self::Or(inner)
            }
            first => Self::Or(vec![first, other]),
        }
    }

    /// True when the predicate constrains nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::And(inner) | Self::Or(inner) => inner.iter().all(Filter::is_empty),
            _ => false,
        }
    }
}

/// Aggregate function selector for [`Adapter::aggregate`](crate::Adapter::aggregate).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateMode {
    Count,
    Sum,
    Min,
    Max,
}

impl AggregateMode {
    #[must_use]
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Count => "COUNT",
            Self::Sum => "SUM",
            Self::Min => "MIN",
            Self::Max => "MAX",
        }
    }

    /// Column alias used for the aggregate expression.
    #[must_use]
    pub fn alias(self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Min => "min",
            Self::Max => "max",
        }
    }
}

/// Abstract description of a read against one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: String,
    pub fields: Vec<String>,
    pub filter: Option<Filter>,
    pub sort: Vec<Sort>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl Query {
    /// Select everything from `collection`.
    #[must_use]
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            fields: vec!["*".to_owned()],
            filter: None,
            sort: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// Replace the selected fields.
    #[must_use]
    pub fn select(mut self, fields: &[&str]) -> Self {
        self.fields = fields.iter().map(|f| (*f).to_owned()).collect();
        self
    }

    /// Constrain the query; repeated calls conjoin.
    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(filter),
            None => filter,
        });
        self
    }

    #[must_use]
    pub fn sort(mut self, sort: Sort) -> Self {
        self.sort.push(sort);
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// Ordered field assignments for inserts and updates. Setting a field twice
/// keeps its original position and replaces the value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Changes {
    entries: Vec<(String, Value)>,
}

impl Changes {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        let field = field.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(name, _)| *name == field) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((field, value)),
        }
        self
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
