use std::fmt::Write as _;
use std::sync::Arc;

use crate::config::AdapterConfig;
use crate::query::{AggregateMode, Changes, Filter, Query, Statement};
use crate::types::Value;

/// Produces statement text and ordered arguments from abstract descriptions.
///
/// The adapter treats statement text as opaque, so everything dialect-aware
/// (placeholder style, identifier quoting, the empty-insert shape) lives
/// behind this trait.
pub trait StatementBuilder: Send + Sync {
    fn find(&self, query: &Query) -> Statement;
    fn aggregate(&self, query: &Query, mode: AggregateMode, field: &str) -> Statement;
    fn insert(&self, collection: &str, changes: &Changes) -> Statement;
    fn insert_all(&self, collection: &str, fields: &[String], changesets: &[Changes]) -> Statement;
    fn update(&self, collection: &str, changes: &Changes, filter: &Filter) -> Statement;
    fn delete(&self, collection: &str, filter: &Filter) -> Statement;
}

/// Reference SQL builder driven entirely by [`AdapterConfig`].
pub struct SqlBuilder {
    config: Arc<AdapterConfig>,
}

impl SqlBuilder {
    #[must_use]
    pub fn new(config: Arc<AdapterConfig>) -> Self {
        Self { config }
    }

    fn push_placeholder(&self, out: &mut Fragment, value: Value) {
        out.position += 1;
        out.text.push_str(&self.config.placeholder_at(out.position));
        out.args.push(value);
    }

    fn write_field_list(&self, fields: &[String], text: &mut String) {
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                text.push_str(", ");
            }
            text.push_str(&self.config.escape_ident(field));
        }
    }

    fn write_filter(&self, filter: &Filter, out: &mut Fragment) {
        match filter {
            Filter::And(inner) => self.write_composite(inner, " AND ", "1=1", out),
            Filter::Or(inner) => self.write_composite(inner, " OR ", "1=0", out),
            Filter::Eq(field, value) => self.write_comparison(field, "=", value, out),
            Filter::Ne(field, value) => self.write_comparison(field, "!=", value, out),
            Filter::Lt(field, value) => self.write_comparison(field, "<", value, out),
            Filter::Lte(field, value) => self.write_comparison(field, "<=", value, out),
            Filter::Gt(field, value) => self.write_comparison(field, ">", value, out),
            Filter::Gte(field, value) => self.write_comparison(field, ">=", value, out),
            Filter::In(field, values) => {
                if values.is_empty() {
                    out.text.push_str("1=0");
                    return;
                }
                out.text.push_str(&self.config.escape_ident(field));
                out.text.push_str(" IN (");
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        out.text.push_str(", ");
                    }
                    self.push_placeholder(out, value.clone());
                }
                out.text.push(')');
            }
        }
    }

    fn write_composite(&self, inner: &[Filter], joiner: &str, vacuous: &str, out: &mut Fragment) {
        let members: Vec<&Filter> = inner.iter().filter(|f| !f.is_empty()).collect();
        if members.is_empty() {
            out.text.push_str(vacuous);
            return;
        }
        for (i, member) in members.iter().enumerate() {
            if i > 0 {
                out.text.push_str(joiner);
            }
            let group = matches!(member, Filter::And(_) | Filter::Or(_));
            if group {
                out.text.push('(');
            }
            self.write_filter(member, out);
            if group {
                out.text.push(')');
            }
        }
    }

    fn write_comparison(&self, field: &str, op: &str, value: &Value, out: &mut Fragment) {
        out.text.push_str(&self.config.escape_ident(field));
        out.text.push(' ');
        out.text.push_str(op);
        out.text.push(' ');
        self.push_placeholder(out, value.clone());
    }

    fn write_where(&self, filter: Option<&Filter>, out: &mut Fragment) {
        if let Some(filter) = filter {
            if !filter.is_empty() {
                out.text.push_str(" WHERE ");
                self.write_filter(filter, out);
            }
        }
    }
}

/// Statement text under construction, with the running placeholder position.
struct Fragment {
    text: String,
    args: Vec<Value>,
    position: usize,
}

impl Fragment {
    fn new() -> Self {
        Self {
            text: String::new(),
            args: Vec::new(),
            position: 0,
        }
    }

    fn finish(self) -> Statement {
        Statement {
            text: self.text,
            args: self.args,
        }
    }
}

impl StatementBuilder for SqlBuilder {
    fn find(&self, query: &Query) -> Statement {
        let mut out = Fragment::new();
        out.text.push_str("SELECT ");
        self.write_field_list(&query.fields, &mut out.text);
        out.text.push_str(" FROM ");
        out.text.push_str(&self.config.escape_ident(&query.collection));
        self.write_where(query.filter.as_ref(), &mut out);
        for (i, sort) in query.sort.iter().enumerate() {
            out.text.push_str(if i == 0 { " ORDER BY " } else { ", " });
            out.text.push_str(&self.config.escape_ident(&sort.field));
            out.text.push_str(if sort.descending { " DESC" } else { " ASC" });
        }
        if let Some(limit) = query.limit {
            let _ = write!(out.text, " LIMIT {limit}");
        }
        if let Some(offset) = query.offset {
            let _ = write!(out.text, " OFFSET {offset}");
        }
        out.finish()
    }

    fn aggregate(&self, query: &Query, mode: AggregateMode, field: &str) -> Statement {
        let mut out = Fragment::new();
        let _ = write!(
            out.text,
            "SELECT {}({}) AS {} FROM {}",
            mode.keyword(),
            self.config.escape_ident(field),
            self.config.escape_ident(mode.alias()),
            self.config.escape_ident(&query.collection),
        );
        self.write_where(query.filter.as_ref(), &mut out);
        out.finish()
    }

    fn insert(&self, collection: &str, changes: &Changes) -> Statement {
        let mut out = Fragment::new();
        out.text.push_str("INSERT INTO ");
        out.text.push_str(&self.config.escape_ident(collection));
        if changes.is_empty() {
            out.text.push_str(if self.config.insert_default_values {
                " DEFAULT VALUES"
            } else {
                " () VALUES ()"
            });
            return out.finish();
        }
        out.text.push_str(" (");
        for (i, field) in changes.fields().enumerate() {
            if i > 0 {
                out.text.push_str(", ");
            }
            out.text.push_str(&self.config.escape_ident(field));
        }
        out.text.push_str(") VALUES (");
        for (i, (_, value)) in changes.iter().enumerate() {
            if i > 0 {
                out.text.push_str(", ");
            }
            self.push_placeholder(&mut out, value.clone());
        }
        out.text.push(')');
        out.finish()
    }

    fn insert_all(&self, collection: &str, fields: &[String], changesets: &[Changes]) -> Statement {
        let mut out = Fragment::new();
        out.text.push_str("INSERT INTO ");
        out.text.push_str(&self.config.escape_ident(collection));
        out.text.push_str(" (");
        self.write_field_list(fields, &mut out.text);
        out.text.push_str(") VALUES ");
        for (row, changes) in changesets.iter().enumerate() {
            if row > 0 {
                out.text.push_str(", ");
            }
            out.text.push('(');
            for (i, field) in fields.iter().enumerate() {
                if i > 0 {
                    out.text.push_str(", ");
                }
                match changes.get(field) {
                    Some(value) => self.push_placeholder(&mut out, value.clone()),
                    None => out.text.push_str("DEFAULT"),
                }
            }
            out.text.push(')');
        }
        out.finish()
    }

    fn update(&self, collection: &str, changes: &Changes, filter: &Filter) -> Statement {
        let mut out = Fragment::new();
        out.text.push_str("UPDATE ");
        out.text.push_str(&self.config.escape_ident(collection));
        out.text.push_str(" SET ");
        for (i, (field, value)) in changes.iter().enumerate() {
            if i > 0 {
                out.text.push_str(", ");
            }
            out.text.push_str(&self.config.escape_ident(field));
            out.text.push_str(" = ");
            self.push_placeholder(&mut out, value.clone());
        }
        self.write_where(Some(filter), &mut out);
        out.finish()
    }

    fn delete(&self, collection: &str, filter: &Filter) -> Statement {
        let mut out = Fragment::new();
        out.text.push_str("DELETE FROM ");
        out.text.push_str(&self.config.escape_ident(collection));
        self.write_where(Some(filter), &mut out);
        out.finish()
    }
}
