//! Fetch query construction.
//!
//! The fetch statement selects a source's field list from its measurement,
//! filtered to unreplicated points and the source's tag set:
//!
//! ```text
//! SELECT "f1","f2" FROM "m" WHERE "status"=0 AND "k"='v' LIMIT n
//! ```
//!
//! All names pass through [`quote_identifier`] and all tag values through
//! [`quote_literal`], so a value containing quote characters cannot
//! terminate the statement early. The wire protocol has no bound
//! parameters; escaping is the injection boundary.

use std::fmt::Write;

/// Quote a measurement or field/tag name as a double-quoted identifier.
///
/// Embedded `"` and `\` are backslash-escaped.
pub fn quote_identifier(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    out.push('"');
    for c in name.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Quote a tag value as a single-quoted string literal.
///
/// Embedded `'` and `\` are backslash-escaped.
pub fn quote_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        if c == '\'' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('\'');
    out
}

/// Builder for the engine's SELECT statements.
///
/// Predicates are joined with `AND` in insertion order; rendering is
/// deterministic for a given input order.
#[derive(Debug, Clone)]
pub struct SelectBuilder {
    measurement: String,
    fields: Vec<String>,
    predicates: Vec<String>,
    limit: Option<usize>,
}

impl SelectBuilder {
    /// Start a SELECT from the given measurement.
    pub fn from_measurement(measurement: &str) -> Self {
        Self {
            measurement: quote_identifier(measurement),
            fields: Vec::new(),
            predicates: Vec::new(),
            limit: None,
        }
    }

    /// Add one selected field.
    pub fn field(mut self, name: &str) -> Self {
        self.fields.push(quote_identifier(name));
        self
    }

    /// Add selected fields, preserving their order.
    pub fn fields<'a, I: IntoIterator<Item = &'a str>>(mut self, names: I) -> Self {
        for name in names {
            self.fields.push(quote_identifier(name));
        }
        self
    }

    /// Constrain a field to a bare numeric literal (`"name"=0`).
    pub fn and_field_eq(mut self, name: &str, value: i64) -> Self {
        self.predicates
            .push(format!("{}={}", quote_identifier(name), value));
        self
    }

    /// Constrain a tag to a string literal (`"key"='value'`).
    pub fn and_tag_eq(mut self, key: &str, value: &str) -> Self {
        self.predicates
            .push(format!("{}={}", quote_identifier(key), quote_literal(value)));
        self
    }

    /// Cap the result count.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Render the statement.
    pub fn build(&self) -> String {
        let mut out = String::new();
        out.push_str("SELECT ");
        out.push_str(&self.fields.join(","));
        out.push_str(" FROM ");
        out.push_str(&self.measurement);
        if !self.predicates.is_empty() {
            out.push_str(" WHERE ");
            out.push_str(&self.predicates.join(" AND "));
        }
        if let Some(limit) = self.limit {
            let _ = write!(out, " LIMIT {}", limit);
        }
        out
    }
}
