// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Time-series point model and line protocol rendering.
//!
//! A [`Point`] is one (measurement, tags, timestamp, fields) record. The
//! engine fetches points from the local store as JSON rows, ships them to
//! the remote store in line protocol, and writes a status-marked copy back
//! to the local store.
//!
//! # Line Protocol
//!
//! The write format is one line per point:
//!
//! ```text
//! measurement,tag_key=tag_value field_key=field_value[,field2=...] timestamp
//! ```
//!
//! Escaping follows the store's v1 rules: measurements escape commas and
//! spaces; tag keys, tag values, and field keys additionally escape equals
//! signs; string field values are double-quoted with `"` and `\` escaped.
//! Tags render sorted by key so a point's line form is deterministic.
//!
//! # Status Field
//!
//! The reserved field [`STATUS_FIELD`] marks replication state: `0` is
//! pending, `1` is replicated. [`Point::mark_replicated`] performs the
//! transition and coerces every field to floating point so the marked
//! rewrite stays homogeneous with the store's column types.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Reserved field carrying replication state (0 pending, 1 replicated).
pub const STATUS_FIELD: &str = "status";

/// Timestamp precision on the wire.
///
/// The engine uses millisecond precision for every query and write; the
/// enum keeps that contract explicit at call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    Milliseconds,
}

impl Precision {
    /// Wire form used in query/write request parameters.
    pub fn as_str(&self) -> &'static str {
        match self {
            Precision::Milliseconds => "ms",
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One field value, mirroring the wire protocol's value kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Float(f64),
    Integer(i64),
    Boolean(bool),
    Text(String),
}

impl FieldValue {
    /// Decode a JSON query-result value.
    ///
    /// Returns `None` for nulls (a row that lacks the column) and for
    /// shapes the protocol never produces (arrays, objects).
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(FieldValue::Integer(i))
                } else {
                    n.as_f64().map(FieldValue::Float)
                }
            }
            Value::Bool(b) => Some(FieldValue::Boolean(*b)),
            Value::String(s) => Some(FieldValue::Text(s.clone())),
            Value::Null => None,
            _ => None,
        }
    }

    /// Coerce to floating point for the status-marked rewrite.
    ///
    /// Integers and booleans convert numerically; text converts when it
    /// parses as a decimal number and is left unchanged otherwise.
    pub fn to_float(&self) -> FieldValue {
        match self {
            FieldValue::Float(f) => FieldValue::Float(*f),
            FieldValue::Integer(i) => FieldValue::Float(*i as f64),
            FieldValue::Boolean(b) => FieldValue::Float(if *b { 1.0 } else { 0.0 }),
            FieldValue::Text(s) => match s.trim().parse::<f64>() {
                Ok(f) => FieldValue::Float(f),
                Err(_) => FieldValue::Text(s.clone()),
            },
        }
    }

    /// Render into a line protocol field value.
    fn render(&self, out: &mut String) {
        match self {
            // Bare numbers are floats in line protocol; integers carry `i`.
            FieldValue::Float(f) => out.push_str(&f.to_string()),
            FieldValue::Integer(i) => {
                out.push_str(&i.to_string());
                out.push('i');
            }
            FieldValue::Boolean(b) => out.push_str(if *b { "true" } else { "false" }),
            FieldValue::Text(s) => {
                out.push('"');
                for c in s.chars() {
                    if c == '"' || c == '\\' {
                        out.push('\\');
                    }
                    out.push(c);
                }
                out.push('"');
            }
        }
    }
}

/// One time-series record.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    /// Measurement the point belongs to
    pub measurement: String,
    /// Tag set identifying the series (may be empty)
    pub tags: BTreeMap<String, String>,
    /// Epoch timestamp in the engine's wire precision (milliseconds)
    pub timestamp: i64,
    /// Field name to value
    pub fields: BTreeMap<String, FieldValue>,
}

impl Point {
    /// Transition this point to the replicated state.
    ///
    /// Coerces every field to floating point, then sets the status field
    /// to `1.0` (inserting or overwriting). Called only after the remote
    /// write for the containing batch was confirmed successful.
    pub fn mark_replicated(&mut self) {
        for value in self.fields.values_mut() {
            *value = value.to_float();
        }
        self.fields
            .insert(STATUS_FIELD.to_string(), FieldValue::Float(1.0));
    }

    /// Render this point as one line of line protocol.
    pub fn render_line(&self, out: &mut String) {
        escape_measurement(&self.measurement, out);
        for (key, value) in &self.tags {
            out.push(',');
            escape_tag(key, out);
            out.push('=');
            escape_tag(value, out);
        }
        out.push(' ');
        let mut first = true;
        for (key, value) in &self.fields {
            if !first {
                out.push(',');
            }
            first = false;
            escape_tag(key, out);
            out.push('=');
            value.render(out);
        }
        out.push(' ');
        out.push_str(&self.timestamp.to_string());
    }
}

/// An ordered group of points processed together for one upload.
pub type Batch = Vec<Point>;

/// Render a batch as a line protocol request body.
pub fn render_lines(batch: &[Point]) -> String {
    let mut out = String::new();
    for (i, point) in batch.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        point.render_line(&mut out);
    }
    out
}

fn escape_measurement(s: &str, out: &mut String) {
    for c in s.chars() {
        if c == ',' || c == ' ' {
            out.push('\\');
        }
        out.push(c);
    }
}

fn escape_tag(s: &str, out: &mut String) {
    for c in s.chars() {
        if c == ',' || c == '=' || c == ' ' {
            out.push('\\');
        }
        out.push(c);
    }
}
