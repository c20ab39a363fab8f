//! Mock store for engine tests.
//!
//! An in-memory store with real upsert semantics and just enough
//! statement interpretation to execute what the fetcher produces:
//!
//! ```text
//! SELECT "f1","f2" FROM "m" WHERE "status"=0 AND "tag"='v' LIMIT n
//! ```
//!
//! Query results come back time-ascending, like the real store.
//! Failure injection covers pings and writes; every operation lands
//! in an ordered op log so tests can assert cross-call ordering.
//!
//! The interpreter handles the fetcher's statement shape only; field
//! and tag names containing `=`, `" AND "`, or backslashes are out of
//! scope.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use uplink::point::{Batch, FieldValue, Point, Precision};
use uplink::store::{BoxFuture, QueryRow, TimeSeriesStore};
use uplink::{ReplicationError, Result};

/// One recorded store operation, in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreOp {
    Ping { ok: bool },
    Query,
    Write { points: usize },
    Close,
}

/// In-memory [`TimeSeriesStore`] with upsert and status filtering.
pub struct MockStore {
    version: String,
    points: Mutex<Vec<Point>>,
    ops: Mutex<Vec<StoreOp>>,
    write_log: Mutex<Vec<Batch>>,
    failing_pings: AtomicUsize,
    failing_queries: AtomicUsize,
    writes_before_failure: AtomicUsize,
    closes: AtomicUsize,
}

impl MockStore {
    pub fn new() -> Self {
        Self {
            version: "mock-1.8".to_string(),
            points: Mutex::new(Vec::new()),
            ops: Mutex::new(Vec::new()),
            write_log: Mutex::new(Vec::new()),
            failing_pings: AtomicUsize::new(0),
            failing_queries: AtomicUsize::new(0),
            writes_before_failure: AtomicUsize::new(usize::MAX),
            closes: AtomicUsize::new(0),
        }
    }

    pub fn with_points(points: Vec<Point>) -> Self {
        let store = Self::new();
        *store.points.lock().unwrap() = points;
        store
    }

    /// Make the next `n` pings fail with a connectivity error.
    pub fn fail_pings(&self, n: usize) {
        self.failing_pings.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` queries fail with a query error.
    #[allow(dead_code)]
    pub fn fail_queries(&self, n: usize) {
        self.failing_queries.store(n, Ordering::SeqCst);
    }

    /// Let `n` more writes succeed, then reject every following one.
    pub fn fail_writes_after(&self, n: usize) {
        self.writes_before_failure.store(n, Ordering::SeqCst);
    }

    /// Lift a previous write failure injection.
    #[allow(dead_code)]
    pub fn heal_writes(&self) {
        self.writes_before_failure.store(usize::MAX, Ordering::SeqCst);
    }

    /// Snapshot of all stored points.
    pub fn points(&self) -> Vec<Point> {
        self.points.lock().unwrap().clone()
    }

    /// Every operation in call order.
    #[allow(dead_code)]
    pub fn ops(&self) -> Vec<StoreOp> {
        self.ops.lock().unwrap().clone()
    }

    /// Every batch handed to `write_points`, accepted or not.
    pub fn writes(&self) -> Vec<Batch> {
        self.write_log.lock().unwrap().clone()
    }

    #[allow(dead_code)]
    pub fn write_count(&self) -> usize {
        self.write_log.lock().unwrap().len()
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Find a stored point by measurement and timestamp.
    #[allow(dead_code)]
    pub fn find(&self, measurement: &str, timestamp: i64) -> Option<Point> {
        self.points
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.measurement == measurement && p.timestamp == timestamp)
            .cloned()
    }

    fn log(&self, op: StoreOp) {
        self.ops.lock().unwrap().push(op);
    }
}

impl Default for MockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSeriesStore for MockStore {
    fn ping(&self) -> BoxFuture<'_, String> {
        let remaining = self.failing_pings.load(Ordering::SeqCst);
        let result = if remaining > 0 {
            self.failing_pings.store(remaining - 1, Ordering::SeqCst);
            self.log(StoreOp::Ping { ok: false });
            Err(ReplicationError::connectivity_msg(
                "mock:8086",
                "connection refused",
            ))
        } else {
            self.log(StoreOp::Ping { ok: true });
            Ok(self.version.clone())
        };
        Box::pin(async move { result })
    }

    fn query(&self, statement: &str, _precision: Precision) -> BoxFuture<'_, Vec<QueryRow>> {
        self.log(StoreOp::Query);
        let remaining = self.failing_queries.load(Ordering::SeqCst);
        let result = if remaining > 0 {
            self.failing_queries.store(remaining - 1, Ordering::SeqCst);
            Err(ReplicationError::query(statement, "injected query failure"))
        } else {
            execute_select(statement, &self.points.lock().unwrap())
        };
        Box::pin(async move { result })
    }

    fn write_points(&self, batch: &[Point], _precision: Precision) -> BoxFuture<'_, ()> {
        self.log(StoreOp::Write {
            points: batch.len(),
        });
        self.write_log.lock().unwrap().push(batch.to_vec());

        let allowed = self.writes_before_failure.load(Ordering::SeqCst);
        let result = if allowed == 0 {
            Err(ReplicationError::write("mock:8086", "write rejected"))
        } else {
            if allowed != usize::MAX {
                self.writes_before_failure.store(allowed - 1, Ordering::SeqCst);
            }
            let mut points = self.points.lock().unwrap();
            for incoming in batch {
                upsert(&mut points, incoming.clone());
            }
            Ok(())
        };
        Box::pin(async move { result })
    }

    fn close(&self) {
        self.log(StoreOp::Close);
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Insert or merge by the store's (measurement, tags, timestamp)
/// identity. A write to an existing identity merges fields, keeping
/// any the incoming point does not carry.
fn upsert(points: &mut Vec<Point>, incoming: Point) {
    if let Some(existing) = points.iter_mut().find(|p| {
        p.measurement == incoming.measurement
            && p.tags == incoming.tags
            && p.timestamp == incoming.timestamp
    }) {
        existing.fields.extend(incoming.fields);
    } else {
        points.push(incoming);
    }
}

// =============================================================================
// Statement interpretation
// =============================================================================

struct ParsedSelect {
    fields: Vec<String>,
    measurement: String,
    predicates: Vec<(String, PredicateValue)>,
    limit: Option<usize>,
}

enum PredicateValue {
    Int(i64),
    Str(String),
}

fn execute_select(statement: &str, points: &[Point]) -> Result<Vec<QueryRow>> {
    let parsed = parse_select(statement)
        .ok_or_else(|| ReplicationError::query(statement, "unsupported statement"))?;

    let mut matching: Vec<&Point> = points
        .iter()
        .filter(|p| p.measurement == parsed.measurement)
        .filter(|p| {
            parsed
                .predicates
                .iter()
                .all(|(key, value)| predicate_matches(p, key, value))
        })
        .collect();
    matching.sort_by_key(|p| p.timestamp);
    if let Some(limit) = parsed.limit {
        matching.truncate(limit);
    }

    Ok(matching
        .into_iter()
        .map(|p| {
            let mut values = BTreeMap::new();
            for field in &parsed.fields {
                if let Some(value) = p.fields.get(field) {
                    values.insert(field.clone(), value.clone());
                }
            }
            QueryRow {
                timestamp: p.timestamp,
                values,
            }
        })
        .collect())
}

fn predicate_matches(point: &Point, key: &str, value: &PredicateValue) -> bool {
    match value {
        PredicateValue::Str(expected) => point.tags.get(key) == Some(expected),
        PredicateValue::Int(expected) => match point.fields.get(key) {
            Some(FieldValue::Integer(i)) => i == expected,
            Some(FieldValue::Float(f)) => *f == *expected as f64,
            _ => false,
        },
    }
}

fn parse_select(statement: &str) -> Option<ParsedSelect> {
    let rest = statement.strip_prefix("SELECT ")?;
    let (fields_part, rest) = rest.split_once(" FROM ")?;
    let fields = fields_part
        .split(',')
        .map(unquote_identifier)
        .collect::<Option<Vec<_>>>()?;

    let (measurement_part, predicates, limit) = if let Some((m, tail)) = rest.split_once(" WHERE ")
    {
        let (predicates_part, limit) = match tail.split_once(" LIMIT ") {
            Some((p, l)) => (p, Some(l.parse().ok()?)),
            None => (tail, None),
        };
        let predicates = predicates_part
            .split(" AND ")
            .map(parse_predicate)
            .collect::<Option<Vec<_>>>()?;
        (m, predicates, limit)
    } else if let Some((m, l)) = rest.split_once(" LIMIT ") {
        (m, Vec::new(), Some(l.parse().ok()?))
    } else {
        (rest, Vec::new(), None)
    };

    Some(ParsedSelect {
        fields,
        measurement: unquote_identifier(measurement_part)?,
        predicates,
        limit,
    })
}

fn parse_predicate(raw: &str) -> Option<(String, PredicateValue)> {
    let (key_part, value_part) = raw.split_once('=')?;
    let key = unquote_identifier(key_part)?;
    let value = if let Some(inner) = value_part.strip_prefix('\'') {
        let inner = inner.strip_suffix('\'')?;
        PredicateValue::Str(inner.replace("\\'", "'"))
    } else {
        PredicateValue::Int(value_part.parse().ok()?)
    };
    Some((key, value))
}

fn unquote_identifier(raw: &str) -> Option<String> {
    let inner = raw.strip_prefix('"')?.strip_suffix('"')?;
    Some(inner.replace("\\\"", "\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(timestamp: i64, room: &str, status: i64) -> Point {
        let mut tags = BTreeMap::new();
        tags.insert("room".to_string(), room.to_string());
        let mut fields = BTreeMap::new();
        fields.insert("value".to_string(), FieldValue::Float(20.0));
        fields.insert("status".to_string(), FieldValue::Integer(status));
        Point {
            measurement: "temp".to_string(),
            tags,
            timestamp,
            fields,
        }
    }

    #[tokio::test]
    async fn mock_filters_status_tags_and_limit() {
        let store = MockStore::with_points(vec![
            point(3, "a", 0),
            point(1, "a", 0),
            point(2, "a", 1),
            point(4, "b", 0),
        ]);

        let rows = store
            .query(
                r#"SELECT "value" FROM "temp" WHERE "status"=0 AND "room"='a' LIMIT 10"#,
                Precision::Milliseconds,
            )
            .await
            .unwrap();

        // marked and other-room points excluded, remainder time-ascending
        let timestamps: Vec<i64> = rows.iter().map(|r| r.timestamp).collect();
        assert_eq!(timestamps, vec![1, 3]);
        assert!(rows[0].values.contains_key("value"));
        assert!(!rows[0].values.contains_key("status"));
    }

    #[tokio::test]
    async fn mock_upsert_merges_fields() {
        let store = MockStore::with_points(vec![point(1, "a", 0)]);

        let mut update = point(1, "a", 0);
        update.fields = BTreeMap::from([
            ("value".to_string(), FieldValue::Float(25.0)),
            ("status".to_string(), FieldValue::Float(1.0)),
        ]);
        store
            .write_points(&[update], Precision::Milliseconds)
            .await
            .unwrap();

        let stored = store.find("temp", 1).unwrap();
        assert_eq!(stored.fields.get("value"), Some(&FieldValue::Float(25.0)));
        assert_eq!(stored.fields.get("status"), Some(&FieldValue::Float(1.0)));
        assert_eq!(store.points().len(), 1);
    }

    #[tokio::test]
    async fn mock_matches_float_status_against_int_predicate() {
        let mut p = point(1, "a", 0);
        p.fields
            .insert("status".to_string(), FieldValue::Float(0.0));
        let store = MockStore::with_points(vec![p]);

        let rows = store
            .query(
                r#"SELECT "value" FROM "temp" WHERE "status"=0 LIMIT 5"#,
                Precision::Milliseconds,
            )
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn mock_rejects_garbage_statement() {
        let store = MockStore::new();
        let err = store
            .query("DROP SERIES", Precision::Milliseconds)
            .await
            .unwrap_err();
        assert!(matches!(err, ReplicationError::Query { .. }));
    }
}
