//! Fuzz target for line protocol rendering.
//!
//! This tests that rendering never panics and that escaping keeps the
//! three-section line shape for arbitrary names and text values.

#![no_main]

use libfuzzer_sys::fuzz_target;
use std::collections::BTreeMap;
use uplink::point::{FieldValue, Point};

/// Count section separators: unescaped spaces outside quoted strings.
fn section_spaces(line: &str) -> usize {
    let mut count = 0;
    let mut in_quotes = false;
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ' ' if !in_quotes => count += 1,
            _ => {}
        }
    }
    count
}

fuzz_target!(|data: (&str, &str, &str, i64, &str)| {
    let (measurement, tag_key, tag_value, timestamp, text) = data;
    if measurement.is_empty() || tag_key.is_empty() {
        return;
    }

    let mut tags = BTreeMap::new();
    tags.insert(tag_key.to_string(), tag_value.to_string());
    let mut fields = BTreeMap::new();
    fields.insert("value".to_string(), FieldValue::Text(text.to_string()));
    let point = Point {
        measurement: measurement.to_string(),
        tags,
        timestamp,
        fields,
    };

    let mut line = String::new();
    point.render_line(&mut line);

    assert_eq!(section_spaces(&line), 2);
    assert!(line.ends_with(&timestamp.to_string()));
});
