//! Fuzz target for fetch statement construction.
//!
//! This tests that quoting and the statement builder never panic on
//! arbitrary names, and that hostile input cannot terminate a quoted
//! section early.

#![no_main]

use libfuzzer_sys::fuzz_target;
use uplink::query::{quote_identifier, quote_literal, SelectBuilder};

/// Count `target` occurrences that are not backslash-escaped.
fn unescaped_count(s: &str, target: char) -> usize {
    let mut count = 0;
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            chars.next();
        } else if c == target {
            count += 1;
        }
    }
    count
}

fuzz_target!(|data: (&str, &str, &str)| {
    let (measurement, field, tag_value) = data;

    let quoted = quote_identifier(measurement);
    assert_eq!(unescaped_count(&quoted, '"'), 2);

    let literal = quote_literal(tag_value);
    assert_eq!(unescaped_count(&literal, '\''), 2);

    // Building a full statement should never panic
    let statement = SelectBuilder::from_measurement(measurement)
        .field(field)
        .and_field_eq("status", 0)
        .and_tag_eq("room", tag_value)
        .limit(100)
        .build();
    assert!(statement.starts_with("SELECT "));
    assert!(statement.ends_with(" LIMIT 100"));
});
