//! Fuzz target for field value decoding and coercion.
//!
//! This tests that JSON values from query responses decode without
//! panics, and that float coercion is total over whatever decodes.

#![no_main]

use libfuzzer_sys::fuzz_target;
use uplink::point::FieldValue;

fuzz_target!(|data: &[u8]| {
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };

    // Should never panic, whatever the JSON shape
    if let Some(field) = FieldValue::from_json(&value) {
        let coerced = field.to_float();
        assert!(matches!(
            coerced,
            FieldValue::Float(_) | FieldValue::Text(_)
        ));
        // A second coercion is a no-op on the variant
        assert!(matches!(
            coerced.to_float(),
            FieldValue::Float(_) | FieldValue::Text(_)
        ));
    }
});
