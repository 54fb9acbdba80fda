//! End-to-end scenarios against the public `decode`/`encode`/JSON surface.

use viewstate_codec::{decode, Value};

#[test]
fn test_s1_sample_payload_decodes() {
    let input = "/wEPDwUKMTY4NzY1NDk4MQ9kFgICAw9kFgQCAQ8PFgIeBFRleHQFDkhlbGxvLCBXb3JsZCFkZAIDDxYCHgdWaXNpYmxlaGRkw/bVgS8vVUn8xrZU4gTKfzUDhEU=";
    let result = decode(input).expect("sample payload should decode");

    assert!(contains_text(&result.value, "Hello, World!"));
    assert!(contains_text(&result.value, "Visible"));
    assert!(result.stats.strings >= 3);
}

fn contains_text(value: &Value, needle: &str) -> bool {
    match value {
        Value::Text(s) => s == needle,
        Value::Pair(a, b) => contains_text(a, needle) || contains_text(b, needle),
        Value::Triplet(a, b, c) => {
            contains_text(a, needle) || contains_text(b, needle) || contains_text(c, needle)
        }
        Value::List(items) => items.iter().any(|v| contains_text(v, needle)),
        Value::Map(entries) => entries.iter().any(|(_, v)| contains_text(v, needle)),
        _ => false,
    }
}
