//! Property-based invariants from `SPEC_FULL.md` §8 (P1-P4), exercised through the
//! crate's public surface plus the `de::parser` primitives it re-exports.

use proptest::prelude::*;

use viewstate_codec::de::parser::varint::{read_varint, write_varint};
use viewstate_codec::{decode, encode, Value};

proptest! {
    // P1: varint round-trip for n < 2^35, consuming exactly the octets written.
    #[test]
    fn p1_varint_round_trips(n in 0u64..(1u64 << 35)) {
        let bytes = write_varint(n);
        let (value, consumed) = read_varint(&bytes);
        prop_assert_eq!(value, n);
        prop_assert_eq!(consumed, bytes.len());
    }

    // P2: Text round-trip through the full encode/decode pipeline.
    #[test]
    fn p2_text_round_trips(s in "\\PC*") {
        let encoded = encode(&Value::Text(s.clone())).unwrap();
        let decoded = decode(&encoded).unwrap();
        prop_assert_eq!(decoded.value, Value::Text(s));
    }

    // P3: cursor safety — decoding arbitrary framed octets never panics and always
    // yields either a value or one of the documented top-level errors.
    #[test]
    fn p3_cursor_never_panics_on_arbitrary_input(bytes in proptest::collection::vec(any::<u8>(), 0..512)) {
        let mut wire = vec![0xFFu8, 0x01];
        wire.extend(bytes);
        let text = base64_standard(&wire);
        let _ = decode(&text);
    }

    // P4: scalars, Text, List, and Map round-trip semantically through encode -> decode.
    // "Semantically equal" allows Int32 in [0,255] to come back as Byte, since the
    // encoder deliberately collapses small integers onto the more compact tag (§4.10).
    #[test]
    fn p4_scalar_semantic_round_trip(value in scalar_value_strategy()) {
        let encoded = encode(&value).unwrap();
        let decoded = decode(&encoded).unwrap();
        prop_assert!(semantically_equal(&decoded.value, &value));
    }
}

fn semantically_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Byte(x), Value::Int32(y)) | (Value::Int32(y), Value::Byte(x)) => *x as i32 == *y,
        (Value::List(xs), Value::List(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| semantically_equal(x, y))
        }
        (Value::Map(xs), Value::Map(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .zip(ys)
                    .all(|((xk, xv), (yk, yv))| xk == yk && semantically_equal(xv, yv))
        }
        _ => a == b,
    }
}

fn base64_standard(bytes: &[u8]) -> String {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    STANDARD.encode(bytes)
}

fn scalar_value_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        (0i32..(1i32 << 31)).prop_map(Value::Int32),
        "\\PC{0,16}".prop_map(Value::Text),
    ];
    leaf.prop_recursive(3, 32, 8, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..6).prop_map(Value::List),
            proptest::collection::vec(("[a-z]{1,8}", inner), 0..6).prop_map(Value::Map),
        ]
    })
}
