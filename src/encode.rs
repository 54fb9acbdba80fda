//
// Copyright 2020 bplist Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! The encoder (`SPEC_FULL.md` §4.10): the mirror image of `de`, dispatching on the
//! variant of a `Value` rather than a wire tag byte.
//!
//! This crate resolves the historical encoder/decoder tag collision by emitting the
//! decoder's own `0x0F`/`0x10`/`0x14` for Pair/Triplet/List (see `DESIGN.md`), rather than
//! the colliding `0x68`/`0x69`/`0x6A` the un-corrected encoder used.

use crate::b64;
use crate::de::parser::varint::write_varint;
use crate::error::Result;
use crate::tags::Tag;
use crate::value::Value;

/// Top-level entry point (`SPEC_FULL.md` §6 `encode`): frames, serializes, and
/// Base64-encodes `value`.
pub fn encode(value: &Value) -> Result<String> {
    let mut out = vec![crate::tags::FRAME_MARKER, 0x01];
    encode_value(value, &mut out);
    tracing::debug!(size = out.len(), "encoded ViewState payload");
    Ok(b64::encode_output(&out))
}

fn encode_value(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Null => out.push(Tag::NullConstant.to_byte()),
        Value::Bool(true) => out.push(Tag::BoolTrueConstant.to_byte()),
        Value::Bool(false) => out.push(Tag::BoolFalseConstant.to_byte()),
        Value::Byte(b) => {
            out.push(Tag::Byte.to_byte());
            out.push(*b);
        }
        Value::Int16(i) => {
            out.push(Tag::Int16.to_byte());
            out.extend_from_slice(&i.to_le_bytes());
        }
        Value::Int32(i) => encode_int32(*i, out),
        Value::Float32(f) => {
            out.push(Tag::Float32.to_byte());
            out.extend_from_slice(&f.to_le_bytes());
        }
        Value::Float64(f) => {
            out.push(Tag::Float64.to_byte());
            out.extend_from_slice(&f.to_le_bytes());
        }
        Value::Char(c) => {
            out.push(Tag::Char.to_byte());
            out.push(*c as u8);
        }
        Value::Text(s) => encode_text(s, out),
        Value::DateTime(ticks) => {
            out.push(Tag::DateTime.to_byte());
            out.extend_from_slice(&ticks.to_le_bytes());
        }
        Value::Color(color) => {
            out.push(Tag::Color.to_byte());
            out.extend(write_varint(color.to_packed() as u64));
        }
        Value::Unit(magnitude, kind) => {
            out.push(Tag::Unit.to_byte());
            out.extend_from_slice(&magnitude.0.to_le_bytes());
            out.extend(write_varint(kind.to_wire()));
        }
        Value::Pair(first, second) => {
            out.push(Tag::Pair.to_byte());
            encode_value(first, out);
            encode_value(second, out);
        }
        Value::Triplet(first, second, third) => {
            out.push(Tag::Triplet.to_byte());
            encode_value(first, out);
            encode_value(second, out);
            encode_value(third, out);
        }
        Value::List(items) => {
            out.push(Tag::List.to_byte());
            out.extend(write_varint(items.len() as u64));
            for item in items {
                encode_value(item, out);
            }
        }
        Value::SparseList { length, entries } => {
            out.push(Tag::SparseList.to_byte());
            out.extend(write_varint(*length as u64));
            out.extend(write_varint(entries.len() as u64));
            for (index, value) in entries {
                out.extend(write_varint(*index as u64));
                encode_value(value, out);
            }
        }
        Value::Map(entries) => {
            out.push(Tag::HashtableMap.to_byte());
            out.extend(write_varint(entries.len() as u64));
            for (key, value) in entries {
                encode_text(key, out);
                encode_value(value, out);
            }
        }
        Value::TypeRef(name) => {
            out.push(Tag::TypeRef.to_byte());
            encode_string_body(name, out);
        }
        Value::KnownTypeRef(index) => {
            out.push(Tag::KnownTypeRef.to_byte());
            out.extend(write_varint(*index as u64));
        }
        Value::StringRef(index) => {
            out.push(Tag::StringRef.to_byte());
            out.extend(write_varint(*index as u64));
        }
        Value::TypedArray(type_index, items) => {
            out.push(Tag::TypedArray.to_byte());
            out.extend(write_varint(*type_index as u64));
            out.extend(write_varint(items.len() as u64));
            for item in items {
                encode_value(item, out);
            }
        }
        Value::Opaque(opaque) => {
            out.push(Tag::Opaque29.to_byte());
            out.extend(write_varint(opaque.declared_length as u64));
            out.extend_from_slice(&opaque.bytes);
        }
        Value::Unknown(tag, _) => {
            // No recorded body; re-emitting the bare tag is the documented lossy path.
            out.push(*tag);
        }
    }
}

fn encode_int32(i: i32, out: &mut Vec<u8>) {
    if i == 0 {
        out.push(Tag::Int32ZeroConstant.to_byte());
    } else if (0..=255).contains(&i) {
        out.push(Tag::Byte.to_byte());
        out.push(i as u8);
    } else {
        out.push(Tag::Int32.to_byte());
        out.extend(write_varint(i as u32 as u64));
    }
}

fn encode_text(s: &str, out: &mut Vec<u8>) {
    if s.is_empty() {
        out.push(Tag::EmptyStringConstant.to_byte());
    } else {
        out.push(Tag::Text.to_byte());
        encode_string_body(s, out);
    }
}

fn encode_string_body(s: &str, out: &mut Vec<u8>) {
    let bytes = s.as_bytes();
    out.extend(write_varint(bytes.len() as u64));
    out.extend_from_slice(bytes);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::de::decode;

    fn round_trip(value: Value) -> Value {
        let encoded = encode(&value).unwrap();
        decode(&encoded).unwrap().value
    }

    #[test]
    fn test_null_round_trips() {
        assert_eq!(round_trip(Value::Null), Value::Null);
    }

    #[test]
    fn test_bool_round_trips() {
        assert_eq!(round_trip(Value::Bool(true)), Value::Bool(true));
        assert_eq!(round_trip(Value::Bool(false)), Value::Bool(false));
    }

    #[test]
    fn test_small_int32_collapses_to_byte() {
        assert_eq!(round_trip(Value::Int32(42)), Value::Byte(42));
    }

    #[test]
    fn test_large_int32_round_trips() {
        assert_eq!(round_trip(Value::Int32(70_000)), Value::Int32(70_000));
    }

    #[test]
    fn test_text_round_trips() {
        assert_eq!(
            round_trip(Value::Text("Hello, World!".to_string())),
            Value::Text("Hello, World!".to_string())
        );
    }

    #[test]
    fn test_empty_text_round_trips() {
        assert_eq!(round_trip(Value::empty_text()), Value::empty_text());
    }

    #[test]
    fn test_list_round_trips() {
        let value = Value::List(vec![Value::Byte(1), Value::Text("x".to_string())]);
        assert_eq!(round_trip(value.clone()), value);
    }

    #[test]
    fn test_map_round_trips_preserving_order() {
        let value = Value::Map(vec![
            ("a".to_string(), Value::Byte(1)),
            ("b".to_string(), Value::Byte(2)),
        ]);
        assert_eq!(round_trip(value.clone()), value);
    }

    #[test]
    fn test_pair_round_trips_with_corrected_mapping() {
        let value = Value::Pair(Box::new(Value::Byte(1)), Box::new(Value::Byte(2)));
        assert_eq!(round_trip(value.clone()), value);
    }

    #[test]
    fn test_s8_editor_round_trip() {
        let value = Value::Pair(
            Box::new(Value::Text("x".to_string())),
            Box::new(Value::List(vec![
                Value::Text("y".to_string()),
                Value::Text("z".to_string()),
            ])),
        );
        let round_tripped = round_trip(value);
        match round_tripped {
            Value::Pair(first, second) => {
                assert_eq!(*first, Value::Text("x".to_string()));
                assert_eq!(
                    *second,
                    Value::List(vec![
                        Value::Text("y".to_string()),
                        Value::Text("z".to_string())
                    ])
                );
            }
            other => panic!("expected a Pair, got {:?}", other),
        }
    }
}
