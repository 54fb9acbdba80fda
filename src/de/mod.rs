//
// Copyright 2020 bplist Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! The structured ViewState parser (`SPEC_FULL.md` §4.1–§4.8, §4.12).
//!
//! Unlike bplist's offset-table-driven `serde::Deserializer`, a ViewState document has a
//! single concrete target type (`Value`), so this is a plain recursive-descent `Decoder`
//! rather than a generic `serde` deserializer: there is no `T: Deserialize` to forward to.

pub mod date;
pub mod parser;
pub mod recovery;
pub mod xml_extract;

use crate::b64;
use crate::error::{CodecError, Result};
use crate::de::parser::leaf;
use crate::de::parser::varint::read_varint;
use crate::stats::Stats;
use crate::tags::{Tag, FRAME_MARKER, MAX_COLLECTION_ENTRIES};
use crate::value::{Color, Opaque, UnitKind, Value};

/// The outcome of a successful top-level decode (`SPEC_FULL.md` §6).
#[derive(Clone, Debug, PartialEq)]
pub struct DecodeResult {
    pub value: Value,
    pub stats: Stats,
    pub raw_size: usize,
    /// Set when the value came back through the stream-level fallback extractor.
    pub note: Option<String>,
}

/// Recursive-descent reader over one ViewState payload.
///
/// Holds the per-call mutable state the value tree construction needs: the read
/// position, the two intern tables, and the running statistics (`SPEC_FULL.md` §4.1, §4.6,
/// §4.12). Not shared across decode calls; a fresh `Decoder` is built for every `decode`.
struct Decoder<'a> {
    input: &'a [u8],
    pos: usize,
    strings: Vec<String>,
    types: Vec<String>,
    stats: Stats,
}

impl<'a> Decoder<'a> {
    fn new(input: &'a [u8]) -> Self {
        Decoder {
            input,
            pos: 0,
            strings: Vec::new(),
            types: Vec::new(),
            stats: Stats::new(),
        }
    }

    fn remaining(&self) -> &'a [u8] {
        &self.input[self.pos.min(self.input.len())..]
    }

    fn peek_u8(&self) -> Option<u8> {
        self.remaining().first().copied()
    }

    fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.input.len());
    }

    /// Returns `0` on exhaustion rather than failing, per the lenient-cursor contract in §4.1.
    fn read_u8(&mut self) -> u8 {
        let byte = self.peek_u8().unwrap_or(0);
        self.advance(1);
        byte
    }

    fn read_varint(&mut self) -> u64 {
        let (value, consumed) = read_varint(self.remaining());
        self.advance(consumed);
        value
    }

    /// Runs a `nom` leaf parser against the remaining input and advances the cursor by
    /// however many bytes it consumed. Leaf parsers never fail on this crate's inputs
    /// (they clamp reads rather than erroring), so a parse error just yields the default.
    fn apply<T, F>(&mut self, parser: F) -> T
    where
        T: Default,
        F: Fn(&[u8]) -> nom::IResult<&[u8], T>,
    {
        let before = self.remaining();
        match parser(before) {
            Ok((residual, value)) => {
                self.advance(before.len() - residual.len());
                value
            }
            Err(_) => T::default(),
        }
    }

    /// Reads a declared element count, clamping per the collection policy in §4.4: a
    /// count over `MAX_COLLECTION_ENTRIES` yields `None` and the caller stops without
    /// reading any of the claimed elements.
    fn read_count_clamped(&mut self) -> Option<usize> {
        let count = self.read_varint() as usize;
        if count > MAX_COLLECTION_ENTRIES {
            None
        } else {
            Some(count)
        }
    }

    /// Reads one `Value` starting at the current cursor position (§4.4).
    fn decode_value(&mut self) -> Value {
        let offset = self.pos;
        let tag_byte = self.read_u8();

        match Tag::from_byte(tag_byte) {
            Some(tag) => self.decode_tagged(tag),
            None => recovery::recover_unknown_tag(self, tag_byte, offset),
        }
    }

    fn decode_tagged(&mut self, tag: Tag) -> Value {
        match tag {
            Tag::Int16 => {
                self.stats.integers += 1;
                Value::Int16(self.apply(leaf::int16))
            }
            Tag::Int32 => {
                self.stats.integers += 1;
                Value::Int32(self.read_varint() as i32)
            }
            Tag::Byte => {
                self.stats.integers += 1;
                Value::Byte(self.apply(leaf::byte))
            }
            Tag::Char => Value::Char(self.apply(leaf::character)),
            Tag::Text => {
                self.stats.strings += 1;
                Value::Text(self.apply(leaf::text))
            }
            Tag::DateTime => Value::DateTime(self.apply(leaf::date_ticks)),
            Tag::Float64 => Value::Float64(self.apply(leaf::float64)),
            Tag::Float32 => Value::Float32(self.apply(leaf::float32)),
            Tag::Color => Value::Color(Color::from_packed(self.apply(leaf::color_word))),
            Tag::Null => Value::Null,
            Tag::BoolTrue => {
                self.stats.booleans += 1;
                Value::Bool(true)
            }
            Tag::BoolFalse => {
                self.stats.booleans += 1;
                Value::Bool(false)
            }
            Tag::Pair => {
                self.stats.pairs += 1;
                let first = self.decode_value();
                let second = self.decode_value();
                Value::Pair(Box::new(first), Box::new(second))
            }
            Tag::Triplet => {
                self.stats.triplets += 1;
                let first = self.decode_value();
                let second = self.decode_value();
                let third = self.decode_value();
                Value::Triplet(Box::new(first), Box::new(second), Box::new(third))
            }
            Tag::List | Tag::StringTypedList | Tag::ArrayList => {
                self.stats.arrays += 1;
                Value::List(self.decode_n_values())
            }
            Tag::HashtableMap | Tag::HybridDictionaryMap => Value::Map(self.decode_map_entries()),
            Tag::TypeRef => {
                let name = self.apply(leaf::text);
                self.types.push(name.clone());
                Value::TypeRef(name)
            }
            Tag::Unit => {
                let magnitude = self.apply(leaf::float64);
                let kind = UnitKind::from_wire(self.read_varint());
                Value::Unit(ordered_float::OrderedFloat(magnitude), kind)
            }
            Tag::InternedText => {
                self.stats.strings += 1;
                let name = self.apply(leaf::text);
                self.strings.push(name.clone());
                Value::Text(name)
            }
            Tag::StringRef => {
                let index = self.read_varint() as usize;
                match self.strings.get(index) {
                    Some(s) => Value::Text(s.clone()),
                    None => Value::Text(format!("<StringRef:{}>", index)),
                }
            }
            Tag::SparseList => Value::List(self.decode_sparse_list()),
            Tag::Opaque29 | Tag::Opaque2A => {
                self.stats.opaque_objects += 1;
                Value::Opaque(self.decode_opaque())
            }
            Tag::TypedArray => {
                self.stats.arrays += 1;
                let type_index = self.read_varint() as usize;
                Value::TypedArray(type_index, self.decode_n_values())
            }
            Tag::KnownTypeRef => Value::KnownTypeRef(self.read_varint() as usize),
            Tag::NullConstant => Value::Null,
            Tag::EmptyStringConstant => {
                self.stats.strings += 1;
                Value::empty_text()
            }
            Tag::Int32ZeroConstant => {
                self.stats.integers += 1;
                Value::Int32(0)
            }
            Tag::BoolTrueConstant => {
                self.stats.booleans += 1;
                Value::Bool(true)
            }
            Tag::BoolFalseConstant => {
                self.stats.booleans += 1;
                Value::Bool(false)
            }
        }
    }

    /// Reads a clamped count followed by that many recursively-decoded values.
    fn decode_n_values(&mut self) -> Vec<Value> {
        match self.read_count_clamped() {
            Some(count) => (0..count).map(|_| self.decode_value()).collect(),
            None => Vec::new(),
        }
    }

    fn decode_map_entries(&mut self) -> Vec<(String, Value)> {
        match self.read_count_clamped() {
            Some(count) => (0..count)
                .map(|_| {
                    let key = self.decode_value();
                    let value = self.decode_value();
                    (Value::stringify_key(&key), value)
                })
                .collect(),
            None => Vec::new(),
        }
    }

    /// §4.4's `0x28`: varint length, varint count, then `count` (varint index, Value) pairs,
    /// materialized into a dense list with `Null` holes (see the invariant in `value::Value`).
    fn decode_sparse_list(&mut self) -> Vec<Value> {
        self.stats.arrays += 1;
        let length = self.read_varint() as usize;
        if length > MAX_COLLECTION_ENTRIES {
            return Vec::new();
        }

        let mut dense = vec![Value::Null; length];
        if let Some(count) = self.read_count_clamped() {
            for _ in 0..count {
                let index = self.read_varint() as usize;
                let value = self.decode_value();
                if index < length {
                    dense[index] = value;
                }
            }
        }
        dense
    }

    fn decode_opaque(&mut self) -> Opaque {
        let declared_length = self.read_varint() as usize;
        let available = self.remaining().len();
        let clamped = declared_length.min(available);
        let bytes = self.remaining()[..clamped].to_vec();
        self.advance(clamped);

        let extract = recovery::extract_opaque(&bytes);
        Opaque {
            declared_length,
            bytes,
            extract,
        }
    }
}

/// Top-level entry point (`SPEC_FULL.md` §6 `decode`).
///
/// Sanitizes and Base64-decodes `text`, applies the two-byte framing check (§4.5), and
/// parses a single `Value`. Falls back to the stream-level content extractor (§4.8) when
/// there is nothing at all to parse after framing; an empty or un-Base64-decodable input
/// fails outright rather than invoking the fallback, matching the §7 error table.
pub fn decode(text: &str) -> Result<DecodeResult> {
    let raw = b64::decode_input(text)?;
    if raw.is_empty() {
        return Err(CodecError::EmptyInput);
    }

    let payload = strip_framing(&raw);
    if payload.is_empty() {
        tracing::warn!("structured parse has nothing to read after framing, falling back");
        return fallback_or_fail(&raw);
    }

    let mut decoder = Decoder::new(payload);
    let value = decoder.decode_value();
    tracing::debug!(stats = ?decoder.stats, "decoded ViewState payload");

    Ok(DecodeResult {
        value,
        stats: decoder.stats,
        raw_size: raw.len(),
        note: None,
    })
}

/// §4.5: a leading `0xFF` is followed by a discarded version octet; otherwise the whole
/// buffer is the single value with no framing stripped.
fn strip_framing(raw: &[u8]) -> &[u8] {
    match raw.first() {
        Some(&FRAME_MARKER) if raw.len() >= 2 => &raw[2..],
        _ => raw,
    }
}

fn fallback_or_fail(raw: &[u8]) -> Result<DecodeResult> {
    let map = recovery::fallback_extract(raw);
    match map {
        Some(value) => Ok(DecodeResult {
            value,
            stats: Stats::new(),
            raw_size: raw.len(),
            note: Some("recovered via fallback content extraction".to_string()),
        }),
        None => Err(CodecError::MalformedStructure),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;

    fn b64_of(bytes: &[u8]) -> String {
        base64::engine::general_purpose::STANDARD.encode(bytes)
    }

    #[test]
    fn test_s2_framing_bool_true() {
        let result = decode(&b64_of(&[0xFF, 0x01, 0x67])).unwrap();
        assert_eq!(result.value, Value::Bool(true));
    }

    #[test]
    fn test_s3_null_canonicalization() {
        let a = decode(&b64_of(&[0xFF, 0x01, 0x0A])).unwrap();
        let b = decode(&b64_of(&[0xFF, 0x01, 0x64])).unwrap();
        assert_eq!(a.value, Value::Null);
        assert_eq!(b.value, Value::Null);
    }

    #[test]
    fn test_s4_map_preserves_order() {
        let wire = [
            0xFF, 0x01, 0x17, 0x02, 0x05, 0x01, b'a', 0x03, 0x07, 0x05, 0x01, b'b', 0x03, 0x09,
        ];
        let result = decode(&b64_of(&wire)).unwrap();
        assert_eq!(
            result.value,
            Value::Map(vec![
                ("a".to_string(), Value::Byte(7)),
                ("b".to_string(), Value::Byte(9)),
            ])
        );
    }

    #[test]
    fn test_s5_sparse_list() {
        let wire = [
            0xFF, 0x01, 0x28, 0x05, 0x02, 0x01, 0x03, 0x2A, 0x03, 0x03, 0x2B,
        ];
        let result = decode(&b64_of(&wire)).unwrap();
        assert_eq!(
            result.value,
            Value::List(vec![
                Value::Null,
                Value::Byte(42),
                Value::Null,
                Value::Byte(43),
                Value::Null,
            ])
        );
    }

    #[test]
    fn test_s6_unknown_tag() {
        let result = decode(&b64_of(&[0xFF, 0x01, 0x77])).unwrap();
        assert_eq!(result.value, Value::Unknown(0x77, 2));
    }

    #[test]
    fn test_s7_bad_base64() {
        let err = decode("!!!not-base64!!!").unwrap_err();
        assert_eq!(err, CodecError::BadBase64);
        assert!(err.suggestion().is_some());
    }

    #[test]
    fn test_empty_input_is_distinct_error() {
        let err = decode("").unwrap_err();
        assert_eq!(err, CodecError::EmptyInput);
    }

    #[test]
    fn test_p5_intern_resolution() {
        // 0x1E "hi" (interned at index 0), then 0x1F 0x00 (resolves), then 0x1F 0x05 (out of range).
        let wire = [
            0xFF, 0x01, 0x14, 0x03, 0x1E, 0x02, b'h', b'i', 0x1F, 0x00, 0x1F, 0x05,
        ];
        let result = decode(&b64_of(&wire)).unwrap();
        assert_eq!(
            result.value,
            Value::List(vec![
                Value::Text("hi".to_string()),
                Value::Text("hi".to_string()),
                Value::Text("<StringRef:5>".to_string()),
            ])
        );
    }

    #[test]
    fn test_p6_clamp_oversized_collection() {
        // List tag with a count varint far above the 10,000 clamp; no elements follow.
        let mut wire = vec![0xFF, 0x01, 0x14];
        wire.extend(crate::de::parser::varint::write_varint(50_000));
        let result = decode(&b64_of(&wire)).unwrap();
        assert_eq!(result.value, Value::List(vec![]));
    }

    #[test]
    fn test_p7_stats_monotonicity() {
        let wire_a = [0xFF, 0x01, 0x05, 0x01, b'a'];
        let wire_b = [0xFF, 0x01, 0x14, 0x02, 0x05, 0x01, b'a', 0x05, 0x01, b'b'];
        let a = decode(&b64_of(&wire_a)).unwrap();
        let b = decode(&b64_of(&wire_b)).unwrap();
        assert!(b.stats.covers(a.stats));
    }
}
