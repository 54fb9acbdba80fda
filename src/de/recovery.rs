//
// Copyright 2020 bplist Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! Two-level recovery path: tag-level (`recover_unknown_tag`) and stream-level
//! (`fallback_extract`), plus the opaque-blob extract they share (`SPEC_FULL.md` §4.7, §4.8).

use once_cell::sync::Lazy;
use regex::Regex;

use crate::de::parser::leaf;
use crate::de::xml_extract;
use crate::value::{DataTableSchema, OpaqueExtract, Value};

/// §4.8(1): on an unrecognized tag, reinterpret the tag byte itself as the start of a
/// varint-length-prefixed string. A printable, non-empty result is accepted as recovered
/// text; otherwise the cursor is left just past the original tag byte and `Unknown` is
/// produced.
pub(super) fn recover_unknown_tag(decoder: &mut super::Decoder, tag_byte: u8, offset: usize) -> Value {
    let slice = &decoder.input[offset..];
    if let Ok((residual, s)) = leaf::text(slice) {
        if !s.is_empty() && s.bytes().all(|b| (0x20..=0x7E).contains(&b)) {
            let consumed = slice.len() - residual.len();
            decoder.pos = offset + consumed;
            return Value::Text(s);
        }
    }

    decoder.pos = offset + 1;
    Value::Unknown(tag_byte, offset)
}

/// §4.7: structured extract produced for an opaque BinaryFormatter blob.
pub(super) fn extract_opaque(bytes: &[u8]) -> OpaqueExtract {
    let text = String::from_utf8_lossy(bytes);

    let object_type = text
        .contains("System.Data.DataTable")
        .then(|| "DataTable".to_string());

    let schema = find_xml_schema_block(&text).map(|block| xml_extract::extract_schema(block));
    let has_diffgram = text.contains("<diffgr:diffgram>");
    let strings = extract_printable_runs(bytes, 50);

    OpaqueExtract {
        object_type,
        schema,
        has_diffgram,
        strings,
    }
}

fn find_xml_schema_block(text: &str) -> Option<&str> {
    let start = text.find("<?xml")?;
    let end = text[start..].find("</xs:schema>").map(|i| start + i + "</xs:schema>".len());
    Some(&text[start..end.unwrap_or_else(|| text.len())])
}

const XML_BLOCK_CAP: usize = 5000;
const XML_START_MARKERS: [&str; 3] = ["<?xml", "<xs:schema", "<diffgr:"];

/// §4.8(2): walks the whole buffer for every XML-ish block (not just the first, unlike
/// `find_xml_schema_block`), bounding each at its matching closing tag or `XML_BLOCK_CAP`
/// bytes past the start if the buffer is truncated before one appears.
fn extract_xml_schema_blocks(raw: &[u8]) -> Vec<DataTableSchema> {
    let text = String::from_utf8_lossy(raw);
    let text = text.as_ref();

    let mut blocks = Vec::new();
    let mut cursor = 0usize;
    while cursor < text.len() {
        let next = XML_START_MARKERS
            .iter()
            .filter_map(|marker| text[cursor..].find(marker).map(|i| cursor + i))
            .min();
        let Some(start) = next else { break };

        let closing = if text[start..].starts_with("<diffgr:") {
            "</diffgr:diffgram>"
        } else {
            "</xs:schema>"
        };
        let end = match text[start..].find(closing) {
            Some(i) => start + i + closing.len(),
            None => char_boundary_floor(text, (start + XML_BLOCK_CAP).min(text.len())),
        };

        blocks.push(&text[start..end]);
        cursor = end.max(start + 1);
    }

    blocks.into_iter().map(xml_extract::extract_schema).collect()
}

/// Walks backward from `index` to the nearest `char` boundary, so a cap-bounded slice
/// never panics on a multi-byte UTF-8 sequence split by `from_utf8_lossy`'s replacement.
fn char_boundary_floor(text: &str, index: usize) -> usize {
    let mut i = index;
    while i > 0 && !text.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// §4.8(2): reached only when there is no `Value` at all to return for the top-level
/// parse (an empty payload after framing); scans the raw octets for anything recognizable
/// and returns the `{type, format, content}` map, or `None` if nothing useful was found.
pub fn fallback_extract(raw: &[u8]) -> Option<Value> {
    let strings = extract_printable_runs(raw, 200);
    let dot_net_types = extract_dot_net_types(raw);
    let xml_schemas = extract_xml_schema_blocks(raw);
    let structure = retry_structured_parse(raw);

    if strings.is_empty() && dot_net_types.is_empty() && xml_schemas.is_empty() && structure.is_none() {
        return None;
    }

    let mut content = Vec::new();
    if !xml_schemas.is_empty() {
        content.push((
            "xmlSchemas".to_string(),
            Value::List(xml_schemas.iter().map(schema_to_value).collect()),
        ));
    }
    if !dot_net_types.is_empty() {
        content.push((
            "dotNetTypes".to_string(),
            Value::List(dot_net_types.into_iter().map(Value::Text).collect()),
        ));
    }
    if !strings.is_empty() {
        content.push((
            "strings".to_string(),
            Value::List(strings.into_iter().map(Value::Text).collect()),
        ));
    }
    if let Some(value) = structure {
        content.push(("structure".to_string(), value));
    }

    Some(Value::Map(vec![
        ("type".to_string(), Value::Text("ViewState".to_string())),
        ("format".to_string(), Value::Text("LosFormatter".to_string())),
        ("content".to_string(), Value::Map(content)),
    ]))
}

fn schema_to_value(schema: &DataTableSchema) -> Value {
    let mut entries = vec![(
        "type".to_string(),
        Value::Text("DataTable Schema".to_string()),
    )];
    if let Some(name) = &schema.table_name {
        entries.push(("tableName".to_string(), Value::Text(name.clone())));
    }
    entries.push((
        "columns".to_string(),
        Value::List(
            schema
                .columns
                .iter()
                .map(|(name, ty)| {
                    Value::Map(vec![
                        ("name".to_string(), Value::Text(name.clone())),
                        ("type".to_string(), Value::Text(ty.clone())),
                    ])
                })
                .collect(),
        ),
    ));
    if schema.has_diffgram {
        entries.push(("hasDiffgram".to_string(), Value::Bool(true)));
    }
    Value::Map(entries)
}

fn retry_structured_parse(raw: &[u8]) -> Option<Value> {
    let payload = super::strip_framing(raw);
    if payload.is_empty() {
        return None;
    }
    let mut decoder = super::Decoder::new(payload);
    match decoder.decode_value() {
        Value::Unknown(_, 0) => None,
        value => Some(value),
    }
}

static SYSTEM_TYPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"System\.[A-Za-z.]+").unwrap());

fn extract_dot_net_types(raw: &[u8]) -> Vec<String> {
    let text = String::from_utf8_lossy(raw);
    let mut seen = Vec::new();
    for m in SYSTEM_TYPE.find_iter(&text) {
        let s = m.as_str().to_string();
        if !seen.contains(&s) {
            seen.push(s);
        }
    }
    seen
}

static PURE_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]+$").unwrap());
static PURE_HEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9A-Fa-f]+$").unwrap());
static A_OR_EQUALS_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A=]+$").unwrap());
static PLUS_SLASH_EQUALS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[+/=]+$").unwrap());
static CTL_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^ctl[0-9]+$").unwrap());
static IMAGE_BUTTON_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^ImageButton[0-9]+$").unwrap());

fn is_noise(s: &str) -> bool {
    PURE_DIGITS.is_match(s)
        || PURE_HEX.is_match(s)
        || A_OR_EQUALS_RUN.is_match(s)
        || PLUS_SLASH_EQUALS.is_match(s)
        || CTL_DIGITS.is_match(s)
        || IMAGE_BUTTON_DIGITS.is_match(s)
}

/// Scans `bytes` for printable-ASCII runs (`0x20..=0x7E`) of length >= 4, dropping the
/// §4.8 noise patterns and deduplicating in first-seen order, capped at `cap` entries.
fn extract_printable_runs(bytes: &[u8], cap: usize) -> Vec<String> {
    let mut runs = Vec::new();
    let mut current = Vec::new();

    let mut flush = |current: &mut Vec<u8>, runs: &mut Vec<String>| {
        if current.len() >= 4 {
            if let Ok(s) = String::from_utf8(current.clone()) {
                if !is_noise(&s) && !runs.contains(&s) {
                    runs.push(s);
                }
            }
        }
        current.clear();
    };

    for &b in bytes {
        if (0x20..=0x7E).contains(&b) {
            current.push(b);
        } else {
            flush(&mut current, &mut runs);
        }
        if runs.len() >= cap {
            return runs;
        }
    }
    flush(&mut current, &mut runs);
    runs.truncate(cap);
    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_printable_runs_filters_noise() {
        let bytes = b"\x00\x00Hello, World!\x00\x0012345\x00abcd\x00====\x00";
        let runs = extract_printable_runs(bytes, 200);
        assert!(runs.contains(&"Hello, World!".to_string()));
        assert!(runs.contains(&"abcd".to_string()));
        assert!(!runs.contains(&"12345".to_string()));
        assert!(!runs.iter().any(|s| s.chars().all(|c| c == '=')));
    }

    #[test]
    fn test_extract_dot_net_types_dedupes() {
        let raw = b"System.Data.DataTable blah System.Data.DataTable System.Version";
        let types = extract_dot_net_types(raw);
        assert_eq!(
            types,
            vec!["System.Data.DataTable".to_string(), "System.Version".to_string()]
        );
    }

    #[test]
    fn test_extract_xml_schema_blocks_finds_multiple() {
        let raw = b"junk <?xml version=\"1.0\"?><xs:schema><xs:element name=\"Foo\" /></xs:schema> mid <?xml version=\"1.0\"?><xs:schema><xs:element name=\"Bar\" /></xs:schema> end";
        let schemas = extract_xml_schema_blocks(raw);
        assert_eq!(schemas.len(), 2);
        assert_eq!(schemas[0].table_name.as_deref(), Some("Foo"));
        assert_eq!(schemas[1].table_name.as_deref(), Some("Bar"));
    }

    #[test]
    fn test_fallback_extract_none_on_empty() {
        assert_eq!(fallback_extract(&[0x00, 0x00, 0x00]), None);
    }

    #[test]
    fn test_fallback_extract_finds_strings() {
        let raw = b"\x00\x00hello world this is readable\x00\x00";
        let value = fallback_extract(raw).expect("should recover something");
        match value {
            Value::Map(entries) => {
                assert_eq!(entries[0].0, "type");
            }
            _ => panic!("expected a Map"),
        }
    }
}
