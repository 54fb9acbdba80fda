//
// Copyright 2020 bplist Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! The JSON bridge (`SPEC_FULL.md` §6, C14): the editor-facing embedding of `Value`.
//!
//! `Value` is a hand-written sum type with boxed recursive variants and a handful of
//! shapes (Pair/Triplet/Opaque/TypeRef/…) that don't map onto a `#[derive(Serialize)]`
//! without a custom `"type"`-discriminator scheme, so this is a direct `Value <-> serde_json::Value`
//! walk rather than a derived impl — the same reason `de` is a hand-written recursive-descent
//! reader rather than a generic `serde::Deserializer`.

use serde_json::{Map as JsonMap, Value as Json};

use crate::b64;
use crate::error::Result;
use crate::value::{Color, DataTableSchema, Opaque, OpaqueExtract, UnitKind, Value};

/// `SPEC_FULL.md` §6 `parseJson`.
pub fn parse_json(text: &str) -> Result<Value> {
    let json: Json = serde_json::from_str(text)?;
    Ok(json_to_value(&json))
}

/// `SPEC_FULL.md` §6 `toJson`.
pub fn to_json(value: &Value) -> Result<String> {
    Ok(serde_json::to_string_pretty(&value_to_json(value))?)
}

/// `SPEC_FULL.md` §6 `formatJson`: re-serializes `text` with stable indentation.
pub fn format_json(text: &str) -> Result<String> {
    let json: Json = serde_json::from_str(text)?;
    Ok(serde_json::to_string_pretty(&json)?)
}

/// `SPEC_FULL.md` §6 `validateJson`.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ValidateResult {
    pub valid: bool,
    pub error: Option<String>,
    pub line: Option<usize>,
    pub column: Option<usize>,
}

pub fn validate_json(text: &str) -> ValidateResult {
    match serde_json::from_str::<Json>(text) {
        Ok(_) => ValidateResult {
            valid: true,
            error: None,
            line: None,
            column: None,
        },
        Err(e) => ValidateResult {
            valid: false,
            error: Some(e.to_string()),
            line: Some(e.line()),
            column: Some(e.column()),
        },
    }
}

fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Byte(b) => Json::from(*b),
        Value::Int16(i) => Json::from(*i),
        Value::Int32(i) => Json::from(*i),
        Value::Float32(f) => serde_json::Number::from_f64(*f as f64)
            .map(Json::Number)
            .unwrap_or(Json::Null),
        Value::Float64(f) => serde_json::Number::from_f64(*f)
            .map(Json::Number)
            .unwrap_or(Json::Null),
        Value::Char(c) => Json::String(c.to_string()),
        Value::Text(s) => Json::String(s.clone()),
        Value::DateTime(ticks) => object(vec![
            ("type", Json::String("DateTime".to_string())),
            ("ticks", Json::from(*ticks)),
            ("iso8601", Json::String(Value::datetime_to_iso8601(*ticks))),
        ]),
        Value::Color(color) => object(vec![
            ("type", Json::String("Color".to_string())),
            ("a", Json::from(color.a)),
            ("r", Json::from(color.r)),
            ("g", Json::from(color.g)),
            ("b", Json::from(color.b)),
            ("rgba", Json::String(color.to_rgba_string())),
        ]),
        Value::Unit(magnitude, kind) => object(vec![
            ("type", Json::String("Unit".to_string())),
            (
                "value",
                serde_json::Number::from_f64(magnitude.0)
                    .map(Json::Number)
                    .unwrap_or(Json::Null),
            ),
            ("unit", Json::String(unit_kind_name(*kind).to_string())),
            (
                "css",
                Json::String(format!("{}{}", magnitude.0, kind.suffix())),
            ),
        ]),
        Value::Pair(first, second) => object(vec![
            ("type", Json::String("Pair".to_string())),
            ("first", value_to_json(first)),
            ("second", value_to_json(second)),
        ]),
        Value::Triplet(first, second, third) => object(vec![
            ("type", Json::String("Triplet".to_string())),
            ("first", value_to_json(first)),
            ("second", value_to_json(second)),
            ("third", value_to_json(third)),
        ]),
        Value::List(items) => Json::Array(items.iter().map(value_to_json).collect()),
        Value::SparseList { length, entries } => object(vec![
            ("type", Json::String("SparseList".to_string())),
            ("length", Json::from(*length as u64)),
            (
                "entries",
                Json::Array(
                    entries
                        .iter()
                        .map(|(index, value)| {
                            object(vec![
                                ("index", Json::from(*index as u64)),
                                ("value", value_to_json(value)),
                            ])
                        })
                        .collect(),
                ),
            ),
        ]),
        Value::Map(entries) => {
            let mut map = JsonMap::new();
            for (key, value) in entries {
                map.insert(key.clone(), value_to_json(value));
            }
            Json::Object(map)
        }
        Value::TypeRef(name) => object(vec![
            ("type", Json::String("TypeRef".to_string())),
            ("name", Json::String(name.clone())),
        ]),
        Value::KnownTypeRef(index) => object(vec![
            ("type", Json::String("KnownTypeRef".to_string())),
            ("index", Json::from(*index as u64)),
        ]),
        Value::StringRef(index) => object(vec![
            ("type", Json::String("StringRef".to_string())),
            ("index", Json::from(*index as u64)),
        ]),
        Value::TypedArray(type_index, items) => object(vec![
            ("type", Json::String("TypedArray".to_string())),
            ("typeIndex", Json::from(*type_index as u64)),
            (
                "items",
                Json::Array(items.iter().map(value_to_json).collect()),
            ),
        ]),
        Value::Opaque(opaque) => object(vec![
            ("type", Json::String("Opaque".to_string())),
            ("declaredLength", Json::from(opaque.declared_length as u64)),
            (
                "bytesBase64",
                Json::String(b64::encode_output(&opaque.bytes)),
            ),
            ("extract", opaque_extract_to_json(&opaque.extract)),
        ]),
        Value::Unknown(tag, offset) => object(vec![
            ("type", Json::String("Unknown".to_string())),
            ("tag", Json::from(*tag)),
            ("offset", Json::from(*offset as u64)),
        ]),
    }
}

fn opaque_extract_to_json(extract: &OpaqueExtract) -> Json {
    let mut fields = vec![(
        "strings".to_string(),
        Json::Array(extract.strings.iter().cloned().map(Json::String).collect()),
    )];
    if let Some(object_type) = &extract.object_type {
        fields.push(("objectType".to_string(), Json::String(object_type.clone())));
    }
    if extract.has_diffgram {
        fields.push(("hasDiffgram".to_string(), Json::Bool(true)));
    }
    if let Some(schema) = &extract.schema {
        fields.push(("schema".to_string(), schema_to_json(schema)));
    }
    let mut map = JsonMap::new();
    for (key, value) in fields {
        map.insert(key, value);
    }
    Json::Object(map)
}

fn schema_to_json(schema: &DataTableSchema) -> Json {
    let mut fields = vec![(
        "type".to_string(),
        Json::String("DataTable Schema".to_string()),
    )];
    if let Some(name) = &schema.table_name {
        fields.push(("tableName".to_string(), Json::String(name.clone())));
    }
    fields.push((
        "columns".to_string(),
        Json::Array(
            schema
                .columns
                .iter()
                .map(|(name, ty)| {
                    object(vec![
                        ("name", Json::String(name.clone())),
                        ("type", Json::String(ty.clone())),
                    ])
                })
                .collect(),
        ),
    ));
    if schema.has_diffgram {
        fields.push(("hasDiffgram".to_string(), Json::Bool(true)));
    }
    let mut map = JsonMap::new();
    for (key, value) in fields {
        map.insert(key, value);
    }
    Json::Object(map)
}

fn unit_kind_name(kind: UnitKind) -> &'static str {
    match kind {
        UnitKind::None => "none",
        UnitKind::Px => "px",
        UnitKind::Pt => "pt",
        UnitKind::Pc => "pc",
        UnitKind::In => "in",
        UnitKind::Mm => "mm",
        UnitKind::Cm => "cm",
        UnitKind::Percent => "%",
        UnitKind::Em => "em",
        UnitKind::Ex => "ex",
    }
}

fn unit_kind_from_name(name: &str) -> UnitKind {
    match name {
        "px" => UnitKind::Px,
        "pt" => UnitKind::Pt,
        "pc" => UnitKind::Pc,
        "in" => UnitKind::In,
        "mm" => UnitKind::Mm,
        "cm" => UnitKind::Cm,
        "%" => UnitKind::Percent,
        "em" => UnitKind::Em,
        "ex" => UnitKind::Ex,
        _ => UnitKind::None,
    }
}

fn object(fields: Vec<(&str, Json)>) -> Json {
    let mut map = JsonMap::new();
    for (key, value) in fields {
        map.insert(key.to_string(), value);
    }
    Json::Object(map)
}

fn json_to_value(json: &Json) -> Value {
    match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                if (0..=255).contains(&i) {
                    Value::Byte(i as u8)
                } else {
                    Value::Int32(i as i32)
                }
            } else {
                Value::Float64(n.as_f64().unwrap_or(0.0))
            }
        }
        Json::String(s) => Value::Text(s.clone()),
        Json::Array(items) => Value::List(items.iter().map(json_to_value).collect()),
        Json::Object(map) => object_to_value(map),
    }
}

fn object_to_value(map: &JsonMap<String, Json>) -> Value {
    let discriminator = map.get("type").and_then(Json::as_str);
    match discriminator {
        Some("Pair") => Value::Pair(
            Box::new(map.get("first").map(json_to_value).unwrap_or(Value::Null)),
            Box::new(map.get("second").map(json_to_value).unwrap_or(Value::Null)),
        ),
        Some("Triplet") => Value::Triplet(
            Box::new(map.get("first").map(json_to_value).unwrap_or(Value::Null)),
            Box::new(map.get("second").map(json_to_value).unwrap_or(Value::Null)),
            Box::new(map.get("third").map(json_to_value).unwrap_or(Value::Null)),
        ),
        Some("DateTime") => Value::DateTime(
            map.get("ticks")
                .and_then(Json::as_i64)
                .unwrap_or_default(),
        ),
        Some("Color") => Value::Color(Color {
            a: map.get("a").and_then(Json::as_u64).unwrap_or(255) as u8,
            r: map.get("r").and_then(Json::as_u64).unwrap_or(0) as u8,
            g: map.get("g").and_then(Json::as_u64).unwrap_or(0) as u8,
            b: map.get("b").and_then(Json::as_u64).unwrap_or(0) as u8,
        }),
        Some("Unit") => Value::Unit(
            ordered_float::OrderedFloat(map.get("value").and_then(Json::as_f64).unwrap_or(0.0)),
            map.get("unit")
                .and_then(Json::as_str)
                .map(unit_kind_from_name)
                .unwrap_or(UnitKind::None),
        ),
        Some("SparseList") => Value::SparseList {
            length: map.get("length").and_then(Json::as_u64).unwrap_or(0) as usize,
            entries: map
                .get("entries")
                .and_then(Json::as_array)
                .map(|entries| {
                    entries
                        .iter()
                        .filter_map(|entry| {
                            let index = entry.get("index")?.as_u64()? as usize;
                            let value = json_to_value(entry.get("value")?);
                            Some((index, value))
                        })
                        .collect()
                })
                .unwrap_or_default(),
        },
        Some("TypeRef") => Value::TypeRef(
            map.get("name")
                .and_then(Json::as_str)
                .unwrap_or_default()
                .to_string(),
        ),
        Some("KnownTypeRef") => {
            Value::KnownTypeRef(map.get("index").and_then(Json::as_u64).unwrap_or(0) as usize)
        }
        Some("StringRef") => {
            Value::StringRef(map.get("index").and_then(Json::as_u64).unwrap_or(0) as usize)
        }
        Some("TypedArray") => Value::TypedArray(
            map.get("typeIndex").and_then(Json::as_u64).unwrap_or(0) as usize,
            map.get("items")
                .and_then(Json::as_array)
                .map(|items| items.iter().map(json_to_value).collect())
                .unwrap_or_default(),
        ),
        Some("Opaque") => {
            let bytes = map
                .get("bytesBase64")
                .and_then(Json::as_str)
                .and_then(|s| b64::decode_input(s).ok())
                .unwrap_or_default();
            Value::Opaque(Opaque {
                declared_length: map
                    .get("declaredLength")
                    .and_then(Json::as_u64)
                    .unwrap_or(bytes.len() as u64) as usize,
                bytes,
                extract: OpaqueExtract::default(),
            })
        }
        Some("Unknown") => Value::Unknown(
            map.get("tag").and_then(Json::as_u64).unwrap_or(0) as u8,
            map.get("offset").and_then(Json::as_u64).unwrap_or(0) as usize,
        ),
        _ => Value::Map(
            map.iter()
                .map(|(key, value)| (key.clone(), json_to_value(value)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_s8_json_to_value_pair() {
        let value = parse_json(r#"{"type":"Pair","first":"x","second":["y","z"]}"#).unwrap();
        match value {
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
            other => panic!("expected Pair, got {:?}", other),
        }
    }

    #[test]
    fn test_plain_object_is_map() {
        let value = parse_json(r#"{"a":1,"b":2}"#).unwrap();
        assert_eq!(
            value,
            Value::Map(vec![
                ("a".to_string(), Value::Byte(1)),
                ("b".to_string(), Value::Byte(2)),
            ])
        );
    }

    #[test]
    fn test_round_trip_through_json() {
        let value = Value::List(vec![Value::Bool(true), Value::Null, Value::Byte(9)]);
        let text = to_json(&value).unwrap();
        assert_eq!(parse_json(&text).unwrap(), value);
    }

    #[test]
    fn test_validate_json_reports_line_and_column() {
        let result = validate_json("{\n  \"a\": ,\n}");
        assert!(!result.valid);
        assert!(result.line.is_some());
        assert!(result.column.is_some());
    }

    #[test]
    fn test_validate_json_valid() {
        let result = validate_json(r#"{"a": 1}"#);
        assert!(result.valid);
        assert_eq!(result.error, None);
    }
}
