//
// Copyright 2020 bplist Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! # The ViewState value model.
//!
//! A decoded (or to-be-encoded) ViewState document is a tree of `Value`. Every
//! variant below corresponds to one row of the wire tag table; see `tags` for the
//! byte-level dispatch and `decode`/`encode` for the parser and emitter.
//!
//! # References
//!
//! 1. https://github.com/opensource-apple/CF/blob/master/ForFoundationOnly.h (bplist ancestor model this is adapted from)
//! 2. System.Web.UI.WebControls.UnitType (the CSS-unit enumeration `UnitKind` mirrors)

use ordered_float::OrderedFloat;

/// A packed ARGB color value, as produced by tag `0x09`.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct Color {
    pub a: u8,
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    /// Unpacks a big-endian `0xAARRGGBB` word, as produced by the varint-encoded body of tag `0x09`.
    pub fn from_packed(word: u32) -> Self {
        Color {
            a: ((word >> 24) & 0xFF) as u8,
            r: ((word >> 16) & 0xFF) as u8,
            g: ((word >> 8) & 0xFF) as u8,
            b: (word & 0xFF) as u8,
        }
    }

    /// Packs the receiver back into a big-endian `0xAARRGGBB` word.
    pub fn to_packed(self) -> u32 {
        ((self.a as u32) << 24) | ((self.r as u32) << 16) | ((self.g as u32) << 8) | (self.b as u32)
    }

    /// Renders as `rgba(r,g,b,a)` with alpha normalized to `[0,1]` and rounded to 2 decimal places.
    pub fn to_rgba_string(self) -> String {
        let alpha = (self.a as f64 / 255.0 * 100.0).round() / 100.0;
        format!("rgba({},{},{},{})", self.r, self.g, self.b, alpha)
    }
}

/// CSS unit kind carried by an ASP.NET `Unit` value (tag `0x1B`).
///
/// The wire encoding mirrors `System.Web.UI.WebControls.UnitType`: `0` is the
/// unitless sentinel and `1..=9` name the CSS suffixes in the declaration order below.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum UnitKind {
    None,
    Px,
    Pt,
    Pc,
    In,
    Mm,
    Cm,
    Percent,
    Em,
    Ex,
}

impl UnitKind {
    /// Decodes the varint kind discriminant read after a `Unit` value's `Float64` body.
    pub fn from_wire(kind: u64) -> UnitKind {
        match kind {
            1 => UnitKind::Px,
            2 => UnitKind::Pt,
            3 => UnitKind::Pc,
            4 => UnitKind::In,
            5 => UnitKind::Mm,
            6 => UnitKind::Cm,
            7 => UnitKind::Percent,
            8 => UnitKind::Em,
            9 => UnitKind::Ex,
            _ => UnitKind::None,
        }
    }

    /// The discriminant to re-emit on the wire.
    pub fn to_wire(self) -> u64 {
        match self {
            UnitKind::None => 0,
            UnitKind::Px => 1,
            UnitKind::Pt => 2,
            UnitKind::Pc => 3,
            UnitKind::In => 4,
            UnitKind::Mm => 5,
            UnitKind::Cm => 6,
            UnitKind::Percent => 7,
            UnitKind::Em => 8,
            UnitKind::Ex => 9,
        }
    }

    /// CSS suffix appended after the numeric value.
    pub fn suffix(self) -> &'static str {
        match self {
            UnitKind::None => "",
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
}

/// The structured, best-effort extract produced for an opaque BinaryFormatter blob.
/// See `decode::recovery` for how this is populated.
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct OpaqueExtract {
    /// Set when the blob's octets contain the `System.Data.DataTable` marker.
    pub object_type: Option<String>,
    /// A DataTable schema scraped from an embedded `<?xml ... </xs:schema>` block, if found.
    pub schema: Option<DataTableSchema>,
    /// Whether `<diffgr:diffgram>` appears anywhere in the blob.
    pub has_diffgram: bool,
    /// Printable-ASCII runs of length >= 4, capped at 50 entries.
    pub strings: Vec<String>,
}

/// A DataTable schema scraped from an embedded XML schema block (see `decode::xml_extract`).
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct DataTableSchema {
    pub table_name: Option<String>,
    pub columns: Vec<(String, String)>,
    pub has_diffgram: bool,
}

/// An opaque BinaryFormatter-serialized blob (tags `0x29`/`0x2A`).
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Opaque {
    /// The declared length of the blob, which may exceed the bytes actually available.
    pub declared_length: usize,
    /// The raw bytes actually captured, clamped to what remained in the buffer.
    pub bytes: Vec<u8>,
    /// The best-effort structured extract; see `OpaqueExtract`.
    pub extract: OpaqueExtract,
}

/// Any value that can appear in a decoded (or to-be-encoded) ViewState tree.
///
/// Does not derive `Eq`: `Float32`/`Float64` carry bare IEEE-754 values, which are not
/// reflexive under `NaN`. Equality comparisons (tests, `Stats::covers`-style checks) only
/// ever need `PartialEq` here.
#[derive(Clone, PartialEq, Debug)]
pub enum Value {
    /// Tags `0x0A` and `0x64`; also the edit-time representation of an absent value.
    Null,
    /// Tags `0x0B`/`0x0C` and the compact aliases `0x67`/`0x68`.
    Bool(bool),
    /// Tag `0x03`: a single unsigned octet.
    Byte(u8),
    /// Tag `0x01`: a little-endian signed 16-bit integer.
    Int16(i16),
    /// Tag `0x02` (and the zero constant `0x66`): a varint-encoded 32-bit integer.
    Int32(i32),
    /// Tag `0x08`.
    Float32(f32),
    /// Tag `0x07`.
    Float64(f64),
    /// Tag `0x04`: one Unicode scalar value, read from a single octet.
    Char(char),
    /// Tags `0x05` and `0x1E`; also the empty-string constant `0x65`.
    Text(String),
    /// Tag `0x06`: raw .NET ticks (100ns units since `0001-01-01T00:00:00`).
    ///
    /// Ticks outside the representable instant range are kept verbatim; callers needing
    /// the ISO-8601 rendering should use `to_iso8601`, which returns the `"<DateTime>"`
    /// placeholder for out-of-range values instead of failing.
    DateTime(i64),
    /// Tag `0x09`.
    Color(Color),
    /// Tag `0x1B`.
    Unit(OrderedFloat<f64>, UnitKind),
    /// Tag `0x0F`.
    Pair(Box<Value>, Box<Value>),
    /// Tag `0x10`.
    Triplet(Box<Value>, Box<Value>, Box<Value>),
    /// Tags `0x14`, `0x15`, `0x16`; always materialized dense (see `SparseList`).
    List(Vec<Value>),
    /// Tag `0x28`. Decoding always materializes this into a dense `List` with `Null`
    /// holes (see invariant in the data model); this variant exists so an editor can
    /// explicitly construct a sparse representation for the encoder to re-emit as `0x28`.
    SparseList {
        length: usize,
        entries: Vec<(usize, Value)>,
    },
    /// Tags `0x17`/`0x18`. Entries preserve wire order; keys are stringified (see `stringify_key`).
    Map(Vec<(String, Value)>),
    /// Tag `0x19`: appends `name` to the decoder's type intern table as a side effect.
    TypeRef(String),
    /// Tag `0x3C`: an index into the type intern table.
    KnownTypeRef(usize),
    /// Tag `0x1F`: an index into the string intern table. The decoder normally resolves
    /// this immediately into `Text` (or the `<StringRef:i>` sentinel); this variant exists
    /// so the encoder can re-emit an explicit back-reference.
    StringRef(usize),
    /// Tag `0x32`.
    TypedArray(usize, Vec<Value>),
    /// Tags `0x29`/`0x2A`.
    Opaque(Opaque),
    /// Produced only by tag-level recovery: an unrecognized tag byte at the given offset.
    Unknown(u8, usize),
}

impl Value {
    /// Convenience constructor for an empty string, distinct from `Null`.
    pub fn empty_text() -> Value {
        Value::Text(String::new())
    }

    /// Renders a `DateTime` value's ticks as ISO-8601, or the `"<DateTime>"` placeholder
    /// if the ticks fall outside the representable instant range.
    pub fn datetime_to_iso8601(ticks: i64) -> String {
        crate::de::date::ticks_to_iso8601(ticks).unwrap_or_else(|| "<DateTime>".to_string())
    }

    /// Best-effort stringification of a `Value` used as a Map key, matching `§3`'s
    /// "keys are stringified" note. `Text` passes through verbatim; scalars render as
    /// their natural textual form; anything else falls back to its variant name.
    pub fn stringify_key(key: &Value) -> String {
        match key {
            Value::Text(s) => s.clone(),
            Value::Byte(b) => b.to_string(),
            Value::Int16(i) => i.to_string(),
            Value::Int32(i) => i.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null => String::new(),
            Value::Float32(f) => f.to_string(),
            Value::Float64(f) => f.to_string(),
            other => format!("{:?}", other),
        }
    }
}
