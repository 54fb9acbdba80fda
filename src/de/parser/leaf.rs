//
// Copyright 2020 bplist Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! Fixed-width and length-prefixed leaf body parsers (`SPEC_FULL.md` §4.3, §4.4).
//!
//! Every ViewState scalar body is stored little-endian, unlike bplist's big-endian wire
//! format; these are otherwise direct analogues of `de::parser::object`'s leaf parsers.

use nom::{
    bytes::complete::take,
    number::complete::{le_f32, le_f64, le_i16, le_i64, le_u8},
    IResult,
};

use crate::de::parser::varint::read_varint;

/// Parses a little-endian signed 16-bit integer body (tag `0x01`).
pub fn int16(input: &[u8]) -> IResult<&[u8], i16> {
    le_i16(input)
}

/// Parses a single unsigned octet body (tag `0x03`).
pub fn byte(input: &[u8]) -> IResult<&[u8], u8> {
    le_u8(input)
}

/// Parses a single octet as a Unicode scalar value (tag `0x04`).
///
/// Only values `0x00..=0x7F` can be represented as a `char` from one octet; anything
/// above is treated as a Latin-1 code point, matching the string reader's fallback.
pub fn character(input: &[u8]) -> IResult<&[u8], char> {
    let (input, value) = le_u8(input)?;
    Ok((input, value as char))
}

/// Parses a little-endian 32-bit float body (tag `0x08`).
pub fn float32(input: &[u8]) -> IResult<&[u8], f32> {
    le_f32(input)
}

/// Parses a little-endian 64-bit float body (tag `0x07`).
pub fn float64(input: &[u8]) -> IResult<&[u8], f64> {
    le_f64(input)
}

/// Parses raw .NET ticks (tag `0x06`): a little-endian signed 64-bit integer.
pub fn date_ticks(input: &[u8]) -> IResult<&[u8], i64> {
    le_i64(input)
}

/// Parses a varint-length-prefixed octet string and returns the raw bytes, clamping
/// the read to whatever remains in the buffer (truncated reads never fail; see `§4.3`).
pub fn length_prefixed_bytes(input: &[u8]) -> IResult<&[u8], &[u8]> {
    let (length, consumed) = read_varint(input);
    let input = &input[consumed..];
    let clamped = (length as usize).min(input.len());
    take(clamped)(input)
}

/// Decodes a length-prefixed string body, falling back to per-octet Latin-1 when the
/// captured bytes are not valid UTF-8 (`§4.3`).
pub fn text(input: &[u8]) -> IResult<&[u8], String> {
    let (input, bytes) = length_prefixed_bytes(input)?;
    let decoded = String::from_utf8(bytes.to_vec())
        .unwrap_or_else(|_| bytes.iter().map(|&b| b as char).collect());
    Ok((input, decoded))
}

/// Parses a varint-encoded packed `0xAARRGGBB` color word (tag `0x09`).
pub fn color_word(input: &[u8]) -> IResult<&[u8], u32> {
    let (value, consumed) = read_varint(input);
    Ok((&input[consumed..], value as u32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int16() {
        assert_eq!(int16(&[0x34, 0x12]), Ok((&[][..], 0x1234)));
        assert_eq!(int16(&[0xFF, 0xFF]), Ok((&[][..], -1)));
    }

    #[test]
    fn test_float64() {
        assert_eq!(
            float64(&[0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]),
            Ok((&[][..], 0.0))
        );
    }

    #[test]
    fn test_text_clean() {
        let input = [0x05, b'H', b'e', b'l', b'l', b'o', 0xFF];
        let (remaining, value) = text(&input).unwrap();
        assert_eq!(value, "Hello");
        assert_eq!(remaining, &[0xFF]);
    }

    #[test]
    fn test_text_truncated_consumes_available() {
        let input = [0x0A, b'h', b'i'];
        let (remaining, value) = text(&input).unwrap();
        assert_eq!(value, "hi");
        assert_eq!(remaining.len(), 0);
    }

    #[test]
    fn test_text_empty() {
        let input = [0x00];
        let (_, value) = text(&input).unwrap();
        assert_eq!(value, "");
    }
}
