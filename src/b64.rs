//
// Copyright 2020 bplist Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! Input sanitizer and Base64 codec (`SPEC_FULL.md` §4.11).

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{CodecError, Result};

/// Trims whitespace, URL-decodes if a `%` is present, and Base64-decodes the result.
///
/// URL-decoding is gated exactly on the presence of `%`: that octet cannot appear in
/// standard Base64 output, so the gate never misfires on valid input (`SPEC_FULL.md` §9).
pub fn decode_input(text: &str) -> Result<Vec<u8>> {
    let trimmed = text.trim();
    let candidate = if trimmed.contains('%') {
        url_decode(trimmed).unwrap_or_else(|| trimmed.to_string())
    } else {
        trimmed.to_string()
    };

    STANDARD.decode(candidate.as_bytes()).map_err(|_| CodecError::BadBase64)
}

/// Base64-encodes `bytes` using the standard alphabet with `=` padding.
pub fn encode_output(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// A minimal percent-decoder: `%XX` becomes the byte `XX`, everything else passes through.
/// Returns `None` on a malformed escape so the caller can fall back to the original text.
fn url_decode(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = input.get(i + 1..i + 3)?;
            let byte = u8::from_str_radix(hex, 16).ok()?;
            out.push(byte);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let bytes = [0xFF, 0x01, 0x67];
        let text = encode_output(&bytes);
        assert_eq!(decode_input(&text).unwrap(), bytes.to_vec());
    }

    #[test]
    fn test_trims_whitespace() {
        let text = format!("  {}  \n", encode_output(&[0x0A]));
        assert_eq!(decode_input(&text).unwrap(), vec![0x0A]);
    }

    #[test]
    fn test_url_decodes_when_percent_present() {
        let encoded = encode_output(&[0xFF, 0x01]);
        let url_escaped = encoded.replace('+', "%2B");
        assert!(url_escaped.contains('%'));
        assert_eq!(decode_input(&url_escaped).unwrap(), vec![0xFF, 0x01]);
    }

    #[test]
    fn test_bad_base64_errors() {
        assert_eq!(decode_input("!!!not-base64!!!").unwrap_err(), CodecError::BadBase64);
    }

    #[test]
    fn test_empty_input_decodes_to_empty_bytes() {
        assert_eq!(decode_input("").unwrap(), Vec::<u8>::new());
    }
}
