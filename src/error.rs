//
// Copyright 2020 bplist Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CodecError>;

/// Errors surfaced at the public boundaries of the codec.
///
/// The in-band recovery path (`Value::Unknown`, `<StringRef:n>` sentinels, truncated
/// reads) never produces one of these; they are reserved for the handful of top-level
/// conditions that have no well-formed value to return at all.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    /// The input could not be Base64-decoded, even after a URL-decoding attempt.
    #[error("input is not valid Base64")]
    BadBase64,

    /// The input was empty, or decoded to zero bytes.
    #[error("ViewState data is empty")]
    EmptyInput,

    /// The structured parser failed and the fallback extractor found nothing useful either.
    #[error("could not make sense of the ViewState structure")]
    MalformedStructure,

    /// The JSON document describing a `Value` tree could not be parsed.
    #[error("invalid JSON at line {line}, column {column}: {message}")]
    BadJson {
        message: String,
        line: usize,
        column: usize,
    },

    /// `encode` was invoked with nothing to encode.
    #[error("No data to encode")]
    NothingToEncode,
}

impl CodecError {
    /// A human-readable suggestion accompanying the error, matching the `{error, suggestion}`
    /// shape of the language-neutral `decode` surface.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            CodecError::BadBase64 | CodecError::EmptyInput => {
                Some("Make sure the input is a valid Base64-encoded ASP.NET ViewState string")
            }
            _ => None,
        }
    }
}

impl From<base64::DecodeError> for CodecError {
    fn from(_: base64::DecodeError) -> Self {
        CodecError::BadBase64
    }
}

impl From<serde_json::Error> for CodecError {
    fn from(e: serde_json::Error) -> Self {
        CodecError::BadJson {
            message: e.to_string(),
            line: e.line(),
            column: e.column(),
        }
    }
}
