//
// Copyright 2020 bplist Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! A native encoder/decoder for the binary wire format produced by the ASP.NET
//! `LosFormatter`/`ObjectStateFormatter` serializers (ViewState).

mod b64;
mod encode;
mod error;
mod json;
mod stats;
mod tags;
mod value;

pub mod de;

pub use de::{decode, DecodeResult};
pub use encode::encode;
pub use error::{CodecError, Result};
pub use json::{format_json, parse_json, to_json, validate_json, ValidateResult};
pub use stats::Stats;
pub use value::{Color, DataTableSchema, Opaque, OpaqueExtract, UnitKind, Value};
