//
// Copyright 2020 bplist Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! Conversion between raw .NET ticks and ISO-8601, for the `DateTime` value (tag `0x06`).
//!
//! A tick is 100 nanoseconds; the epoch is `0001-01-01T00:00:00` (the .NET `DateTime`
//! epoch, not CFAbsoluteTime's 2001 epoch that bplist's `Date` modeled).

use chrono::{Duration, NaiveDate};

const TICKS_PER_SECOND: i64 = 10_000_000;
const NANOS_PER_TICK: i64 = 100;

/// Converts raw ticks since `0001-01-01T00:00:00` into an ISO-8601 string, or `None`
/// if the value falls outside the range chrono can represent as a `NaiveDateTime`.
pub fn ticks_to_iso8601(ticks: i64) -> Option<String> {
    if ticks < 0 {
        return None;
    }
    let seconds = ticks / TICKS_PER_SECOND;
    let nanos = (ticks % TICKS_PER_SECOND) * NANOS_PER_TICK;

    let epoch = NaiveDate::from_ymd_opt(1, 1, 1)?.and_hms_opt(0, 0, 0)?;
    let instant = epoch
        .checked_add_signed(Duration::seconds(seconds))?
        .checked_add_signed(Duration::nanoseconds(nanos))?;

    Some(format!("{}Z", instant.format("%Y-%m-%dT%H:%M:%S%.f")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch() {
        assert_eq!(ticks_to_iso8601(0).as_deref(), Some("0001-01-01T00:00:00Z"));
    }

    #[test]
    fn test_negative_ticks_out_of_range() {
        assert_eq!(ticks_to_iso8601(-1), None);
    }

    #[test]
    fn test_one_second() {
        assert_eq!(
            ticks_to_iso8601(TICKS_PER_SECOND).as_deref(),
            Some("0001-01-01T00:00:01Z")
        );
    }
}
