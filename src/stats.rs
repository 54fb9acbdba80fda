//
// Copyright 2020 bplist Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! Informational counters gathered while decoding. These never influence parsing
//! decisions; they exist purely to let a caller summarize what a payload contains.

use serde::Serialize;

/// Running tally of value kinds encountered during one decode.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Serialize)]
pub struct Stats {
    pub pairs: usize,
    pub triplets: usize,
    /// Arrays, ArrayLists, SparseLists, and TypedArrays.
    pub arrays: usize,
    pub strings: usize,
    /// Byte + Int16 + Int32 (including the zero constant).
    pub integers: usize,
    pub booleans: usize,
    pub opaque_objects: usize,
}

impl Stats {
    pub fn new() -> Self {
        Stats::default()
    }

    /// Component-wise max, used to state `P7` (statistics monotonicity) as a test.
    pub fn max(self, other: Stats) -> Stats {
        Stats {
            pairs: self.pairs.max(other.pairs),
            triplets: self.triplets.max(other.triplets),
            arrays: self.arrays.max(other.arrays),
            strings: self.strings.max(other.strings),
            integers: self.integers.max(other.integers),
            booleans: self.booleans.max(other.booleans),
            opaque_objects: self.opaque_objects.max(other.opaque_objects),
        }
    }

    /// Component-wise `>=` comparison, used to state `P7` (statistics monotonicity) as a test.
    pub fn covers(self, other: Stats) -> bool {
        self.pairs >= other.pairs
            && self.triplets >= other.triplets
            && self.arrays >= other.arrays
            && self.strings >= other.strings
            && self.integers >= other.integers
            && self.booleans >= other.booleans
            && self.opaque_objects >= other.opaque_objects
    }
}
