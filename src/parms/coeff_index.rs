// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A parameter's slice of an unknown vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoeffInterval {
    pub start: usize,
    pub length: usize,
}

/// Maps parameter names to their slices of an unknown vector. Slices are
/// contiguous and in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoeffIndex {
    intervals: IndexMap<String, CoeffInterval>,
    total: usize,
}

impl CoeffIndex {
    pub fn new() -> CoeffIndex {
        CoeffIndex::default()
    }

    /// Append a parameter with `length` coefficients and return its slice. If
    /// the parameter is already present, its existing slice is returned.
    pub fn insert(&mut self, name: &str, length: usize) -> CoeffInterval {
        if let Some(interval) = self.intervals.get(name) {
            return *interval;
        }
        let interval = CoeffInterval {
            start: self.total,
            length,
        };
        self.intervals.insert(name.to_string(), interval);
        self.total += length;
        interval
    }

    pub fn get(&self, name: &str) -> Option<CoeffInterval> {
        self.intervals.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.intervals.contains_key(name)
    }

    /// The number of coefficients over all parameters.
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, CoeffInterval)> {
        self.intervals.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Append every parameter of `other` that isn't already present. This is
    /// how per-process indices are combined into a cluster-wide numbering.
    pub fn merge(&mut self, other: &CoeffIndex) {
        for (name, interval) in other.iter() {
            self.insert(name, interval.length);
        }
    }
}
