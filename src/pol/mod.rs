// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Mapping between the polarisations stored in a chunk and the four
//! correlation products of a 2x2 Jones matrix.

#[cfg(test)]
mod tests;

use std::str::FromStr;

use log::{debug, warn};
use strum_macros::{Display, EnumIter, EnumString};

/// The number of canonical polarisations.
pub const NUM_POLS: usize = 4;

/// The linear-polarisation products of a 2x2 Jones matrix, in the order they
/// are stored inside a Jones matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString)]
pub enum Polarisation {
    XX = 0,
    XY = 1,
    YX = 2,
    YY = 3,
}

impl Polarisation {
    /// The canonical (Jones-matrix) index of this polarisation.
    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(i: usize) -> Option<Polarisation> {
        match i {
            0 => Some(Polarisation::XX),
            1 => Some(Polarisation::XY),
            2 => Some(Polarisation::YX),
            3 => Some(Polarisation::YY),
            _ => None,
        }
    }

    /// Parse a polarisation name, ignoring case and surrounding whitespace.
    pub fn parse(name: &str) -> Option<Polarisation> {
        Polarisation::from_str(&name.trim().to_uppercase()).ok()
    }
}

/// A lookup from storage-order polarisation indices to [`Polarisation`]s.
/// Storage polarisations that aren't recognised map to `None` and are never
/// selected.
#[derive(Debug, Clone, Default)]
pub struct PolMap {
    names: Vec<String>,
    map: Vec<Option<Polarisation>>,
}

impl PolMap {
    pub fn new<S: AsRef<str>>(names: &[S]) -> PolMap {
        let names: Vec<String> = names.iter().map(|n| n.as_ref().to_string()).collect();
        let map = names
            .iter()
            .map(|name| {
                let pol = Polarisation::parse(name);
                if pol.is_none() {
                    warn!("Polarisation '{name}' is not a linear correlation product; it will be ignored");
                }
                pol
            })
            .collect::<Vec<_>>();
        debug!("Polarisation map: {:?}", map);
        PolMap { names, map }
    }

    /// The number of stored polarisations (valid or not).
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Get the canonical polarisation of the stored polarisation `i`.
    pub fn get(&self, i: usize) -> Option<Polarisation> {
        self.map.get(i).copied().flatten()
    }

    /// The stored name of polarisation `i`.
    pub fn name(&self, i: usize) -> Option<&str> {
        self.names.get(i).map(|s| s.as_str())
    }

    /// Storage indices of all recognised polarisations, ascendingly.
    pub fn valid_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.map
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.map(|_| i))
    }

    /// Storage indices of the recognised polarisations called `name`.
    pub fn find<'a>(&'a self, name: &str) -> impl Iterator<Item = usize> + 'a {
        let wanted = Polarisation::parse(name);
        self.map
            .iter()
            .enumerate()
            .filter_map(move |(i, p)| match (p, wanted) {
                (Some(p), Some(w)) if *p == w => Some(i),
                _ => None,
            })
    }

    /// The storage index of a canonical polarisation, if it's stored.
    pub fn storage_index(&self, pol: Polarisation) -> Option<usize> {
        self.map.iter().position(|p| *p == Some(pol))
    }
}
