// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Resolving baseline and polarisation selections against a chunk.

#[cfg(test)]
mod tests;

use std::collections::BTreeSet;
use std::str::FromStr;

use itertools::Itertools;
use log::debug;
use regex::Regex;
use strum_macros::{Display, EnumIter, EnumString};
use thiserror::Error;
use vec1::Vec1;

use crate::{
    chunk::{Baseline, VisChunk},
    pol::PolMap,
};

#[derive(Error, Debug)]
pub enum SelectionError {
    #[error("Got {stations1} station patterns for the first station, but {stations2} for the second; these must be equal")]
    StationListLength { stations1: usize, stations2: usize },

    #[error("Couldn't compile station pattern '{pattern}': {err}")]
    BadPattern { pattern: String, err: regex::Error },

    #[error("Unrecognised baseline filter '{0}'; expected one of '', 'AUTO' or 'CROSS'")]
    BadFilter(String),

    #[error("The selection doesn't contain any baselines")]
    NoBaselines,

    #[error("The selection doesn't contain any (recognised) polarisations")]
    NoPolarisations,
}

/// Which kinds of baselines pass a selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumIter, EnumString)]
#[strum(serialize_all = "UPPERCASE")]
pub enum BaselineFilter {
    #[default]
    All,
    Auto,
    Cross,
}

impl BaselineFilter {
    /// Parse a filter, ignoring case. An empty string means all baselines.
    pub fn parse(s: &str) -> Result<BaselineFilter, SelectionError> {
        let upper = s.trim().to_uppercase();
        if upper.is_empty() {
            return Ok(BaselineFilter::All);
        }
        BaselineFilter::from_str(&upper).map_err(|_| SelectionError::BadFilter(s.to_string()))
    }

    pub fn accepts(self, station1: usize, station2: usize) -> bool {
        match self {
            BaselineFilter::All => true,
            BaselineFilter::Auto => station1 == station2,
            BaselineFilter::Cross => station1 != station2,
        }
    }
}

/// The chunk baselines and storage polarisations that are processed. Neither
/// can be empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisSelection {
    /// Indices into the chunk's baselines, ascendingly.
    pub baselines: Vec1<usize>,

    /// Storage-order polarisation indices, ascendingly.
    pub pols: Vec1<usize>,
}

impl VisSelection {
    /// Every baseline and every recognised polarisation.
    pub fn all(chunk: &VisChunk, pol_map: &PolMap) -> Result<VisSelection, SelectionError> {
        VisSelection::new::<&str>(chunk, pol_map, BaselineFilter::All, &[], &[], &[])
    }

    /// Resolve a selection. `stations1` and `stations2` are paired lists of
    /// regular expressions, each of which must match a whole station name.
    pub fn new<S: AsRef<str>>(
        chunk: &VisChunk,
        pol_map: &PolMap,
        filter: BaselineFilter,
        stations1: &[S],
        stations2: &[S],
        pols: &[S],
    ) -> Result<VisSelection, SelectionError> {
        if stations1.len() != stations2.len() {
            return Err(SelectionError::StationListLength {
                stations1: stations1.len(),
                stations2: stations2.len(),
            });
        }

        let baselines: Vec<usize> = if stations1.is_empty() {
            chunk
                .baselines()
                .iter()
                .enumerate()
                .filter(|(_, bl)| filter.accepts(bl.station1, bl.station2))
                .map(|(i, _)| i)
                .collect()
        } else {
            let mut selected = BTreeSet::new();
            for (p1, p2) in stations1.iter().zip(stations2.iter()) {
                let matches1 = match_stations(chunk.stations(), p1.as_ref())?;
                let matches2 = match_stations(chunk.stations(), p2.as_ref())?;
                selected.extend(
                    matches1
                        .into_iter()
                        .cartesian_product(matches2)
                        .filter(|&(s1, s2)| filter.accepts(s1, s2))
                        .filter_map(|(s1, s2)| chunk.baseline_index(Baseline::new(s1, s2))),
                );
            }
            selected.into_iter().collect()
        };
        let baselines = Vec1::try_from_vec(baselines).map_err(|_| SelectionError::NoBaselines)?;

        let pols: Vec<usize> = if pols.is_empty() {
            pol_map.valid_indices().collect()
        } else {
            pols.iter()
                .flat_map(|p| pol_map.find(p.as_ref()))
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        };
        let pols = Vec1::try_from_vec(pols).map_err(|_| SelectionError::NoPolarisations)?;

        debug!(
            "Selected {} baselines and {} polarisations",
            baselines.len(),
            pols.len()
        );
        Ok(VisSelection { baselines, pols })
    }
}

/// Indices of all stations whose whole name matches `pattern`.
fn match_stations(stations: &[String], pattern: &str) -> Result<Vec<usize>, SelectionError> {
    let re = Regex::new(&format!("^(?:{pattern})$")).map_err(|err| SelectionError::BadPattern {
        pattern: pattern.to_string(),
        err,
    })?;
    Ok(stations
        .iter()
        .enumerate()
        .filter(|(_, name)| re.is_match(name))
        .map(|(i, _)| i)
        .collect())
}
