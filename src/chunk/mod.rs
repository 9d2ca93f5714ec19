// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The visibility buffer ("chunk") processed by the kernel.


use std::collections::HashMap;

use ndarray::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{c32, grid::Grid};

#[derive(Error, Debug)]
pub enum ChunkError {
    #[error("The visibility array has dimensions {got:?}, but (baselines, timeslots, channels, polarisations) is {expected:?}")]
    VisShape {
        got: (usize, usize, usize, usize),
        expected: (usize, usize, usize, usize),
    },

    #[error("The flag array has dimensions {got:?}, but the visibility array has dimensions {expected:?}")]
    FlagShape {
        got: (usize, usize, usize, usize),
        expected: (usize, usize, usize, usize),
    },

    #[error("The baseline flag array has dimensions {got:?}, but expected {expected:?}")]
    BaselineFlagShape {
        got: (usize, usize),
        expected: (usize, usize),
    },

    #[error("Baseline {index} refers to station {station}, but there are only {num_stations} stations")]
    BadStation {
        index: usize,
        station: usize,
        num_stations: usize,
    },

    #[error("Baseline {station1}-{station2} appears more than once")]
    DuplicateBaseline { station1: usize, station2: usize },
}

/// An (ordered) pair of station indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Baseline {
    pub station1: usize,
    pub station2: usize,
}

impl Baseline {
    pub fn new(station1: usize, station2: usize) -> Baseline {
        Baseline { station1, station2 }
    }

    pub fn is_auto(&self) -> bool {
        self.station1 == self.station2
    }
}

/// A materialised slice of visibilities. The kernel owns a chunk while it's
/// attached.
#[derive(Debug, Clone)]
pub struct VisChunk {
    /// Describes the channel (frequency) and timeslot boundaries.
    grid: Grid,

    stations: Vec<String>,

    baselines: Vec<Baseline>,

    /// Polarisation names, in storage order.
    pols: Vec<String>,

    /// Dimensions: (baseline, timeslot, channel, polarisation).
    vis: Array4<c32>,

    /// Same dimensions as `vis`.
    flags: Array4<bool>,

    /// Dimensions: (baseline, timeslot).
    baseline_flags: Array2<bool>,

    baseline_lookup: HashMap<Baseline, usize>,
}

impl VisChunk {
    pub fn new(
        grid: Grid,
        stations: Vec<String>,
        baselines: Vec<Baseline>,
        pols: Vec<String>,
        vis: Array4<c32>,
        flags: Array4<bool>,
        baseline_flags: Array2<bool>,
    ) -> Result<VisChunk, ChunkError> {
        let expected = (
            baselines.len(),
            grid.time.size(),
            grid.freq.size(),
            pols.len(),
        );
        if vis.dim() != expected {
            return Err(ChunkError::VisShape {
                got: vis.dim(),
                expected,
            });
        }
        if flags.dim() != expected {
            return Err(ChunkError::FlagShape {
                got: flags.dim(),
                expected,
            });
        }
        if baseline_flags.dim() != (expected.0, expected.1) {
            return Err(ChunkError::BaselineFlagShape {
                got: baseline_flags.dim(),
                expected: (expected.0, expected.1),
            });
        }

        let mut baseline_lookup = HashMap::with_capacity(baselines.len());
        for (index, &bl) in baselines.iter().enumerate() {
            for station in [bl.station1, bl.station2] {
                if station >= stations.len() {
                    return Err(ChunkError::BadStation {
                        index,
                        station,
                        num_stations: stations.len(),
                    });
                }
            }
            if baseline_lookup.insert(bl, index).is_some() {
                return Err(ChunkError::DuplicateBaseline {
                    station1: bl.station1,
                    station2: bl.station2,
                });
            }
        }

        Ok(VisChunk {
            grid,
            stations,
            baselines,
            pols,
            vis,
            flags,
            baseline_flags,
            baseline_lookup,
        })
    }

    /// A chunk with every visibility zero and nothing flagged.
    pub fn zeroed(
        grid: Grid,
        stations: Vec<String>,
        baselines: Vec<Baseline>,
        pols: Vec<String>,
    ) -> Result<VisChunk, ChunkError> {
        let dim = (
            baselines.len(),
            grid.time.size(),
            grid.freq.size(),
            pols.len(),
        );
        VisChunk::new(
            grid,
            stations,
            baselines,
            pols,
            Array4::zeros(dim),
            Array4::from_elem(dim, false),
            Array2::from_elem((dim.0, dim.1), false),
        )
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn stations(&self) -> &[String] {
        &self.stations
    }

    pub fn baselines(&self) -> &[Baseline] {
        &self.baselines
    }

    pub fn pols(&self) -> &[String] {
        &self.pols
    }

    pub fn num_channels(&self) -> usize {
        self.grid.freq.size()
    }

    pub fn num_timeslots(&self) -> usize {
        self.grid.time.size()
    }

    /// Get the index of a baseline, if the chunk has it.
    pub fn baseline_index(&self, baseline: Baseline) -> Option<usize> {
        self.baseline_lookup.get(&baseline).copied()
    }

    pub fn vis(&self) -> ArrayView4<c32> {
        self.vis.view()
    }

    pub fn vis_mut(&mut self) -> ArrayViewMut4<c32> {
        self.vis.view_mut()
    }

    pub fn flags(&self) -> ArrayView4<bool> {
        self.flags.view()
    }

    pub fn flags_mut(&mut self) -> ArrayViewMut4<bool> {
        self.flags.view_mut()
    }

    pub fn baseline_flags(&self) -> ArrayView2<bool> {
        self.baseline_flags.view()
    }

    pub fn baseline_flags_mut(&mut self) -> ArrayViewMut2<bool> {
        self.baseline_flags.view_mut()
    }

    /// Borrow the baselines immutably while the visibilities are borrowed
    /// mutably.
    pub(crate) fn baselines_and_vis_mut(&mut self) -> (&[Baseline], ArrayViewMut4<c32>) {
        (&self.baselines, self.vis.view_mut())
    }
}
