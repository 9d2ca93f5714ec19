// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::ops::Range;

use crossbeam_utils::atomic::AtomicCell;

use crate::grid::Grid;

static NEXT_REQUEST_ID: AtomicCell<u64> = AtomicCell::new(0);

/// A span of chunk samples for which a model is to be evaluated.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalRequest {
    id: u64,
    channels: Range<usize>,
    timeslots: Range<usize>,
    freq_bounds: Vec<(f64, f64)>,
    time_bounds: Vec<(f64, f64)>,
    n_perturbations: usize,
}

impl EvalRequest {
    /// `channels` and `timeslots` index the samples of `grid`; every request
    /// gets a fresh id.
    ///
    /// # Panics
    ///
    /// Panics if either range is empty or beyond the grid.
    pub fn new(
        grid: &Grid,
        channels: Range<usize>,
        timeslots: Range<usize>,
        n_perturbations: usize,
    ) -> EvalRequest {
        assert!(!channels.is_empty() && channels.end <= grid.freq.size());
        assert!(!timeslots.is_empty() && timeslots.end <= grid.time.size());
        let freq_bounds = channels
            .clone()
            .map(|c| (grid.freq.lower(c), grid.freq.upper(c)))
            .collect();
        let time_bounds = timeslots
            .clone()
            .map(|t| (grid.time.lower(t), grid.time.upper(t)))
            .collect();
        EvalRequest {
            id: NEXT_REQUEST_ID.fetch_add(1),
            channels,
            timeslots,
            freq_bounds,
            time_bounds,
            n_perturbations,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// The chunk channels covered.
    pub fn channels(&self) -> Range<usize> {
        self.channels.clone()
    }

    /// The chunk timeslots covered.
    pub fn timeslots(&self) -> Range<usize> {
        self.timeslots.clone()
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn num_timeslots(&self) -> usize {
        self.timeslots.len()
    }

    /// The boundaries of each channel of the request.
    pub fn freq_bounds(&self) -> &[(f64, f64)] {
        &self.freq_bounds
    }

    /// The boundaries of each timeslot of the request.
    pub fn time_bounds(&self) -> &[(f64, f64)] {
        &self.time_bounds
    }

    pub fn freq_centers(&self) -> impl Iterator<Item = f64> + '_ {
        self.freq_bounds.iter().map(|(l, u)| 0.5 * (l + u))
    }

    pub fn time_centers(&self) -> impl Iterator<Item = f64> + '_ {
        self.time_bounds.iter().map(|(l, u)| 0.5 * (l + u))
    }

    /// The number of unknowns the model must be perturbed for; zero when no
    /// derivatives are wanted.
    pub fn n_perturbations(&self) -> usize {
        self.n_perturbations
    }
}
