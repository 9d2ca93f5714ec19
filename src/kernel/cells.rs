// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The solve-domain cells of a calibration grid that overlap a chunk.

use std::ops::Range;

use log::debug;

use crate::grid::{Axis, BBox, Grid, GridError, Location};

/// The overlap of a calibration grid with a chunk's samples. Cells from
/// `first` to `last` (inclusive on both axes) overlap the chunk, and each maps
/// to an inclusive interval of samples on each axis.
#[derive(Debug, Clone, PartialEq)]
pub struct CellLayout {
    grid: Grid,
    first: Location,
    last: Location,
    freq_intervals: Vec<(usize, usize)>,
    time_intervals: Vec<(usize, usize)>,
}

impl CellLayout {
    /// Intersect a calibration grid with a chunk's sample grid.
    pub fn new(grid: &Grid, samples: &Grid) -> Result<CellLayout, GridError> {
        let overlap = grid.bbox().intersection(&samples.bbox());
        if overlap.is_empty() {
            return Err(GridError::NoOverlap);
        }
        let first = grid.locate(overlap.freq_start, overlap.time_start, true);
        let last = grid.locate(overlap.freq_end, overlap.time_end, false);
        let freq_intervals = sample_intervals(
            &grid.freq,
            &samples.freq,
            (first.freq, last.freq),
            (overlap.freq_start, overlap.freq_end),
            "frequency",
        )?;
        let time_intervals = sample_intervals(
            &grid.time,
            &samples.time,
            (first.time, last.time),
            (overlap.time_start, overlap.time_end),
            "time",
        )?;
        debug!(
            "Cells {first:?} to {last:?} overlap the chunk; frequency samples {freq_intervals:?}, time samples {time_intervals:?}"
        );

        Ok(CellLayout {
            grid: grid.clone(),
            first,
            last,
            freq_intervals,
            time_intervals,
        })
    }

    /// The calibration grid.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn first(&self) -> Location {
        self.first
    }

    pub fn last(&self) -> Location {
        self.last
    }

    /// The number of overlapping cells along (frequency, time).
    pub fn shape(&self) -> (usize, usize) {
        (self.freq_intervals.len(), self.time_intervals.len())
    }

    pub fn num_cells(&self) -> usize {
        self.freq_intervals.len() * self.time_intervals.len()
    }

    pub fn freq_intervals(&self) -> &[(usize, usize)] {
        &self.freq_intervals
    }

    pub fn time_intervals(&self) -> &[(usize, usize)] {
        &self.time_intervals
    }

    pub fn contains(&self, loc: Location) -> bool {
        (self.first.freq..=self.last.freq).contains(&loc.freq)
            && (self.first.time..=self.last.time).contains(&loc.time)
    }

    /// Clamp a location into the overlapping cells.
    pub fn clip(&self, loc: Location) -> Location {
        Location {
            freq: loc.freq.clamp(self.first.freq, self.last.freq),
            time: loc.time.clamp(self.first.time, self.last.time),
        }
    }

    /// The index of an overlapping cell amongst all overlapping cells
    /// (time-major). This is also the index of the cell's funklet in every
    /// parameter.
    pub fn local_index(&self, loc: Location) -> usize {
        debug_assert!(self.contains(loc));
        (loc.time - self.first.time) * self.freq_intervals.len() + (loc.freq - self.first.freq)
    }

    /// The local index of the cell with the calibration-grid id `id`, if it
    /// overlaps the chunk.
    pub fn local_index_of_id(&self, id: usize) -> Option<usize> {
        if id >= self.grid.num_cells() {
            return None;
        }
        let loc = self.grid.location(id);
        self.contains(loc).then(|| self.local_index(loc))
    }

    pub fn cell_id(&self, loc: Location) -> usize {
        self.grid.cell_id(loc)
    }

    /// All overlapping cells from `start` to `end` (inclusive), time-major.
    pub fn locations(&self, start: Location, end: Location) -> impl Iterator<Item = Location> {
        (start.time..=end.time)
            .flat_map(move |time| (start.freq..=end.freq).map(move |freq| Location { freq, time }))
    }

    /// The chunk channels and timeslots of a cell.
    pub fn sample_ranges(&self, loc: Location) -> (Range<usize>, Range<usize>) {
        self.span(loc, loc)
    }

    /// The chunk channels and timeslots spanned by the cells from `start` to
    /// `end`.
    pub fn span(&self, start: Location, end: Location) -> (Range<usize>, Range<usize>) {
        let f0 = self.freq_intervals[start.freq - self.first.freq].0;
        let f1 = self.freq_intervals[end.freq - self.first.freq].1;
        let t0 = self.time_intervals[start.time - self.first.time].0;
        let t1 = self.time_intervals[end.time - self.first.time].1;
        (f0..f1 + 1, t0..t1 + 1)
    }

    /// The box covering the samples of every overlapping cell, in local
    /// order.
    pub fn cell_boxes(&self, samples: &Grid) -> Vec<BBox> {
        self.locations(self.first, self.last)
            .map(|loc| {
                let (channels, timeslots) = self.sample_ranges(loc);
                BBox::new(
                    samples.freq.lower(channels.start),
                    samples.freq.upper(channels.end - 1),
                    samples.time.lower(timeslots.start),
                    samples.time.upper(timeslots.end - 1),
                )
            })
            .collect()
    }
}

/// The inclusive sample interval of each cell from `cells.0` to `cells.1` on
/// one axis. A cell starts at the sample containing its lower boundary
/// (clipped to the overlap) and ends just before the next cell starts.
///
/// The cells must be contiguous; a gap between two of them is an error, as
/// is an overlap that falls entirely inside a gap.
fn sample_intervals(
    cal: &Axis,
    samples: &Axis,
    cells: (usize, usize),
    overlap: (f64, f64),
    axis: &'static str,
) -> Result<Vec<(usize, usize)>, GridError> {
    if cells.0 > cells.1 || cal.lower(cells.0) >= overlap.1 || cal.upper(cells.1) <= overlap.0 {
        return Err(GridError::NoOverlap);
    }
    if let Some(cell) = (cells.0..cells.1).find(|&k| cal.upper(k) < cal.lower(k + 1)) {
        return Err(GridError::CellGap { axis, cell });
    }

    let starts: Vec<usize> = (cells.0..=cells.1)
        .map(|k| samples.locate(cal.lower(k).max(overlap.0), true))
        .collect();
    let end = samples.locate(overlap.1, false);

    let mut intervals = Vec::with_capacity(starts.len());
    for (i, &start) in starts.iter().enumerate() {
        let stop = match starts.get(i + 1) {
            Some(&next) => next.checked_sub(1),
            None => Some(end),
        };
        match stop {
            Some(stop) if stop >= start => intervals.push((start, stop)),
            _ => {
                return Err(GridError::CellTooNarrow {
                    axis,
                    cell: cells.0 + i,
                })
            }
        }
    }
    Ok(intervals)
}
