// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Frequency/time axes, bounding boxes and 2-D grids.
//!
//! A chunk's samples and the calibration solve domains are both described by
//! a [`Grid`]. Cell `(f, t)` of a grid has the linear id `t * n_freq + f`.

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::AXIS_LOCATE_TOLERANCE;

#[derive(Error, Debug, PartialEq)]
pub enum GridError {
    #[error("An axis must have at least one cell")]
    EmptyAxis,

    #[error("Axis cell {index} has a non-positive width ({lower} to {upper})")]
    NonPositiveWidth { index: usize, lower: f64, upper: f64 },

    #[error("Axis cells must be ascending and non-overlapping; cell {index} starts at {lower}, before the previous cell ends ({prev_upper})")]
    Unsorted {
        index: usize,
        lower: f64,
        prev_upper: f64,
    },

    #[error("Expected as many lower bounds ({lower}) as upper bounds ({upper})")]
    BoundCountMismatch { lower: usize, upper: usize },

    #[error("The calibration grid doesn't overlap the chunk")]
    NoOverlap,

    #[error("Solve-domain cell {cell} on the {axis} axis is narrower than a single sample")]
    CellTooNarrow { axis: &'static str, cell: usize },

    #[error("Solve-domain cell {cell} on the {axis} axis doesn't meet the next cell; calibration grids can't have gaps where they overlap a chunk")]
    CellGap { axis: &'static str, cell: usize },

    #[error("No solvable coefficients overlap the chunk; have solvable parameters been set?")]
    NoCoefficients,

    #[error("A cell size must be at least one sample on each axis")]
    ZeroCellSize,
}

/// A 2-D index into a grid; either a cell of a calibration grid or a sample of
/// a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    pub freq: usize,
    pub time: usize,
}

impl Location {
    pub fn new(freq: usize, time: usize) -> Location {
        Location { freq, time }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum AxisKind {
    Regular { start: f64, width: f64, count: usize },
    Irregular { lower: Vec<f64>, upper: Vec<f64> },
}

/// An ordered, immutable set of cells along one dimension. Each cell has a
/// lower and upper bound; consecutive cells may be discontinuous but never
/// overlap.
#[derive(Debug, Clone, PartialEq)]
pub struct Axis(AxisKind);

impl Axis {
    /// A regularly-spaced axis.
    ///
    /// # Panics
    ///
    /// Panics if `count` is zero or `width` isn't positive.
    pub fn regular(start: f64, width: f64, count: usize) -> Axis {
        assert!(count > 0, "an axis must have at least one cell");
        assert!(width > 0.0, "axis cell widths must be positive");
        Axis(AxisKind::Regular {
            start,
            width,
            count,
        })
    }

    /// An axis with arbitrary (but ascending and non-overlapping) cells.
    pub fn irregular(lower: Vec<f64>, upper: Vec<f64>) -> Result<Axis, GridError> {
        if lower.len() != upper.len() {
            return Err(GridError::BoundCountMismatch {
                lower: lower.len(),
                upper: upper.len(),
            });
        }
        if lower.is_empty() {
            return Err(GridError::EmptyAxis);
        }
        for (index, (&l, &u)) in lower.iter().zip(upper.iter()).enumerate() {
            if u <= l {
                return Err(GridError::NonPositiveWidth {
                    index,
                    lower: l,
                    upper: u,
                });
            }
            if index > 0 && l < upper[index - 1] {
                return Err(GridError::Unsorted {
                    index,
                    lower: l,
                    prev_upper: upper[index - 1],
                });
            }
        }
        Ok(Axis(AxisKind::Irregular { lower, upper }))
    }

    /// The number of cells on this axis.
    pub fn size(&self) -> usize {
        match &self.0 {
            AxisKind::Regular { count, .. } => *count,
            AxisKind::Irregular { lower, .. } => lower.len(),
        }
    }

    pub fn is_regular(&self) -> bool {
        matches!(self.0, AxisKind::Regular { .. })
    }

    pub fn lower(&self, i: usize) -> f64 {
        match &self.0 {
            AxisKind::Regular { start, width, .. } => start + i as f64 * width,
            AxisKind::Irregular { lower, .. } => lower[i],
        }
    }

    pub fn upper(&self, i: usize) -> f64 {
        match &self.0 {
            AxisKind::Regular { start, width, .. } => start + (i + 1) as f64 * width,
            AxisKind::Irregular { upper, .. } => upper[i],
        }
    }

    pub fn center(&self, i: usize) -> f64 {
        0.5 * (self.lower(i) + self.upper(i))
    }

    pub fn width(&self, i: usize) -> f64 {
        self.upper(i) - self.lower(i)
    }

    /// The lower bound of the first cell.
    pub fn start(&self) -> f64 {
        self.lower(0)
    }

    /// The upper bound of the last cell.
    pub fn end(&self) -> f64 {
        self.upper(self.size() - 1)
    }

    /// Find the cell containing `x`. With `bias_right`, a value on the
    /// boundary of two cells belongs to the right-hand one (cells are
    /// `[lower, upper)`), otherwise to the left-hand one (`(lower, upper]`).
    /// Values outside the axis are clamped to the first or last cell.
    pub fn locate(&self, x: f64, bias_right: bool) -> usize {
        let last = self.size() - 1;
        match &self.0 {
            AxisKind::Regular { start, width, .. } => {
                let pos = (x - start) / width;
                let i = if bias_right {
                    (pos + AXIS_LOCATE_TOLERANCE).floor()
                } else {
                    (pos - AXIS_LOCATE_TOLERANCE).ceil() - 1.0
                };
                if i <= 0.0 {
                    0
                } else {
                    (i as usize).min(last)
                }
            }
            AxisKind::Irregular { upper, .. } => {
                let i = if bias_right {
                    upper.partition_point(|&u| u <= x)
                } else {
                    upper.partition_point(|&u| u < x)
                };
                i.min(last)
            }
        }
    }

    /// Merge consecutive groups of `n` cells into single cells. The last cell
    /// may be made of fewer than `n` cells.
    pub fn group(&self, n: usize) -> Result<Axis, GridError> {
        if n == 0 {
            return Err(GridError::ZeroCellSize);
        }
        let size = self.size();
        let (lower, upper) = (0..size)
            .step_by(n)
            .map(|first| (self.lower(first), self.upper((first + n).min(size) - 1)))
            .unzip();
        Axis::irregular(lower, upper)
    }
}

/// An axis-aligned box in frequency \[Hz\] and time \[s\].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub freq_start: f64,
    pub freq_end: f64,
    pub time_start: f64,
    pub time_end: f64,
}

impl BBox {
    pub fn new(freq_start: f64, freq_end: f64, time_start: f64, time_end: f64) -> BBox {
        BBox {
            freq_start,
            freq_end,
            time_start,
            time_end,
        }
    }

    /// A box has no area if either of its sides is not positive.
    pub fn is_empty(&self) -> bool {
        !(self.freq_end > self.freq_start && self.time_end > self.time_start)
    }

    pub fn intersection(&self, other: &BBox) -> BBox {
        BBox {
            freq_start: self.freq_start.max(other.freq_start),
            freq_end: self.freq_end.min(other.freq_end),
            time_start: self.time_start.max(other.time_start),
            time_end: self.time_end.min(other.time_end),
        }
    }

    pub fn overlaps(&self, other: &BBox) -> bool {
        !self.intersection(other).is_empty()
    }

    /// Does this box contain the point? The lower edges are inclusive, the
    /// upper edges exclusive.
    pub fn contains(&self, freq: f64, time: f64) -> bool {
        (self.freq_start..self.freq_end).contains(&freq)
            && (self.time_start..self.time_end).contains(&time)
    }

    pub fn center(&self) -> (f64, f64) {
        (
            0.5 * (self.freq_start + self.freq_end),
            0.5 * (self.time_start + self.time_end),
        )
    }
}

/// A frequency axis and a time axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    pub freq: Axis,
    pub time: Axis,
}

impl Grid {
    pub fn new(freq: Axis, time: Axis) -> Grid {
        Grid { freq, time }
    }

    /// The number of cells along (frequency, time).
    pub fn shape(&self) -> (usize, usize) {
        (self.freq.size(), self.time.size())
    }

    pub fn num_cells(&self) -> usize {
        self.freq.size() * self.time.size()
    }

    pub fn cell_id(&self, loc: Location) -> usize {
        loc.time * self.freq.size() + loc.freq
    }

    pub fn location(&self, id: usize) -> Location {
        let n_freq = self.freq.size();
        Location {
            freq: id % n_freq,
            time: id / n_freq,
        }
    }

    pub fn bbox(&self) -> BBox {
        BBox::new(
            self.freq.start(),
            self.freq.end(),
            self.time.start(),
            self.time.end(),
        )
    }

    pub fn cell_box(&self, loc: Location) -> BBox {
        BBox::new(
            self.freq.lower(loc.freq),
            self.freq.upper(loc.freq),
            self.time.lower(loc.time),
            self.time.upper(loc.time),
        )
    }

    /// The box spanning the cells `start` to `end` (inclusive).
    pub fn span_box(&self, start: Location, end: Location) -> BBox {
        BBox::new(
            self.freq.lower(start.freq),
            self.freq.upper(end.freq),
            self.time.lower(start.time),
            self.time.upper(end.time),
        )
    }

    pub fn locate(&self, freq: f64, time: f64, bias_right: bool) -> Location {
        Location {
            freq: self.freq.locate(freq, bias_right),
            time: self.time.locate(time, bias_right),
        }
    }

    /// Build a grid whose cells are made of `channels` x `timeslots` cells of
    /// this grid. The boundaries of the new grid line up with the boundaries
    /// of this one.
    pub fn group(&self, channels: usize, timeslots: usize) -> Result<Grid, GridError> {
        Ok(Grid {
            freq: self.freq.group(channels)?,
            time: self.time.group(timeslots)?,
        })
    }
}
