// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
The per-process calibration kernel of a distributed radio-interferometer
calibration pipeline.

For one frequency/time chunk of visibilities, the kernel evaluates an
instrument model and either rewrites the visibilities (simulate, subtract,
correct) or builds least-squares normal equations for every solve-domain cell
overlapping the chunk. Solving those equations happens elsewhere.
 */

pub mod chunk;
pub mod cli;
pub mod config;
pub mod constants;
mod error;
pub mod grid;
pub mod kernel;
pub mod model;
pub mod normal_eq;
pub mod parms;
pub mod pol;
pub mod selection;
pub mod storage;

// Re-exports.
pub use chunk::{Baseline, VisChunk};
pub use cli::{Args, CliError};
pub use error::KernelError;
pub use grid::{Axis, BBox, Grid, Location};
pub use kernel::{CellLayout, Kernel, KernelState};
pub use model::{EquationType, GainModel, ModelConfig, ModelEvaluator};
pub use normal_eq::{CellEquation, NormalEquation};
pub use parms::{CellCoeff, CoeffIndex, CoeffInterval, Funklet, ParmRegistry, Parameter};
pub use pol::{PolMap, Polarisation};
pub use selection::{BaselineFilter, VisSelection};
pub use storage::{JsonVisWriter, MemoryParmStore, ParmStore, VisWriter};

use crossbeam_utils::atomic::AtomicCell;

/// Single-precision complex number; the storage type of visibilities.
#[allow(non_camel_case_types)]
pub type c32 = num_complex::Complex32;

/// Double-precision complex number; all arithmetic is done with this type.
#[allow(non_camel_case_types)]
pub type c64 = num_complex::Complex64;

/// Are progress bars being drawn? This should only ever be enabled by CLI code.
pub static PROGRESS_BARS: AtomicCell<bool> = AtomicCell::new(false);
