// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Useful constants.

/// The default perturbation used when numerically differentiating the model
/// with respect to a parameter coefficient.
pub const DEFAULT_PERTURBATION: f64 = 1e-6;

/// Coefficients smaller than this are perturbed absolutely, even if the
/// funklet asks for relative perturbations.
pub const MIN_RELATIVE_COEFF: f64 = 1e-10;

/// Sample boundaries that are within this fraction of a sample width of a
/// grid boundary are treated as lying on it.
pub const AXIS_LOCATE_TOLERANCE: f64 = 1e-6;

/// The default flux density of the point source modelled by
/// [`crate::GainModel`] \[Jy\].
pub const DEFAULT_SOURCE_FLUX: f64 = 1.0;

/// The polarisations assumed for synthetic observations when none are given.
pub const DEFAULT_POLARISATIONS: [&str; 4] = ["XX", "XY", "YX", "YY"];
