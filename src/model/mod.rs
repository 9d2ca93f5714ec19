// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Instrument models, and the contract the kernel uses to evaluate them.

mod error;
mod gain;
mod request;

pub use error::ModelError;
pub use gain::GainModel;
pub use request::EvalRequest;

use std::collections::BTreeMap;

use ndarray::prelude::*;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

use crate::{
    c64,
    chunk::Baseline,
    constants::{DEFAULT_PERTURBATION, DEFAULT_SOURCE_FLUX},
    parms::ParmRegistry,
    pol::NUM_POLS,
};

/// What the kernel is going to do with the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum EquationType {
    Simulate,
    Subtract,
    Correct,
    Construct,
}

/// Settings for [`GainModel`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelConfig {
    /// Apply per-station complex gains? If not, only the source is modelled.
    pub gains: bool,

    /// The flux density of the unpolarised point source at the phase centre
    /// \[Jy\].
    pub flux: f64,

    /// The perturbation used to differentiate the model numerically. It is
    /// relative to each coefficient's value, unless the value is tiny.
    pub perturbation: f64,
}

impl Default for ModelConfig {
    fn default() -> ModelConfig {
        ModelConfig {
            gains: true,
            flux: DEFAULT_SOURCE_FLUX,
            perturbation: DEFAULT_PERTURBATION,
        }
    }
}

/// A model evaluated with one solvable coefficient perturbed.
#[derive(Debug, Clone)]
pub struct Perturbed {
    /// Dimensions: (timeslot, channel) over the request span.
    pub values: Array2<c64>,

    /// The perturbation applied to the coefficient, per funklet of its
    /// parameter (i.e. per solve-domain cell once a grid has been set).
    pub deltas: Vec<f64>,
}

/// The model of one polarisation on one baseline.
#[derive(Debug, Clone)]
pub struct PolResult {
    /// Dimensions: (timeslot, channel) over the request span.
    pub value: Array2<c64>,

    /// Keyed by the local index of the perturbed unknown. Only unknowns the
    /// model actually depends on are present.
    pub perturbed: BTreeMap<usize, Perturbed>,
}

impl PolResult {
    pub fn zeros(num_timeslots: usize, num_channels: usize) -> PolResult {
        PolResult {
            value: Array2::zeros((num_timeslots, num_channels)),
            perturbed: BTreeMap::new(),
        }
    }
}

/// The model of one baseline, indexed by canonical polarisation
/// ([`crate::Polarisation::index`]).
#[derive(Debug, Clone)]
pub struct ModelResult {
    pub pols: [PolResult; NUM_POLS],
}

impl ModelResult {
    pub fn zeros(num_timeslots: usize, num_channels: usize) -> ModelResult {
        ModelResult {
            pols: std::array::from_fn(|_| PolResult::zeros(num_timeslots, num_channels)),
        }
    }
}

/// Something that predicts visibilities for baselines.
///
/// The kernel calls [`ModelEvaluator::make_equations`] whenever a chunk is
/// set up, [`ModelEvaluator::precalculate`] once per [`EvalRequest`] before
/// going parallel, and then [`ModelEvaluator::evaluate`] for every selected
/// baseline, from many threads at once.
pub trait ModelEvaluator: Send + Sync {
    /// Bind a configuration and register every parameter the model needs
    /// (with defaults) in `registry`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration can't be used with these
    /// stations and baselines.
    fn make_equations(
        &mut self,
        kind: EquationType,
        config: &ModelConfig,
        stations: &[String],
        baselines: &[Baseline],
        registry: &mut ParmRegistry,
    ) -> Result<(), ModelError>;

    /// Prime caches for a request. Called single-threaded.
    fn precalculate(&mut self, request: &EvalRequest, registry: &ParmRegistry);

    /// Evaluate the model of one baseline over a request.
    ///
    /// `observed` is only given when correcting; it has dimensions
    /// (timeslot, channel, canonical polarisation) over the request span, and
    /// the returned values are the corrected data.
    fn evaluate(
        &self,
        baseline: Baseline,
        request: &EvalRequest,
        registry: &ParmRegistry,
        observed: Option<ArrayView3<c64>>,
    ) -> ModelResult;
}
