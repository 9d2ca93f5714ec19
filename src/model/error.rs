// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for all model-related errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Can't build a model without any stations")]
    NoStations,

    #[error("The source flux density must be finite, but got {0}")]
    BadFlux(f64),

    #[error("The model perturbation must be positive and finite, but got {0}")]
    BadPerturbation(f64),
}
