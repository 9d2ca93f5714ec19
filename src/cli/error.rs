// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for all command-line errors. This should be the *only* error
//! enum that the binary sees.

use thiserror::Error;

use crate::{config::ConfigError, storage::StorageError, KernelError};

/// The *only* error the binary reports. Each variant is a message ready to be
/// printed.
#[derive(Error, Debug)]
pub enum CliError {
    /// An error in the run configuration.
    #[error("{0}\n\nCheck the config file and try again.")]
    Config(String),

    /// An error selecting baselines or polarisations.
    #[error("{0}")]
    Selection(String),

    /// An error setting up solve-domain cells or solvable parameters.
    #[error("{0}")]
    Calibration(String),

    /// An error from the model.
    #[error("{0}")]
    Model(String),

    /// An error reading or writing parameters or visibilities.
    #[error("{0}")]
    Storage(String),

    /// A generic error that can't be clarified further, e.g. IO errors.
    #[error("{0}")]
    Generic(String),
}

// When changing the error propagation below, ensure `Self::from(e)` uses the
// correct `e`!

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::Chunk(_) => Self::Generic(e.to_string()),
            _ => Self::Config(e.to_string()),
        }
    }
}

impl From<KernelError> for CliError {
    fn from(e: KernelError) -> Self {
        match e {
            KernelError::NoChunk | KernelError::Chunk(_) => Self::Generic(e.to_string()),
            KernelError::Selection(_) => Self::Selection(e.to_string()),
            KernelError::Grid(_) | KernelError::Parm(_) => Self::Calibration(e.to_string()),
            KernelError::Model(_) => Self::Model(e.to_string()),
            KernelError::Storage(_) => Self::Storage(e.to_string()),
        }
    }
}

impl From<StorageError> for CliError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e.to_string())
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        Self::Generic(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::Generic(e.to_string())
    }
}
