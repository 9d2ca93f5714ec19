// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::PathBuf;

use thiserror::Error;

use super::{ConfigFileType, CONFIG_FILE_TYPES_COMMA_SEPARATED};
use crate::chunk::ChunkError;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file '{}' doesn't have a recognised file extension! Valid extensions are: {}", .0.display(), *CONFIG_FILE_TYPES_COMMA_SEPARATED)]
    UnknownFileType(PathBuf),

    #[error("Couldn't read config file '{}': {err}", path.display())]
    Read { path: PathBuf, err: std::io::Error },

    #[error("Couldn't decode {file_type} structure from '{}':\n{err}", path.display())]
    Parse {
        path: PathBuf,
        file_type: ConfigFileType,
        err: String,
    },

    #[error("Invalid observation: {0}")]
    BadObservation(String),

    #[error("Step {step} ({kind}) is invalid: {reason}")]
    BadStep {
        step: usize,
        kind: String,
        reason: String,
    },

    #[error("The config doesn't have any steps to run")]
    NoSteps,

    #[error("{0}")]
    Chunk(#[from] ChunkError),
}
