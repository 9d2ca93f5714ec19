// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Couldn't read the parameter database {path}: {err}")]
    Read { path: PathBuf, err: std::io::Error },

    #[error("The parameter database {path} isn't valid: {err}")]
    Parse {
        path: PathBuf,
        err: serde_json::Error,
    },

    #[error("'{0}' can't be used as a column name")]
    BadColumn(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}
