// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for all kernel-related errors.

use thiserror::Error;

use crate::{
    chunk::ChunkError, grid::GridError, model::ModelError, parms::ParmError,
    selection::SelectionError, storage::StorageError,
};

#[derive(Error, Debug)]
pub enum KernelError {
    #[error("No chunk is attached to the kernel")]
    NoChunk,

    #[error("{0}")]
    Selection(#[from] SelectionError),

    #[error("{0}")]
    Grid(#[from] GridError),

    #[error("{0}")]
    Parm(#[from] ParmError),

    #[error("{0}")]
    Model(#[from] ModelError),

    #[error("{0}")]
    Storage(#[from] StorageError),

    #[error("{0}")]
    Chunk(#[from] ChunkError),
}
