// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Where parameter values come from and where visibilities go.

mod error;
mod memory;
#[cfg(test)]
mod tests;
mod writer;

pub use error::StorageError;
pub use memory::MemoryParmStore;
pub use writer::JsonVisWriter;

use std::collections::HashMap;

use crate::{chunk::VisChunk, grid::BBox, parms::Funklet, selection::VisSelection};

/// Parameter values keyed by parameter name.
pub type ParmValueSet = HashMap<String, Vec<Funklet>>;

/// A parameter database.
pub trait ParmStore: Send {
    /// The names of every stored parameter.
    fn names(&self) -> Result<Vec<String>, StorageError>;

    /// Put the stored funklets of the named parameters whose domains overlap
    /// `domain` into `out`. Parameters without overlapping funklets are left
    /// out.
    fn get_values(
        &self,
        out: &mut ParmValueSet,
        names: &[String],
        domain: &BBox,
    ) -> Result<(), StorageError>;

    /// Store funklets for a parameter, replacing any stored funklets with
    /// overlapping domains.
    fn put_values(&mut self, name: &str, funklets: &[Funklet]) -> Result<(), StorageError>;

    /// Make everything put so far persistent.
    fn flush(&mut self) -> Result<(), StorageError>;
}

/// Somewhere to write visibilities after they've been rewritten.
pub trait VisWriter {
    /// Write the selected part of a chunk into `column`.
    fn write(
        &mut self,
        selection: &VisSelection,
        chunk: &VisChunk,
        column: &str,
        write_flags: bool,
    ) -> Result<(), StorageError>;
}
