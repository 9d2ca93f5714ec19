// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use log::{debug, trace};

use super::{ParmStore, ParmValueSet, StorageError};
use crate::{grid::BBox, parms::Funklet};

/// A parameter database held in memory. If it has a path, flushing writes it
/// there as JSON.
#[derive(Debug, Default, Clone)]
pub struct MemoryParmStore {
    values: BTreeMap<String, Vec<Funklet>>,
    path: Option<PathBuf>,
}

impl MemoryParmStore {
    /// An empty database that's never persisted.
    pub fn new() -> MemoryParmStore {
        MemoryParmStore::default()
    }

    /// Use the database at `path`. It's created on the first flush if it
    /// doesn't exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<MemoryParmStore, StorageError> {
        let path = path.as_ref().to_path_buf();
        let values = if path.exists() {
            let file = File::open(&path).map_err(|err| StorageError::Read {
                path: path.clone(),
                err,
            })?;
            serde_json::from_reader(BufReader::new(file)).map_err(|err| StorageError::Parse {
                path: path.clone(),
                err,
            })?
        } else {
            BTreeMap::new()
        };
        debug!(
            "Opened parameter database {} ({} parameters)",
            path.display(),
            values.len()
        );
        Ok(MemoryParmStore {
            values,
            path: Some(path),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// All stored funklets of a parameter.
    pub fn get(&self, name: &str) -> Option<&[Funklet]> {
        self.values.get(name).map(|v| v.as_slice())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl ParmStore for MemoryParmStore {
    fn names(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.values.keys().cloned().collect())
    }

    fn get_values(
        &self,
        out: &mut ParmValueSet,
        names: &[String],
        domain: &BBox,
    ) -> Result<(), StorageError> {
        for name in names {
            let overlapping: Vec<Funklet> = self
                .values
                .get(name)
                .map(|funklets| {
                    funklets
                        .iter()
                        .filter(|f| f.domain.overlaps(domain))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();
            if !overlapping.is_empty() {
                out.insert(name.clone(), overlapping);
            }
        }
        Ok(())
    }

    fn put_values(&mut self, name: &str, funklets: &[Funklet]) -> Result<(), StorageError> {
        let stored = self.values.entry(name.to_string()).or_default();
        stored.retain(|old| !funklets.iter().any(|new| new.domain.overlaps(&old.domain)));
        stored.extend(funklets.iter().map(|f| Funklet {
            scid: None,
            ..f.clone()
        }));
        stored.sort_by(|a, b| {
            (a.domain.time_start, a.domain.freq_start)
                .partial_cmp(&(b.domain.time_start, b.domain.freq_start))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        trace!("Stored {} funklets for '{name}'", funklets.len());
        Ok(())
    }

    fn flush(&mut self) -> Result<(), StorageError> {
        if let Some(path) = &self.path {
            let mut writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer_pretty(&mut writer, &self.values)?;
            writer.flush()?;
            debug!("Wrote parameter database {}", path.display());
        }
        Ok(())
    }
}
