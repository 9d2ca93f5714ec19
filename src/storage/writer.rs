// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use log::info;
use serde::Serialize;

use super::{StorageError, VisWriter};
use crate::{chunk::VisChunk, selection::VisSelection};

#[derive(Serialize)]
struct BaselineRecord<'a> {
    station1: &'a str,
    station2: &'a str,
    pol: &'a str,
    /// (real, imaginary) pairs, timeslot-major.
    vis: Vec<[f32; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    flags: Option<Vec<bool>>,
}

#[derive(Serialize)]
struct VisFile<'a> {
    column: &'a str,
    num_timeslots: usize,
    num_channels: usize,
    records: Vec<BaselineRecord<'a>>,
}

/// Writes each column as a JSON file in a directory.
#[derive(Debug, Clone)]
pub struct JsonVisWriter {
    dir: PathBuf,
}

impl JsonVisWriter {
    pub fn new<P: AsRef<Path>>(dir: P) -> JsonVisWriter {
        JsonVisWriter {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// The file a column is written to.
    pub fn column_path(&self, column: &str) -> PathBuf {
        self.dir.join(format!("{column}.json"))
    }
}

impl VisWriter for JsonVisWriter {
    fn write(
        &mut self,
        selection: &VisSelection,
        chunk: &VisChunk,
        column: &str,
        write_flags: bool,
    ) -> Result<(), StorageError> {
        if column.is_empty() || column.contains(['/', '\\']) {
            return Err(StorageError::BadColumn(column.to_string()));
        }

        let vis = chunk.vis();
        let flags = chunk.flags();
        let stations = chunk.stations();
        let mut records = Vec::with_capacity(selection.baselines.len() * selection.pols.len());
        for &i_bl in selection.baselines.iter() {
            let bl = chunk.baselines()[i_bl];
            for &i_pol in selection.pols.iter() {
                records.push(BaselineRecord {
                    station1: &stations[bl.station1],
                    station2: &stations[bl.station2],
                    pol: &chunk.pols()[i_pol],
                    vis: vis
                        .slice(ndarray::s![i_bl, .., .., i_pol])
                        .iter()
                        .map(|v| [v.re, v.im])
                        .collect(),
                    flags: write_flags.then(|| {
                        flags
                            .slice(ndarray::s![i_bl, .., .., i_pol])
                            .iter()
                            .copied()
                            .collect()
                    }),
                });
            }
        }

        std::fs::create_dir_all(&self.dir)?;
        let path = self.column_path(column);
        let mut writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer(
            &mut writer,
            &VisFile {
                column,
                num_timeslots: chunk.num_timeslots(),
                num_channels: chunk.num_channels(),
                records,
            },
        )?;
        writer.flush()?;
        info!("Wrote column '{column}' to {}", path.display());
        Ok(())
    }
}
