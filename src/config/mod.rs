// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Run configuration: a synthetic observation, the model to use, and the
//! steps to run on it. Configs can be written as toml, json or yaml; the
//! format is chosen by file extension.

mod error;

pub use error::ConfigError;

use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
    str::FromStr,
};

use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

use crate::{
    c32,
    chunk::{Baseline, VisChunk},
    constants::DEFAULT_POLARISATIONS,
    grid::{Axis, Grid},
    model::{EquationType, ModelConfig},
};

lazy_static::lazy_static! {
    pub static ref CONFIG_FILE_TYPES_COMMA_SEPARATED: String = ConfigFileType::iter().join(", ");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, EnumString)]
pub enum ConfigFileType {
    #[strum(serialize = "toml")]
    Toml,
    #[strum(serialize = "json")]
    Json,
    #[strum(to_string = "yaml", serialize = "yml")]
    Yaml,
}

impl ConfigFileType {
    /// The file type of a path, judged by its extension.
    pub fn from_path(path: &Path) -> Option<ConfigFileType> {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .and_then(|e| ConfigFileType::from_str(&e).ok())
    }
}

/// Everything needed for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub observation: ObservationConfig,

    #[serde(default)]
    pub model: ModelConfig,

    /// A parameter database to read values from. It's created if it doesn't
    /// exist.
    #[serde(default)]
    pub parm_db: Option<PathBuf>,

    #[serde(default)]
    pub steps: Vec<Step>,
}

impl RunConfig {
    /// Read a config file.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<RunConfig, ConfigError> {
        let path = path.as_ref();
        debug!("Attempting to parse config file {}", path.display());
        let file_type = ConfigFileType::from_path(path)
            .ok_or_else(|| ConfigError::UnknownFileType(path.to_path_buf()))?;

        let mut contents = String::new();
        File::open(path)
            .and_then(|mut fh| fh.read_to_string(&mut contents))
            .map_err(|err| ConfigError::Read {
                path: path.to_path_buf(),
                err,
            })?;
        RunConfig::parse(&contents, file_type).map_err(|err| ConfigError::Parse {
            path: path.to_path_buf(),
            file_type,
            err,
        })
    }

    /// Decode a config from a string. Errors are the decoder's message.
    pub fn parse(contents: &str, file_type: ConfigFileType) -> Result<RunConfig, String> {
        debug!("Parsing {file_type} config...");
        match file_type {
            ConfigFileType::Toml => toml::from_str(contents).map_err(|e| e.to_string()),
            ConfigFileType::Json => serde_json::from_str(contents).map_err(|e| e.to_string()),
            ConfigFileType::Yaml => serde_yaml::from_str(contents).map_err(|e| e.to_string()),
        }
    }

    /// Check everything that can be checked without running.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.observation.validate()?;
        if self.steps.is_empty() {
            return Err(ConfigError::NoSteps);
        }
        for (i, step) in self.steps.iter().enumerate() {
            step.validate().map_err(|reason| ConfigError::BadStep {
                step: i,
                kind: step.kind().to_string(),
                reason,
            })?;
        }
        Ok(())
    }
}

fn default_pols() -> Vec<String> {
    DEFAULT_POLARISATIONS.iter().map(|p| p.to_string()).collect()
}

fn default_true() -> bool {
    true
}

/// A synthetic observation: a regular grid of samples for every baseline of
/// some stations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObservationConfig {
    pub stations: Vec<String>,

    #[serde(default = "default_pols")]
    pub polarisations: Vec<String>,

    pub num_channels: usize,

    /// \[Hz\]
    pub freq_start: f64,

    /// \[Hz\]
    pub freq_res: f64,

    pub num_timeslots: usize,

    /// \[s\]
    #[serde(default)]
    pub time_start: f64,

    /// \[s\]
    pub time_res: f64,

    /// Are auto-correlations present?
    #[serde(default = "default_true")]
    pub autos: bool,

    /// The (real, imaginary) value of every visibility before any steps run.
    #[serde(default)]
    pub initial_vis: [f32; 2],
}

impl ObservationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let bad = |s: &str| Err(ConfigError::BadObservation(s.to_string()));
        if self.stations.is_empty() {
            return bad("no stations");
        }
        if self.stations.iter().duplicates().next().is_some() {
            return bad("station names must be unique");
        }
        if self.polarisations.is_empty() {
            return bad("no polarisations");
        }
        if self.num_channels == 0 || self.num_timeslots == 0 {
            return bad("there must be at least one channel and one timeslot");
        }
        if !(self.freq_res > 0.0 && self.time_res > 0.0) {
            return bad("resolutions must be positive");
        }
        if !self.autos && self.stations.len() < 2 {
            return bad("without auto-correlations, at least two stations are needed");
        }
        Ok(())
    }

    /// The sample grid of the observation.
    pub fn grid(&self) -> Grid {
        Grid::new(
            Axis::regular(self.freq_start, self.freq_res, self.num_channels),
            Axis::regular(self.time_start, self.time_res, self.num_timeslots),
        )
    }

    /// Every baseline, in station order.
    pub fn baselines(&self) -> Vec<Baseline> {
        let n = self.stations.len();
        (0..n)
            .flat_map(|s1| (s1..n).map(move |s2| Baseline::new(s1, s2)))
            .filter(|bl| self.autos || !bl.is_auto())
            .collect()
    }

    /// A chunk holding the whole observation.
    pub fn make_chunk(&self) -> Result<VisChunk, ConfigError> {
        self.validate()?;
        let mut chunk = VisChunk::zeroed(
            self.grid(),
            self.stations.clone(),
            self.baselines(),
            self.polarisations.clone(),
        )?;
        chunk
            .vis_mut()
            .fill(c32::new(self.initial_vis[0], self.initial_vis[1]));
        Ok(chunk)
    }
}

/// Which baselines and polarisations a step works on. Everything is selected
/// by default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SelectionConfig {
    /// "", "AUTO" or "CROSS".
    pub filter: String,

    /// Regular expressions on station names, paired with `stations2`.
    pub stations1: Vec<String>,
    pub stations2: Vec<String>,

    pub polarisations: Vec<String>,
}

/// One operation on the chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Step {
    /// Replace the visibilities with the model.
    Simulate {
        #[serde(default)]
        selection: SelectionConfig,

        /// Write the visibilities to this column afterwards.
        #[serde(default)]
        output_column: Option<String>,

        #[serde(default)]
        write_flags: bool,
    },

    /// Subtract the model from the visibilities.
    Subtract {
        #[serde(default)]
        selection: SelectionConfig,

        #[serde(default)]
        output_column: Option<String>,

        #[serde(default)]
        write_flags: bool,
    },

    /// Correct the visibilities for the instrument.
    Correct {
        #[serde(default)]
        selection: SelectionConfig,

        #[serde(default)]
        output_column: Option<String>,

        #[serde(default)]
        write_flags: bool,
    },

    /// Build normal equations for the solvable parameters.
    Construct {
        #[serde(default)]
        selection: SelectionConfig,

        /// Shell patterns of the parameters to solve for.
        solvable: Vec<String>,

        /// Shell patterns of parameters that mustn't be solved for.
        #[serde(default)]
        exclude: Vec<String>,

        /// The number of (channels, timeslots) in each solve-domain cell.
        cell_size: [usize; 2],

        /// Write the equations to this file in the output directory.
        #[serde(default)]
        output: Option<String>,
    },
}

impl Step {
    pub fn kind(&self) -> EquationType {
        match self {
            Step::Simulate { .. } => EquationType::Simulate,
            Step::Subtract { .. } => EquationType::Subtract,
            Step::Correct { .. } => EquationType::Correct,
            Step::Construct { .. } => EquationType::Construct,
        }
    }

    pub fn selection(&self) -> &SelectionConfig {
        match self {
            Step::Simulate { selection, .. }
            | Step::Subtract { selection, .. }
            | Step::Correct { selection, .. }
            | Step::Construct { selection, .. } => selection,
        }
    }

    fn validate(&self) -> Result<(), String> {
        let selection = self.selection();
        if selection.stations1.len() != selection.stations2.len() {
            return Err("stations1 and stations2 must have the same length".to_string());
        }
        match self {
            Step::Construct {
                solvable,
                cell_size,
                ..
            } => {
                if solvable.is_empty() {
                    return Err("no solvable parameters were given".to_string());
                }
                if cell_size.contains(&0) {
                    return Err("cell sizes must be positive".to_string());
                }
            }
            Step::Simulate { output_column, .. }
            | Step::Subtract { output_column, .. }
            | Step::Correct { output_column, .. } => {
                if matches!(output_column.as_deref(), Some("")) {
                    return Err("the output column name is empty".to_string());
                }
            }
        }
        Ok(())
    }
}
