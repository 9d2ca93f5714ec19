// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Command-line interface code.
//!
//! Only 3 things should be public in this module: `Args`, `Args::run`, and
//! `CliError`.

mod error;
#[cfg(test)]
mod tests;

pub use error::CliError;

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use clap::{AppSettings, Parser};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{debug, info};
use serde::Serialize;

use crate::{
    config::{RunConfig, Step},
    model::{GainModel, ModelConfig},
    normal_eq::CellEquation,
    storage::{JsonVisWriter, MemoryParmStore},
    Kernel, PROGRESS_BARS,
};

// Add build-time information from the "built" crate.
include!(concat!(env!("OUT_DIR"), "/built.rs"));

#[derive(Debug, Parser)]
#[clap(
    version,
    author,
    about = r#"Build calibration normal equations, or simulate, subtract and correct visibilities, for a chunk of radio-interferometer data.
The run is described by a config file (toml, json or yaml)."#
)]
#[clap(global_setting(AppSettings::DeriveDisplayOrder))]
#[clap(infer_long_args = true)]
pub struct Args {
    /// The run configuration.
    #[clap(name = "CONFIG_FILE", parse(from_os_str))]
    config: PathBuf,

    /// The directory that output columns and equations are written to.
    #[clap(short, long, default_value = ".", parse(from_os_str))]
    output_dir: PathBuf,

    /// Don't draw progress bars.
    #[clap(long)]
    no_progress_bars: bool,

    /// The verbosity of the program. Increase by specifying multiple times
    /// (e.g. -vv). The default is to print only high-level information.
    #[clap(short, long, parse(from_occurrences))]
    verbosity: u8,

    /// Only verify that the config was correctly ingested and print out
    /// high-level information.
    #[clap(long)]
    dry_run: bool,
}

impl Args {
    pub fn run(self) -> Result<(), CliError> {
        let Args {
            config,
            output_dir,
            no_progress_bars,
            verbosity,
            dry_run,
        } = self;
        setup_logging(verbosity).expect("Failed to initialise logging.");
        // Enable progress bars if the user didn't say "no progress bars".
        if !no_progress_bars {
            PROGRESS_BARS.store(true);
        }

        info!("hyperdrive-kernel {}", env!("CARGO_PKG_VERSION"));
        display_build_info();

        let config = RunConfig::read(&config)?;
        config.validate()?;
        display_config(&config);
        if dry_run {
            info!("Dry run -- exiting now.");
            return Ok(());
        }

        run_config(&config, &output_dir)?;
        info!("hyperdrive-kernel complete.");
        Ok(())
    }
}

/// Run every step of a (validated) config.
fn run_config(config: &RunConfig, output_dir: &Path) -> Result<(), CliError> {
    let store = match &config.parm_db {
        Some(path) => MemoryParmStore::open(path)?,
        None => MemoryParmStore::new(),
    };
    let mut kernel = Kernel::new(Box::new(GainModel::new()), Box::new(store));
    kernel.attach_chunk(config.observation.make_chunk()?)?;
    let mut writer = JsonVisWriter::new(output_dir);

    let pb = make_step_progress_bar(config.steps.len());
    for (i_step, step) in config.steps.iter().enumerate() {
        pb.set_message(format!("Step {} ({})", i_step + 1, step.kind()));
        run_step(&mut kernel, &config.model, step, &mut writer, output_dir)?;
        pb.inc(1);
    }
    pb.finish_with_message("Steps complete");
    Ok(())
}

fn run_step(
    kernel: &mut Kernel,
    model: &ModelConfig,
    step: &Step,
    writer: &mut JsonVisWriter,
    output_dir: &Path,
) -> Result<(), CliError> {
    info!("Running {} step", step.kind());
    kernel.make_equations(step.kind(), model)?;
    let selection = step.selection();
    kernel.set_selection(
        &selection.filter,
        &selection.stations1,
        &selection.stations2,
        &selection.polarisations,
    )?;

    let output = match step {
        Step::Simulate {
            output_column,
            write_flags,
            ..
        } => {
            kernel.simulate()?;
            output_column.as_ref().map(|c| (c, *write_flags))
        }
        Step::Subtract {
            output_column,
            write_flags,
            ..
        } => {
            kernel.subtract()?;
            output_column.as_ref().map(|c| (c, *write_flags))
        }
        Step::Correct {
            output_column,
            write_flags,
            ..
        } => {
            kernel.correct()?;
            output_column.as_ref().map(|c| (c, *write_flags))
        }
        Step::Construct {
            solvable,
            exclude,
            cell_size,
            output,
            ..
        } => {
            let num_solvable = kernel.set_solvable_parameters(solvable, exclude)?;
            let grid = kernel.cell_grid_from_size(cell_size[0], cell_size[1])?;
            kernel.set_cell_grid(&grid)?;
            info!("Solving for {num_solvable} parameters");

            let cells = kernel.layout().map(|l| (l.first(), l.last()));
            if let Some((start, end)) = cells {
                let equations = kernel.construct(start, end);
                let count: usize = equations.iter().map(|e| e.equation.count()).sum();
                info!(
                    "Constructed equations for {} cells from {count} observations",
                    equations.len()
                );
                if let Some(output) = output {
                    write_equations(&output_dir.join(output), &equations)?;
                }
            }
            None
        }
    };

    if let Some((column, write_flags)) = output {
        kernel.write_chunk(writer, column, write_flags)?;
    }
    Ok(())
}

/// The serialised form of one cell's equations.
#[derive(Serialize)]
struct EquationRecord {
    id: usize,
    count: usize,
    sum_sq: f64,
    normal: Vec<Vec<f64>>,
    rhs: Vec<f64>,
}

fn write_equations(path: &Path, equations: &[CellEquation]) -> Result<(), CliError> {
    let records: Vec<EquationRecord> = equations
        .iter()
        .map(|CellEquation { id, equation }| EquationRecord {
            id: *id,
            count: equation.count(),
            sum_sq: equation.sum_sq(),
            normal: equation
                .normal_matrix()
                .outer_iter()
                .map(|row| row.to_vec())
                .collect(),
            rhs: equation.rhs().to_vec(),
        })
        .collect();
    let mut f = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut f, &records)?;
    f.flush()?;
    info!("Wrote equations to {}", path.display());
    Ok(())
}

fn make_step_progress_bar(num_steps: usize) -> ProgressBar {
    ProgressBar::with_draw_target(
        Some(num_steps as _),
        if PROGRESS_BARS.load() {
            // Use stdout, not stderr, because the messages printed by the
            // progress bar are valuable.
            ProgressDrawTarget::stdout()
        } else {
            ProgressDrawTarget::hidden()
        },
    )
    .with_style(
        ProgressStyle::default_bar()
            .template("{msg:24}: [{wide_bar:.blue}] {pos:3}/{len:3} ({elapsed_precise}<{eta_precise})")
            .unwrap()
            .progress_chars("=> "),
    )
    .with_position(0)
    .with_message("Steps")
}

fn display_config(config: &RunConfig) {
    let obs = &config.observation;
    info!(
        "{} stations, {} baselines, polarisations {}",
        obs.stations.len(),
        obs.baselines().len(),
        obs.polarisations.join(", ")
    );
    info!(
        "{} channels of {} Hz from {} Hz; {} timeslots of {} s from {} s",
        obs.num_channels,
        obs.freq_res,
        obs.freq_start,
        obs.num_timeslots,
        obs.time_res,
        obs.time_start
    );
    info!(
        "Model: gains {}, source flux {} Jy",
        if config.model.gains { "on" } else { "off" },
        config.model.flux
    );
    match &config.parm_db {
        Some(p) => info!("Parameter database: {}", p.display()),
        None => info!("Parameter database: <none>"),
    }
    for (i, step) in config.steps.iter().enumerate() {
        debug!("Step {}: {step:?}", i + 1);
    }
}

/// Activate a logger. All log messages are put onto `stdout`. `env_logger`
/// automatically only uses colours and fancy symbols if we're on a tty (e.g. a
/// terminal); piped output will be formatted sensibly. Source code lines are
/// displayed in log messages when verbosity >= 3.
fn setup_logging(verbosity: u8) -> Result<(), log::SetLoggerError> {
    let mut builder = env_logger::Builder::from_default_env();
    builder.target(env_logger::Target::Stdout);
    builder.format_target(false);
    match verbosity {
        0 => builder.filter_level(log::LevelFilter::Info),
        1 => builder.filter_level(log::LevelFilter::Debug),
        2 => builder.filter_level(log::LevelFilter::Trace),
        _ => {
            builder.filter_level(log::LevelFilter::Trace);
            builder.format(|buf, record| {
                let timestamp = buf.timestamp();
                let level = record.level();
                let target = record.target();
                let line = record.line().unwrap_or(0);
                let message = record.args();

                writeln!(buf, "[{timestamp} {level} {target}:{line}] {message}")
            })
        }
    };
    builder.try_init()
}

/// Write info-level log lines of how this executable was compiled.
fn display_build_info() {
    info!("Compiled at {}", BUILT_TIME_UTC);
    info!("         with compiler {}", RUSTC_VERSION);
    info!("         for {} ({} profile)", TARGET, PROFILE);
    info!("");
}
