// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The per-process calibration kernel.
//!
//! A [`Kernel`] owns one chunk of visibilities at a time. With a model and a
//! parameter store attached, it can rewrite the chunk (simulate, subtract,
//! correct), or build the normal equations needed to refine the solvable
//! parameters on a grid of solve-domain cells. Solving the equations is left
//! to the caller.

mod cells;
mod process;

pub use cells::CellLayout;

use log::{debug, error, info, warn};
use strum_macros::Display;

use process::BaselineOp;

use crate::{
    chunk::VisChunk,
    grid::{Grid, Location},
    model::{EquationType, ModelConfig, ModelEvaluator},
    normal_eq::CellEquation,
    parms::{CellCoeff, CoeffIndex, ParmRegistry},
    pol::PolMap,
    selection::{BaselineFilter, VisSelection},
    storage::{ParmStore, ParmValueSet, StorageError, VisWriter},
    KernelError,
};

/// Where the kernel is in a construct cycle.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum KernelState {
    /// No chunk is attached.
    Unset,

    /// A chunk is attached and baselines and polarisations are selected.
    Selected,

    /// Solve-domain cells and their coefficients are known.
    GridSet,

    /// Equations are being accumulated.
    Constructing,

    /// Equations have been handed out.
    Ready,
}

/// The calibration kernel of one process.
///
/// A kernel owns at most one chunk at a time, together with everything
/// derived from it: the baseline and polarisation selection, the registered
/// parameters and the solve-domain cells overlapping the chunk. The model is
/// evaluated through a [`ModelEvaluator`]; parameter values come from (and go
/// back to) a [`ParmStore`].
///
/// Configuration mistakes are returned as [`KernelError`]s and leave the
/// previous state in place. Calling an operation in the wrong [`KernelState`]
/// is a programming error and panics.
pub struct Kernel {
    model: Box<dyn ModelEvaluator>,
    store: Box<dyn ParmStore>,
    chunk: Option<VisChunk>,
    pol_map: PolMap,
    selection: Option<VisSelection>,

    /// Stored values of every parameter overlapping the attached chunk.
    parm_values: ParmValueSet,

    registry: ParmRegistry,
    equation_type: Option<EquationType>,
    layout: Option<CellLayout>,
    state: KernelState,
}

impl Kernel {
    pub fn new(model: Box<dyn ModelEvaluator>, store: Box<dyn ParmStore>) -> Kernel {
        Kernel {
            model,
            store,
            chunk: None,
            pol_map: PolMap::default(),
            selection: None,
            parm_values: ParmValueSet::new(),
            registry: ParmRegistry::new(),
            equation_type: None,
            layout: None,
            state: KernelState::Unset,
        }
    }

    pub fn state(&self) -> KernelState {
        self.state
    }

    pub fn chunk(&self) -> Option<&VisChunk> {
        self.chunk.as_ref()
    }

    /// Mutable access to the attached chunk's data, e.g. to flag samples.
    pub fn chunk_mut(&mut self) -> Option<&mut VisChunk> {
        self.chunk.as_mut()
    }

    pub fn pol_map(&self) -> &PolMap {
        &self.pol_map
    }

    pub fn selection(&self) -> Option<&VisSelection> {
        self.selection.as_ref()
    }

    pub fn registry(&self) -> &ParmRegistry {
        &self.registry
    }

    pub fn layout(&self) -> Option<&CellLayout> {
        self.layout.as_ref()
    }

    pub fn parm_store(&self) -> &dyn ParmStore {
        &*self.store
    }

    fn reset_calibration(&mut self) {
        self.registry.clear();
        self.equation_type = None;
        self.layout = None;
    }

    /// Take ownership of a chunk, replacing any attached one, and load the
    /// stored values of every parameter overlapping it. Everything is
    /// selected by default.
    ///
    /// If the stored values can't be loaded, the chunk is dropped and the
    /// kernel is left without one.
    pub fn attach_chunk(&mut self, chunk: VisChunk) -> Result<(), KernelError> {
        self.reset_calibration();
        self.chunk = None;
        self.selection = None;
        self.parm_values.clear();
        self.state = KernelState::Unset;

        let pol_map = PolMap::new(chunk.pols());

        let domain = chunk.grid().bbox();
        let mut values = ParmValueSet::new();
        if let Err(e) = self
            .store
            .names()
            .and_then(|names| self.store.get_values(&mut values, &names, &domain))
        {
            error!("Couldn't load parameter values for the chunk: {e}");
            return Err(e.into());
        }
        let selection = VisSelection::all(&chunk, &pol_map)?;

        info!(
            "Attached chunk: {} baselines, {} channels, {} timeslots, {} polarisations",
            chunk.baselines().len(),
            chunk.num_channels(),
            chunk.num_timeslots(),
            chunk.pols().len()
        );
        debug!("Loaded stored values for {} parameters", values.len());
        self.pol_map = pol_map;
        self.parm_values = values;
        self.selection = Some(selection);
        self.chunk = Some(chunk);
        self.state = KernelState::Selected;
        Ok(())
    }

    /// Give back the attached chunk, forgetting everything derived from it.
    pub fn detach_chunk(&mut self) -> Option<VisChunk> {
        self.reset_calibration();
        self.selection = None;
        self.parm_values.clear();
        self.state = KernelState::Unset;
        self.chunk.take()
    }

    /// Have the model register its parameters for `kind`, and give them their
    /// stored values. Any solvable parameters and cells are forgotten.
    pub fn make_equations(
        &mut self,
        kind: EquationType,
        config: &ModelConfig,
    ) -> Result<(), KernelError> {
        let chunk = self.chunk.as_ref().ok_or(KernelError::NoChunk)?;
        let mut registry = ParmRegistry::new();
        self.model.make_equations(
            kind,
            config,
            chunk.stations(),
            chunk.baselines(),
            &mut registry,
        )?;
        registry.fill(&self.parm_values, &chunk.grid().bbox());
        debug!("Model registered {} parameters for {kind}", registry.len());

        self.registry = registry;
        self.equation_type = Some(kind);
        self.layout = None;
        self.state = KernelState::Selected;
        Ok(())
    }

    /// Select baselines and polarisations.
    ///
    /// `filter` is "", "AUTO" or "CROSS". `stations1` and `stations2` are
    /// paired regular expressions on station names; if both are empty, every
    /// baseline passing the filter is selected. If `pols` is empty, every
    /// recognised polarisation is selected. On failure, the previous
    /// selection is kept.
    pub fn set_selection<S: AsRef<str>>(
        &mut self,
        filter: &str,
        stations1: &[S],
        stations2: &[S],
        pols: &[S],
    ) -> Result<(), KernelError> {
        let chunk = self.chunk.as_ref().ok_or(KernelError::NoChunk)?;
        let filter = BaselineFilter::parse(filter)?;
        let selection =
            VisSelection::new(chunk, &self.pol_map, filter, stations1, stations2, pols)?;
        debug!(
            "Selected {} baselines and {} polarisations",
            selection.baselines.len(),
            selection.pols.len()
        );
        self.selection = Some(selection);
        Ok(())
    }

    /// Choose the solvable parameters with shell patterns. Returns the number
    /// of solvable parameters. A cell grid has to be set afterwards.
    pub fn set_solvable_parameters<S: AsRef<str>>(
        &mut self,
        include: &[S],
        exclude: &[S],
    ) -> Result<usize, KernelError> {
        let n = self.registry.set_solvable(include, exclude)?;
        self.layout = None;
        if self.chunk.is_some() {
            self.state = KernelState::Selected;
        }
        Ok(n)
    }

    /// A calibration grid aligned with the chunk's samples, with `channels`
    /// by `timeslots` samples per cell.
    pub fn cell_grid_from_size(
        &self,
        channels: usize,
        timeslots: usize,
    ) -> Result<Grid, KernelError> {
        let chunk = self.chunk.as_ref().ok_or(KernelError::NoChunk)?;
        Ok(chunk.grid().group(channels, timeslots)?)
    }

    /// Set up the solve-domain cells of `grid` that overlap the chunk. Every
    /// parameter gets one funklet per overlapping cell. Returns the number of
    /// solvable coefficients per cell. On failure nothing changes.
    pub fn set_cell_grid(&mut self, grid: &Grid) -> Result<usize, KernelError> {
        let chunk = self.chunk.as_ref().ok_or(KernelError::NoChunk)?;
        let layout = CellLayout::new(grid, chunk.grid())?;
        let boxes = layout.cell_boxes(chunk.grid());
        let num_coeffs = self.registry.init_cells(&boxes)?;
        info!(
            "{} solve-domain cells overlap the chunk, with {num_coeffs} coefficients each",
            layout.num_cells()
        );
        self.layout = Some(layout);
        self.state = KernelState::GridSet;
        Ok(num_coeffs)
    }

    /// The locally-numbered coefficient index.
    pub fn coeff_index(&self) -> &CoeffIndex {
        self.registry.coeff_index()
    }

    /// Use a cluster-wide coefficient numbering for coefficient exchange and
    /// equations.
    ///
    /// # Panics
    ///
    /// Panics if a solvable parameter is missing from `global`.
    pub fn set_coeff_index(&mut self, global: &CoeffIndex) {
        self.registry.set_coeff_index(global);
    }

    /// The solvable coefficients of the cells from `start` to `end`
    /// (inclusive), clipped to the cells overlapping the chunk.
    pub fn get_coeff(&self, start: Location, end: Location) -> Vec<CellCoeff> {
        let layout = match &self.layout {
            Some(l) => l,
            None => return vec![],
        };
        let (start, end) = (layout.clip(start), layout.clip(end));
        layout
            .locations(start, end)
            .map(|loc| CellCoeff {
                id: layout.cell_id(loc),
                coeff: self.registry.cell_coeffs(layout.local_index(loc)),
            })
            .collect()
    }

    /// Overwrite solvable coefficients. Cells that don't overlap the chunk
    /// are skipped.
    ///
    /// # Panics
    ///
    /// Panics if a coefficient vector doesn't have one value per unknown of
    /// the equations (i.e. the length of the global coefficient index if one
    /// was set, the local one otherwise).
    pub fn set_coeff(&mut self, solutions: &[CellCoeff]) {
        let layout = match &self.layout {
            Some(l) => l,
            None => return,
        };
        for solution in solutions {
            match layout.local_index_of_id(solution.id) {
                Some(cell) => self.registry.set_cell_coeffs(cell, &solution.coeff),
                None => warn!("Skipping coefficients of cell {}", solution.id),
            }
        }
    }

    fn rewrite_chunk(&mut self, kind: EquationType, op: BaselineOp) -> Result<(), KernelError> {
        let chunk = self.chunk.as_ref().ok_or(KernelError::NoChunk)?;
        assert_eq!(
            self.equation_type,
            Some(kind),
            "The model wasn't set up to {kind}"
        );
        let (channels, timeslots) = (0..chunk.num_channels(), 0..chunk.num_timeslots());
        debug!("Running {kind} over the whole chunk");
        self.process(op, channels, timeslots);
        Ok(())
    }

    /// Replace the selected visibilities with the model.
    pub fn simulate(&mut self) -> Result<(), KernelError> {
        self.rewrite_chunk(EquationType::Simulate, BaselineOp::Copy)
    }

    /// Subtract the model from the selected visibilities.
    pub fn subtract(&mut self) -> Result<(), KernelError> {
        self.rewrite_chunk(EquationType::Subtract, BaselineOp::Subtract)
    }

    /// Correct the selected visibilities for the model's instrument.
    pub fn correct(&mut self) -> Result<(), KernelError> {
        self.rewrite_chunk(EquationType::Correct, BaselineOp::Copy)
    }

    /// Build the normal equations of the cells from `start` to `end`
    /// (inclusive on both axes).
    ///
    /// # Panics
    ///
    /// Panics if no cell grid is set, if the model wasn't set up to
    /// construct, or if the range isn't within the cells overlapping the
    /// chunk.
    pub fn construct(&mut self, start: Location, end: Location) -> Vec<CellEquation> {
        assert!(
            matches!(self.state, KernelState::GridSet | KernelState::Ready),
            "Can't construct equations before a cell grid is set (state: {})",
            self.state
        );
        assert_eq!(
            self.equation_type,
            Some(EquationType::Construct),
            "The model wasn't set up to construct equations"
        );
        let layout = match &self.layout {
            Some(l) => l,
            None => panic!("Can't construct equations without solve-domain cells"),
        };
        assert!(
            layout.contains(start)
                && layout.contains(end)
                && start.freq <= end.freq
                && start.time <= end.time,
            "Cell range {start:?} to {end:?} isn't within {:?} to {:?}",
            layout.first(),
            layout.last()
        );
        let (channels, timeslots) = layout.span(start, end);

        self.state = KernelState::Constructing;
        let equations = self.process(BaselineOp::Construct { start, end }, channels, timeslots);
        debug!("Constructed equations for {} cells", equations.len());
        self.state = KernelState::Ready;
        equations
    }

    /// Write the selected visibilities (and optionally their flags) to
    /// `column`.
    pub fn write_chunk(
        &self,
        writer: &mut dyn VisWriter,
        column: &str,
        write_flags: bool,
    ) -> Result<(), KernelError> {
        let (chunk, selection) = match (&self.chunk, &self.selection) {
            (Some(c), Some(s)) => (c, s),
            _ => return Err(KernelError::NoChunk),
        };
        writer.write(selection, chunk, column, write_flags)?;
        Ok(())
    }

    /// Store the funklets of every solvable parameter, either for all cells or
    /// only the cell with id `cell`, and flush the store.
    pub fn save_parameters(&mut self, cell: Option<usize>) -> Result<(), KernelError> {
        let local = match cell {
            Some(id) => match self.layout.as_ref().and_then(|l| l.local_index_of_id(id)) {
                Some(i) => Some(i),
                None => {
                    warn!("Cell {id} doesn't overlap the chunk; nothing to save");
                    return Ok(());
                }
            },
            None => None,
        };

        if let Err(e) = self.put_solvables(local) {
            error!("Couldn't save parameters: {e}");
            return Err(e.into());
        }
        debug!(
            "Saved {} solvable parameters",
            self.registry.solvable().count()
        );
        Ok(())
    }

    fn put_solvables(&mut self, cell: Option<usize>) -> Result<(), StorageError> {
        for parm in self.registry.solvable() {
            let funklets = match cell {
                Some(i) => parm.funklets.get(i..=i).unwrap_or_default(),
                None => parm.funklets.as_slice(),
            };
            self.store.put_values(&parm.name, funklets)?;
        }
        self.store.flush()
    }
}
