// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Evaluating the model over the selected baselines in parallel.

use std::ops::Range;

use log::trace;
use ndarray::prelude::*;
use rayon::prelude::*;

use super::Kernel;
use crate::{
    c32, c64,
    chunk::VisChunk,
    grid::Location,
    model::{EquationType, EvalRequest, ModelEvaluator, Perturbed},
    normal_eq::{CellEquation, NormalEquation},
    parms::ParmRegistry,
    pol::{PolMap, Polarisation, NUM_POLS},
};

/// What to do with each baseline's model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum BaselineOp {
    /// Overwrite the visibilities with the model.
    Copy,

    /// Subtract the model from the visibilities.
    Subtract,

    /// Accumulate normal equations for the cells from `start` to `end`.
    Construct { start: Location, end: Location },
}

impl Kernel {
    /// Evaluate the model of every selected baseline over the given samples.
    /// Only [`BaselineOp::Construct`] produces equations.
    pub(super) fn process(
        &mut self,
        op: BaselineOp,
        channels: Range<usize>,
        timeslots: Range<usize>,
    ) -> Vec<CellEquation> {
        let n_perturbations = match op {
            BaselineOp::Construct { .. } => self.registry.num_unknowns(),
            BaselineOp::Copy | BaselineOp::Subtract => 0,
        };
        let request = match self.chunk.as_ref() {
            Some(chunk) => EvalRequest::new(chunk.grid(), channels, timeslots, n_perturbations),
            None => return vec![],
        };
        trace!(
            "Request {}: channels {:?}, timeslots {:?}, {} perturbations",
            request.id(),
            request.channels(),
            request.timeslots(),
            request.n_perturbations()
        );
        self.model.precalculate(&request, &self.registry);

        match op {
            BaselineOp::Copy => {
                self.rewrite(&request, false);
                vec![]
            }
            BaselineOp::Subtract => {
                self.rewrite(&request, true);
                vec![]
            }
            BaselineOp::Construct { start, end } => self.construct_cells(&request, start, end),
        }
    }

    /// Replace (or reduce) the selected visibilities by the model. Baselines
    /// own disjoint rows of the chunk, so rows are handed out in parallel.
    fn rewrite(&mut self, request: &EvalRequest, subtract: bool) {
        let Kernel {
            model,
            registry,
            chunk,
            selection,
            pol_map,
            equation_type,
            ..
        } = self;
        let (chunk, selection) = match (chunk.as_mut(), selection.as_ref()) {
            (Some(c), Some(s)) => (c, s),
            _ => return,
        };
        let model: &dyn ModelEvaluator = &**model;
        let registry: &ParmRegistry = registry;
        let correcting = *equation_type == Some(EquationType::Correct);

        let mut selected = vec![false; chunk.baselines().len()];
        for &i in selection.baselines.iter() {
            selected[i] = true;
        }
        let pols: Vec<(usize, Polarisation)> = selection
            .pols
            .iter()
            .filter_map(|&i| pol_map.get(i).map(|p| (i, p)))
            .collect();
        let storage: [Option<usize>; NUM_POLS] = std::array::from_fn(|p| {
            Polarisation::from_index(p).and_then(|pol| pol_map.storage_index(pol))
        });

        let channels = request.channels();
        let timeslots = request.timeslots();
        let (baselines, mut vis) = chunk.baselines_and_vis_mut();
        vis.outer_iter_mut()
            .into_par_iter()
            .zip(baselines.par_iter())
            .zip(selected.par_iter())
            .for_each(|((mut bl_vis, &baseline), &is_selected)| {
                if !is_selected {
                    return;
                }

                let observed = correcting.then(|| {
                    Array3::from_shape_fn(
                        (timeslots.len(), channels.len(), NUM_POLS),
                        |(t, c, p)| match storage[p] {
                            Some(sp) => {
                                let v = bl_vis[(timeslots.start + t, channels.start + c, sp)];
                                c64::new(v.re as f64, v.im as f64)
                            }
                            None => c64::default(),
                        },
                    )
                });
                let result = model.evaluate(
                    baseline,
                    request,
                    registry,
                    observed.as_ref().map(|o| o.view()),
                );

                for &(sp, pol) in &pols {
                    let value = &result.pols[pol.index()].value;
                    for ((t, c), m) in value.indexed_iter() {
                        let v = &mut bl_vis[(timeslots.start + t, channels.start + c, sp)];
                        *v = if subtract {
                            c32::new(
                                (v.re as f64 - m.re) as f32,
                                (v.im as f64 - m.im) as f32,
                            )
                        } else {
                            c32::new(m.re as f32, m.im as f32)
                        };
                    }
                }
            });
    }

    fn construct_cells(
        &self,
        request: &EvalRequest,
        start: Location,
        end: Location,
    ) -> Vec<CellEquation> {
        let (chunk, selection, layout) =
            match (self.chunk.as_ref(), self.selection.as_ref(), self.layout.as_ref()) {
                (Some(c), Some(s), Some(l)) => (c, s, l),
                _ => return vec![],
            };

        let cells = layout
            .locations(start, end)
            .map(|loc| {
                let (channels, timeslots) = layout.sample_ranges(loc);
                CellWork {
                    id: layout.cell_id(loc),
                    funklet: layout.local_index(loc),
                    channels,
                    timeslots,
                }
            })
            .collect();
        let session = ConstructSession {
            chunk,
            model: &*self.model,
            registry: &self.registry,
            pol_map: &self.pol_map,
            pols: selection.pols.as_slice(),
            request,
            cells,
            n_eq: self.registry.equation_size(),
        };
        session.run(selection.baselines.as_slice())
    }
}

/// One cell of a construct request. Sample ranges are chunk indices.
#[derive(Debug)]
struct CellWork {
    id: usize,
    /// The index of the cell's funklet in every parameter.
    funklet: usize,
    channels: Range<usize>,
    timeslots: Range<usize>,
}

/// Everything shared (read-only) by the workers of one construct call.
struct ConstructSession<'a> {
    chunk: &'a VisChunk,
    model: &'a dyn ModelEvaluator,
    registry: &'a ParmRegistry,
    pol_map: &'a PolMap,
    pols: &'a [usize],
    request: &'a EvalRequest,
    cells: Vec<CellWork>,
    n_eq: usize,
}

/// Scratch buffers and private equation replicas of one worker.
struct ThreadContext {
    equations: Vec<NormalEquation>,
    /// Equation indices of the unknowns a baseline depends on.
    index: Vec<usize>,
    inv_delta: Vec<f64>,
    deriv_re: Vec<f64>,
    deriv_im: Vec<f64>,
    /// Full-length derivative rows for the dense branch.
    dense_re: Vec<f64>,
    dense_im: Vec<f64>,
}

impl ThreadContext {
    fn new(num_cells: usize, n_eq: usize) -> ThreadContext {
        ThreadContext {
            equations: (0..num_cells).map(|_| NormalEquation::new(n_eq)).collect(),
            index: Vec::with_capacity(n_eq),
            inv_delta: Vec::with_capacity(n_eq),
            deriv_re: Vec::with_capacity(n_eq),
            deriv_im: Vec::with_capacity(n_eq),
            dense_re: vec![0.0; n_eq],
            dense_im: vec![0.0; n_eq],
        }
    }

    fn merge(mut self, other: ThreadContext) -> ThreadContext {
        for (mine, theirs) in self.equations.iter_mut().zip(other.equations.iter()) {
            mine.merge(theirs);
        }
        self
    }
}

impl ConstructSession<'_> {
    fn run(&self, baselines: &[usize]) -> Vec<CellEquation> {
        let num_cells = self.cells.len();
        let ctx = baselines
            .par_iter()
            .fold(
                || ThreadContext::new(num_cells, self.n_eq),
                |mut ctx, &i_bl| {
                    self.construct_baseline(&mut ctx, i_bl);
                    ctx
                },
            )
            .reduce_with(ThreadContext::merge)
            .unwrap_or_else(|| ThreadContext::new(num_cells, self.n_eq));

        self.cells
            .iter()
            .zip(ctx.equations)
            .map(|(cell, equation)| CellEquation {
                id: cell.id,
                equation,
            })
            .collect()
    }

    fn construct_baseline(&self, ctx: &mut ThreadContext, i_bl: usize) {
        let baseline = self.chunk.baselines()[i_bl];
        let result = self
            .model
            .evaluate(baseline, self.request, self.registry, None);
        let vis = self.chunk.vis();
        let flags = self.chunk.flags();
        let baseline_flags = self.chunk.baseline_flags();
        let c0 = self.request.channels().start;
        let t0 = self.request.timeslots().start;

        for &sp in self.pols {
            let pol = match self.pol_map.get(sp) {
                Some(p) => p,
                None => continue,
            };
            let model = &result.pols[pol.index()];
            if model.perturbed.is_empty() {
                continue;
            }

            ctx.index.clear();
            ctx.index
                .extend(model.perturbed.keys().map(|&u| self.registry.target(u)));
            let perturbed: Vec<&Perturbed> = model.perturbed.values().collect();
            let n = perturbed.len();
            ctx.deriv_re.resize(n, 0.0);
            ctx.deriv_im.resize(n, 0.0);
            let dense = n == self.n_eq;

            for (cell, equation) in self.cells.iter().zip(ctx.equations.iter_mut()) {
                ctx.inv_delta.clear();
                ctx.inv_delta
                    .extend(perturbed.iter().map(|p| 1.0 / p.deltas[cell.funklet]));

                for t in cell.timeslots.clone() {
                    if baseline_flags[(i_bl, t)] {
                        continue;
                    }
                    for c in cell.channels.clone() {
                        if flags[(i_bl, t, c, sp)] {
                            continue;
                        }
                        let obs = vis[(i_bl, t, c, sp)];
                        let pred = model.value[(t - t0, c - c0)];
                        let residual = c64::new(obs.re as f64, obs.im as f64) - pred;

                        for (i, p) in perturbed.iter().enumerate() {
                            let d = (p.values[(t - t0, c - c0)] - pred) * ctx.inv_delta[i];
                            ctx.deriv_re[i] = d.re;
                            ctx.deriv_im[i] = d.im;
                        }

                        if dense {
                            for (i, &target) in ctx.index.iter().enumerate() {
                                ctx.dense_re[target] = ctx.deriv_re[i];
                                ctx.dense_im[target] = ctx.deriv_im[i];
                            }
                            equation.add_dense(&ctx.dense_re, residual.re);
                            equation.add_dense(&ctx.dense_im, residual.im);
                        } else {
                            equation.add_sparse(&ctx.index, &ctx.deriv_re, residual.re);
                            equation.add_sparse(&ctx.index, &ctx.deriv_im, residual.im);
                        }
                    }
                }
            }
        }
    }
}
