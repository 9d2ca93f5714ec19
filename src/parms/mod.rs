// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Parameters, their funklets, and the numbering of solvable coefficients.
//!
//! Every solve-domain cell has its own unknown vector. A solvable parameter
//! occupies the same slice of every cell's vector; that slice is recorded in
//! a [`CoeffIndex`]. When a cluster-wide index has been supplied with
//! [`ParmRegistry::set_coeff_index`], the local slices are translated into
//! the global numbering.

mod coeff_index;
mod funklet;

pub use coeff_index::{CoeffIndex, CoeffInterval};
pub use funklet::Funklet;

use glob::Pattern;
use indexmap::IndexMap;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    grid::{BBox, GridError},
    storage::ParmValueSet,
};

#[derive(Error, Debug)]
pub enum ParmError {
    #[error("Couldn't compile parameter pattern '{pattern}': {err}")]
    Pattern {
        pattern: String,
        err: glob::PatternError,
    },

    #[error("No parameters matched the solvable patterns")]
    NoSolvables,
}

/// The solvable coefficients of one solve-domain cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellCoeff {
    /// The linear id of the cell in the calibration grid.
    pub id: usize,
    pub coeff: Vec<f64>,
}

/// A named model parameter.
#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: String,

    /// Used wherever no funklet covers a sample.
    pub default: Funklet,

    /// Stored values overlapping the chunk, or one funklet per solve-domain
    /// cell once a grid has been set.
    pub funklets: Vec<Funklet>,

    pub solvable: bool,
}

impl Parameter {
    fn new(name: &str, default: Funklet) -> Parameter {
        Parameter {
            name: name.to_string(),
            default,
            funklets: vec![],
            solvable: false,
        }
    }

    /// The index of the funklet whose domain contains the point.
    pub fn funklet_index_at(&self, freq: f64, time: f64) -> Option<usize> {
        self.funklets
            .iter()
            .position(|f| f.domain.contains(freq, time))
    }

    /// The funklet that applies at the point.
    pub fn funklet_at(&self, freq: f64, time: f64) -> &Funklet {
        match self.funklet_index_at(freq, time) {
            Some(i) => &self.funklets[i],
            None => &self.default,
        }
    }

    pub fn value_at(&self, freq: f64, time: f64) -> f64 {
        self.funklet_at(freq, time).eval(freq, time)
    }

    /// A funklet for one cell, initialised from whatever currently covers the
    /// cell's centre. Solvable parameters take the default's shape and
    /// solvable mask; the rest keep their full polynomial.
    fn cell_funklet(&self, domain: BBox) -> Funklet {
        let (freq, time) = domain.center();
        let mut funklet = self.funklet_at(freq, time).rescaled(domain);
        if self.solvable {
            funklet = funklet.reshaped(&self.default);
        }
        funklet.scid = None;
        funklet
    }
}

#[derive(Debug, Clone)]
struct GlobalNumbering {
    /// Local unknown index -> global unknown index.
    map: Vec<usize>,
    total: usize,
}

/// All parameters known to the current model, in registration order.
#[derive(Debug, Clone, Default)]
pub struct ParmRegistry {
    parms: IndexMap<String, Parameter>,

    /// Indices of the solvable parameters, ascendingly.
    active: Vec<usize>,

    coeff_index: CoeffIndex,

    global: Option<GlobalNumbering>,
}

impl ParmRegistry {
    pub fn new() -> ParmRegistry {
        ParmRegistry::default()
    }

    pub fn clear(&mut self) {
        *self = ParmRegistry::default();
    }

    /// Register a parameter and return its index. Registering a name twice
    /// returns the original index and keeps the original default.
    pub fn register(&mut self, name: &str, default: Funklet) -> usize {
        if let Some(i) = self.parms.get_index_of(name) {
            return i;
        }
        let (i, _) = self
            .parms
            .insert_full(name.to_string(), Parameter::new(name, default));
        i
    }

    pub fn len(&self) -> usize {
        self.parms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parms.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.parms.get(name)
    }

    pub fn get_index(&self, i: usize) -> Option<&Parameter> {
        self.parms.get_index(i).map(|(_, p)| p)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.parms.get_index_of(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.parms.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.parms.keys().map(|k| k.as_str())
    }

    /// The solvable parameters, in registration order.
    pub fn solvable(&self) -> impl Iterator<Item = &Parameter> {
        self.active.iter().filter_map(|&i| self.get_index(i))
    }

    /// Replace every parameter's funklets with the stored values that overlap
    /// `domain`. Stored funklets keep their own shape.
    pub fn fill(&mut self, values: &ParmValueSet, domain: &BBox) {
        for parm in self.parms.values_mut() {
            parm.funklets = values
                .get(&parm.name)
                .map(|funklets| {
                    funklets
                        .iter()
                        .filter(|f| f.domain.overlaps(domain))
                        .map(|f| Funklet {
                            scid: None,
                            ..f.clone()
                        })
                        .collect()
                })
                .unwrap_or_default();
            trace!(
                "Parameter '{}' has {} stored funklets",
                parm.name,
                parm.funklets.len()
            );
        }
    }

    /// Choose the solvable parameters: those matching any of the `include`
    /// shell patterns and none of the `exclude` patterns. Returns the number
    /// of solvable parameters. Any coefficient numbering is discarded.
    pub fn set_solvable<S: AsRef<str>>(
        &mut self,
        include: &[S],
        exclude: &[S],
    ) -> Result<usize, ParmError> {
        let compile = |patterns: &[S]| -> Result<Vec<Pattern>, ParmError> {
            patterns
                .iter()
                .map(|p| {
                    Pattern::new(p.as_ref()).map_err(|err| ParmError::Pattern {
                        pattern: p.as_ref().to_string(),
                        err,
                    })
                })
                .collect()
        };
        let include = compile(include)?;
        let exclude = compile(exclude)?;

        let active: Vec<usize> = self
            .parms
            .keys()
            .enumerate()
            .filter(|(_, name)| {
                include.iter().any(|p| p.matches(name)) && !exclude.iter().any(|p| p.matches(name))
            })
            .map(|(i, _)| i)
            .collect();
        if active.is_empty() {
            return Err(ParmError::NoSolvables);
        }

        for (i, parm) in self.parms.values_mut().enumerate() {
            parm.solvable = active.binary_search(&i).is_ok();
            for funklet in parm.funklets.iter_mut() {
                funklet.scid = None;
            }
        }
        debug!("{} solvable parameters", active.len());
        self.active = active;
        self.coeff_index = CoeffIndex::new();
        self.global = None;
        Ok(self.active.len())
    }

    /// Give every parameter one funklet per cell box and number the solvable
    /// coefficients. Nothing changes if there would be no coefficients.
    pub(crate) fn init_cells(&mut self, boxes: &[BBox]) -> Result<usize, GridError> {
        let mut index = CoeffIndex::new();
        let mut all_funklets = Vec::with_capacity(self.parms.len());
        for parm in self.parms.values() {
            let mut funklets: Vec<Funklet> = boxes.iter().map(|b| parm.cell_funklet(*b)).collect();
            if parm.solvable {
                let interval = index.insert(&parm.name, parm.default.num_solvable());
                for funklet in funklets.iter_mut() {
                    funklet.scid = Some(interval.start);
                }
            }
            all_funklets.push(funklets);
        }
        if index.total() == 0 {
            return Err(GridError::NoCoefficients);
        }

        for (parm, funklets) in self.parms.values_mut().zip(all_funklets) {
            parm.funklets = funklets;
        }
        self.coeff_index = index;
        self.global = None;
        Ok(self.coeff_index.total())
    }

    /// The locally-numbered coefficient index.
    pub fn coeff_index(&self) -> &CoeffIndex {
        &self.coeff_index
    }

    /// Use a cluster-wide numbering for coefficients from now on.
    ///
    /// # Panics
    ///
    /// Panics if a solvable parameter isn't in `global`, or has a different
    /// number of coefficients there.
    pub fn set_coeff_index(&mut self, global: &CoeffIndex) {
        let mut map = vec![0; self.coeff_index.total()];
        for (name, local) in self.coeff_index.iter() {
            let target = global.get(name).unwrap_or_else(|| {
                panic!("Parameter '{name}' is missing from the global coefficient index")
            });
            assert_eq!(
                target.length, local.length,
                "Parameter '{name}' has a different coefficient count in the global index"
            );
            for j in 0..local.length {
                map[local.start + j] = target.start + j;
            }
        }
        self.global = Some(GlobalNumbering {
            map,
            total: global.total(),
        });
    }

    /// The number of locally-numbered unknowns per cell.
    pub fn num_unknowns(&self) -> usize {
        self.coeff_index.total()
    }

    /// The dimension of a cell's normal equations and coefficient vectors.
    pub fn equation_size(&self) -> usize {
        match &self.global {
            Some(g) => g.total,
            None => self.coeff_index.total(),
        }
    }

    /// Translate a local unknown index into the index used in equations.
    pub fn target(&self, unknown: usize) -> usize {
        match &self.global {
            Some(g) => g.map[unknown],
            None => unknown,
        }
    }

    /// The solvable coefficients held by the funklets of local cell `cell`.
    pub(crate) fn cell_coeffs(&self, cell: usize) -> Vec<f64> {
        let mut out = vec![0.0; self.equation_size()];
        for (name, interval) in self.coeff_index.iter() {
            let parm = &self.parms[name];
            for (j, value) in parm.funklets[cell].solvable_coeffs().enumerate() {
                out[self.target(interval.start + j)] = value;
            }
        }
        out
    }

    /// Overwrite the solvable coefficients of local cell `cell`.
    pub(crate) fn set_cell_coeffs(&mut self, cell: usize, values: &[f64]) {
        assert_eq!(
            values.len(),
            self.equation_size(),
            "Coefficient vector has the wrong length"
        );
        let updates: Vec<(String, Vec<f64>)> = self
            .coeff_index
            .iter()
            .map(|(name, interval)| {
                let v = (0..interval.length)
                    .map(|j| values[self.target(interval.start + j)])
                    .collect();
                (name.to_string(), v)
            })
            .collect();
        for (name, v) in updates {
            if let Some(parm) = self.parms.get_mut(&name) {
                parm.funklets[cell].set_solvable_coeffs(&v);
            }
        }
    }
}
