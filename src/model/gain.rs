// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A point source at the phase centre, observed through per-station diagonal
//! complex gains.
//!
//! For stations `p` and `q`, the model of correlation product `ab` is
//! `g_pa * conj(g_qb) * I`, with `g_xy` zero (no leakage) and `I` the source's
//! flux density; the cross-hand products of an unpolarised source are zero.
//! Each gain has a real and an imaginary parameter.

use std::collections::BTreeMap;

use log::debug;
use ndarray::prelude::*;

use super::*;
use crate::{grid::BBox, parms::Funklet};

/// The canonical polarisations as (feed of station 1, feed of station 2).
const FEEDS: [(usize, usize); NUM_POLS] = [(0, 0), (0, 1), (1, 0), (1, 1)];

/// Registry indices of one station's gain parameters.
#[derive(Debug, Clone, Copy)]
struct StationGains {
    /// Indexed by feed, then (real, imaginary).
    parms: [[usize; 2]; 2],
}

#[derive(Debug)]
struct PerturbedParm {
    unknown: usize,
    /// Dimensions: (timeslot, channel).
    value: Array2<f64>,
    deltas: Vec<f64>,
}

#[derive(Debug)]
struct CachedParm {
    /// Dimensions: (timeslot, channel).
    value: Array2<f64>,
    perturbed: Vec<PerturbedParm>,
}

#[derive(Debug)]
struct ParmCache {
    request_id: u64,
    parms: Vec<CachedParm>,
}

/// A reference [`ModelEvaluator`].
#[derive(Debug)]
pub struct GainModel {
    kind: EquationType,
    gains: bool,
    stations: Vec<StationGains>,
    flux: usize,
    cache: Option<ParmCache>,
}

impl Default for GainModel {
    fn default() -> Self {
        GainModel::new()
    }
}

impl GainModel {
    pub const FLUX_NAME: &'static str = "Flux:I";

    pub fn new() -> GainModel {
        GainModel {
            kind: EquationType::Simulate,
            gains: true,
            stations: vec![],
            flux: 0,
            cache: None,
        }
    }

    /// The name of the real or imaginary part of a station's gain for one
    /// feed.
    pub fn gain_name(feed: usize, imag: bool, station: &str) -> String {
        format!(
            "Gain:{feed}:{feed}:{}:{station}",
            if imag { "Imag" } else { "Real" }
        )
    }

    fn cache(&self, request: &EvalRequest) -> &ParmCache {
        match &self.cache {
            Some(cache) if cache.request_id == request.id() => cache,
            _ => panic!(
                "GainModel evaluated for request {} without precalculating it",
                request.id()
            ),
        }
    }
}

/// The registry indices the model of one baseline and polarisation depends
/// on.
#[derive(Debug, Clone, Copy)]
struct Slots {
    gains: Option<[usize; 4]>,
    flux: usize,
}

impl Slots {
    /// `g_pa * conj(g_qb)`, with `get` supplying parameter values.
    fn gain_product(&self, get: &impl Fn(usize) -> f64) -> c64 {
        match self.gains {
            None => c64::new(1.0, 0.0),
            Some([p_re, p_im, q_re, q_im]) => {
                let gp = c64::new(get(p_re), get(p_im));
                let gq = c64::new(get(q_re), get(q_im));
                gp * gq.conj()
            }
        }
    }

    fn predict(&self, get: impl Fn(usize) -> f64) -> c64 {
        self.gain_product(&get) * get(self.flux)
    }
}

impl ModelEvaluator for GainModel {
    fn make_equations(
        &mut self,
        kind: EquationType,
        config: &ModelConfig,
        stations: &[String],
        baselines: &[Baseline],
        registry: &mut ParmRegistry,
    ) -> Result<(), ModelError> {
        if stations.is_empty() {
            return Err(ModelError::NoStations);
        }
        if !config.flux.is_finite() {
            return Err(ModelError::BadFlux(config.flux));
        }
        if !(config.perturbation > 0.0 && config.perturbation.is_finite()) {
            return Err(ModelError::BadPerturbation(config.perturbation));
        }

        let default = |value: f64| Funklet {
            perturbation: config.perturbation,
            ..Funklet::constant(BBox::default(), value)
        };
        self.stations = if config.gains {
            stations
                .iter()
                .map(|station| {
                    let mut parms = [[0; 2]; 2];
                    for (feed, ids) in parms.iter_mut().enumerate() {
                        ids[0] = registry.register(
                            &GainModel::gain_name(feed, false, station),
                            default(1.0),
                        );
                        ids[1] = registry.register(
                            &GainModel::gain_name(feed, true, station),
                            default(0.0),
                        );
                    }
                    StationGains { parms }
                })
                .collect()
        } else {
            vec![]
        };
        self.flux = registry.register(GainModel::FLUX_NAME, default(config.flux));
        self.kind = kind;
        self.gains = config.gains;
        self.cache = None;
        debug!(
            "Gain model for {} stations and {} baselines registered {} parameters",
            stations.len(),
            baselines.len(),
            registry.len()
        );
        Ok(())
    }

    fn precalculate(&mut self, request: &EvalRequest, registry: &ParmRegistry) {
        let freqs: Vec<f64> = request.freq_centers().collect();
        let times: Vec<f64> = request.time_centers().collect();
        let dim = (times.len(), freqs.len());
        let want_perturbed = request.n_perturbations() > 0;

        let parms = registry
            .iter()
            .map(|parm| {
                let funklet_indices =
                    Array2::from_shape_fn(dim, |(t, c)| parm.funklet_index_at(freqs[c], times[t]));
                let funklet = |idx: Option<usize>| match idx {
                    Some(i) => &parm.funklets[i],
                    None => &parm.default,
                };
                let value = Array2::from_shape_fn(dim, |(t, c)| {
                    funklet(funklet_indices[(t, c)]).eval(freqs[c], times[t])
                });

                let mut perturbed = vec![];
                if want_perturbed && parm.solvable {
                    if let Some(interval) = registry.coeff_index().get(&parm.name) {
                        for (j, k) in parm
                            .default
                            .solvable_indices()
                            .enumerate()
                            .take(interval.length)
                        {
                            let unknown = interval.start + j;
                            if unknown >= request.n_perturbations() {
                                break;
                            }
                            perturbed.push(PerturbedParm {
                                unknown,
                                value: Array2::from_shape_fn(dim, |(t, c)| {
                                    funklet(funklet_indices[(t, c)])
                                        .eval_perturbed(freqs[c], times[t], k)
                                }),
                                deltas: parm.funklets.iter().map(|f| f.delta(k)).collect(),
                            });
                        }
                    }
                }
                CachedParm { value, perturbed }
            })
            .collect();

        self.cache = Some(ParmCache {
            request_id: request.id(),
            parms,
        });
    }

    fn evaluate(
        &self,
        baseline: Baseline,
        request: &EvalRequest,
        _registry: &ParmRegistry,
        observed: Option<ArrayView3<c64>>,
    ) -> ModelResult {
        let cache = self.cache(request);
        let dim = (request.num_timeslots(), request.num_channels());
        let mut result = ModelResult::zeros(dim.0, dim.1);

        for (pol, &(feed_p, feed_q)) in FEEDS.iter().enumerate() {
            let slots = Slots {
                gains: if self.gains {
                    let p = self.stations[baseline.station1].parms[feed_p];
                    let q = self.stations[baseline.station2].parms[feed_q];
                    Some([p[0], p[1], q[0], q[1]])
                } else {
                    None
                },
                flux: self.flux,
            };
            let out = &mut result.pols[pol];

            if self.kind == EquationType::Correct {
                if let Some(observed) = observed.as_ref() {
                    out.value = Array2::from_shape_fn(dim, |(t, c)| {
                        let gain = slots.gain_product(&|id| cache.parms[id].value[(t, c)]);
                        if gain.norm_sqr() > 0.0 {
                            observed[(t, c, pol)] / gain
                        } else {
                            c64::default()
                        }
                    });
                }
                continue;
            }

            // An unpolarised source has no cross-hand power.
            if feed_p != feed_q {
                continue;
            }
            out.value = Array2::from_shape_fn(dim, |(t, c)| {
                slots.predict(|id| cache.parms[id].value[(t, c)])
            });

            let mut ids: Vec<usize> = vec![slots.flux];
            if let Some(g) = slots.gains {
                ids.extend_from_slice(&g);
            }
            ids.sort_unstable();
            ids.dedup();
            let mut perturbed = BTreeMap::new();
            for id in ids {
                for p in cache.parms[id].perturbed.iter() {
                    // Substitute the perturbed parameter everywhere it appears;
                    // both gains of an auto-correlation are the same parameter.
                    let values = Array2::from_shape_fn(dim, |(t, c)| {
                        slots.predict(|other| {
                            if other == id {
                                p.value[(t, c)]
                            } else {
                                cache.parms[other].value[(t, c)]
                            }
                        })
                    });
                    perturbed.insert(
                        p.unknown,
                        Perturbed {
                            values,
                            deltas: p.deltas.clone(),
                        },
                    );
                }
            }
            out.perturbed = perturbed;
        }

        result
    }
}
