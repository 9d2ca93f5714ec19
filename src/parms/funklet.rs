// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Funklets: 2-D polynomials in normalised frequency and time.

use serde::{Deserialize, Serialize};

use crate::{
    constants::{DEFAULT_PERTURBATION, MIN_RELATIVE_COEFF},
    grid::BBox,
};

/// A local polynomial representation of a parameter over a domain.
///
/// The value at `(f, t)` is `sum c[i * nt + j] * x^i * y^j`, where `x` and `y`
/// are `f` and `t` normalised to `[0, 1]` over the domain, and `(nf, nt)` is
/// the funklet's shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Funklet {
    pub domain: BBox,

    /// The number of (frequency, time) terms.
    pub shape: (usize, usize),

    pub coeffs: Vec<f64>,

    /// Which coefficients may be solved for.
    pub solvable: Vec<bool>,

    pub perturbation: f64,

    /// Are perturbations relative to the coefficient's value?
    pub relative: bool,

    /// The offset of this funklet's first solvable coefficient into a cell's
    /// unknown vector; set only while the owning parameter is solvable.
    #[serde(skip)]
    pub scid: Option<usize>,
}

impl Funklet {
    /// A polynomial with the given coefficients, all of which are solvable.
    ///
    /// # Panics
    ///
    /// Panics if the number of coefficients doesn't match the shape.
    pub fn new(domain: BBox, shape: (usize, usize), coeffs: Vec<f64>) -> Funklet {
        assert_eq!(
            shape.0 * shape.1,
            coeffs.len(),
            "funklet shape doesn't match its coefficients"
        );
        Funklet {
            domain,
            shape,
            solvable: vec![true; coeffs.len()],
            coeffs,
            perturbation: DEFAULT_PERTURBATION,
            relative: true,
            scid: None,
        }
    }

    /// A funklet with a single, solvable coefficient.
    pub fn constant(domain: BBox, value: f64) -> Funklet {
        Funklet::new(domain, (1, 1), vec![value])
    }

    pub fn num_coeffs(&self) -> usize {
        self.coeffs.len()
    }

    pub fn num_solvable(&self) -> usize {
        self.solvable.iter().filter(|&&s| s).count()
    }

    /// Indices of the solvable coefficients, ascendingly.
    pub fn solvable_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.solvable
            .iter()
            .enumerate()
            .filter_map(|(i, &s)| s.then_some(i))
    }

    fn normalise(&self, freq: f64, time: f64) -> (f64, f64) {
        let d = &self.domain;
        let x = if d.freq_end > d.freq_start {
            (freq - d.freq_start) / (d.freq_end - d.freq_start)
        } else {
            0.0
        };
        let y = if d.time_end > d.time_start {
            (time - d.time_start) / (d.time_end - d.time_start)
        } else {
            0.0
        };
        (x, y)
    }

    /// The value of basis polynomial `k` at normalised coordinates.
    fn basis(&self, k: usize, x: f64, y: f64) -> f64 {
        let nt = self.shape.1;
        x.powi((k / nt) as i32) * y.powi((k % nt) as i32)
    }

    pub fn eval(&self, freq: f64, time: f64) -> f64 {
        let (x, y) = self.normalise(freq, time);
        let nt = self.shape.1;
        // Horner's method over frequency, then time.
        let mut sum = 0.0;
        for i in (0..self.shape.0).rev() {
            let mut row = 0.0;
            for j in (0..nt).rev() {
                row = row * y + self.coeffs[i * nt + j];
            }
            sum = sum * x + row;
        }
        sum
    }

    /// The perturbation step applied to coefficient `k`.
    pub fn delta(&self, k: usize) -> f64 {
        let c = self.coeffs[k];
        if self.relative && c.abs() > MIN_RELATIVE_COEFF {
            c * self.perturbation
        } else {
            self.perturbation
        }
    }

    /// The value with coefficient `k` perturbed by [`Funklet::delta`].
    pub fn eval_perturbed(&self, freq: f64, time: f64, k: usize) -> f64 {
        let (x, y) = self.normalise(freq, time);
        self.eval(freq, time) + self.delta(k) * self.basis(k, x, y)
    }

    /// The values of the solvable coefficients, in coefficient order.
    pub fn solvable_coeffs(&self) -> impl Iterator<Item = f64> + '_ {
        self.solvable_indices().map(|k| self.coeffs[k])
    }

    /// Overwrite the solvable coefficients, in coefficient order.
    pub fn set_solvable_coeffs(&mut self, values: &[f64]) {
        let indices: Vec<usize> = self.solvable_indices().collect();
        assert_eq!(indices.len(), values.len());
        for (k, &v) in indices.into_iter().zip(values) {
            self.coeffs[k] = v;
        }
    }

    /// The same polynomial, re-expressed over another domain. The new
    /// funklet's values are identical to this one's everywhere.
    pub fn rescaled(&self, domain: BBox) -> Funklet {
        // x_old = sx * x_new + ox, and likewise for time.
        let affine = |old_start: f64, old_end: f64, new_start: f64, new_end: f64| {
            let old_width = old_end - old_start;
            if old_width > 0.0 {
                let new_width = if new_end > new_start {
                    new_end - new_start
                } else {
                    0.0
                };
                (new_width / old_width, (new_start - old_start) / old_width)
            } else {
                (0.0, 0.0)
            }
        };
        let (sx, ox) = affine(
            self.domain.freq_start,
            self.domain.freq_end,
            domain.freq_start,
            domain.freq_end,
        );
        let (sy, oy) = affine(
            self.domain.time_start,
            self.domain.time_end,
            domain.time_start,
            domain.time_end,
        );
        let (nf, nt) = self.shape;
        let fx = expansion(nf, sx, ox);
        let fy = expansion(nt, sy, oy);

        let mut coeffs = vec![0.0; nf * nt];
        for i in 0..nf {
            for j in 0..nt {
                let c = self.coeffs[i * nt + j];
                if c == 0.0 {
                    continue;
                }
                for m in 0..=i {
                    for n in 0..=j {
                        coeffs[m * nt + n] += c * fx[i][m] * fy[j][n];
                    }
                }
            }
        }
        Funklet {
            domain,
            coeffs,
            ..self.clone()
        }
    }

    /// The same funklet with a different number of terms. Coefficients beyond
    /// the new shape are dropped and new ones are zero; the solvable mask is
    /// taken from `template`.
    pub(crate) fn reshaped(&self, template: &Funklet) -> Funklet {
        if self.shape == template.shape {
            return Funklet {
                solvable: template.solvable.clone(),
                ..self.clone()
            };
        }
        let (nf, nt) = template.shape;
        let mut coeffs = vec![0.0; nf * nt];
        for i in 0..nf.min(self.shape.0) {
            for j in 0..nt.min(self.shape.1) {
                coeffs[i * nt + j] = self.coeffs[i * self.shape.1 + j];
            }
        }
        Funklet {
            shape: template.shape,
            coeffs,
            solvable: template.solvable.clone(),
            ..self.clone()
        }
    }
}

/// `(s * x + o)^i = sum_m out[i][m] * x^m` for every power `i < n`.
fn expansion(n: usize, s: f64, o: f64) -> Vec<Vec<f64>> {
    let mut out: Vec<Vec<f64>> = Vec::with_capacity(n);
    for i in 0..n {
        let mut row = vec![0.0; i + 1];
        if i == 0 {
            row[0] = 1.0;
        } else {
            // Multiply the previous power by (s * x + o).
            let prev = &out[i - 1];
            for (m, &p) in prev.iter().enumerate() {
                row[m] += p * o;
                row[m + 1] += p * s;
            }
        }
        out.push(row);
    }
    out
}
