// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Least-squares normal equations, accumulated one scalar observation at a
//! time.


use ndarray::prelude::*;

/// The normal equations `A^T A x = A^T r` of a linear least-squares problem
/// with `n` unknowns. Every observation has unit weight. Only the upper
/// triangle of `A^T A` is accumulated.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalEquation {
    n: usize,
    normal: Array2<f64>,
    rhs: Array1<f64>,
    count: usize,
    sum_sq: f64,
}

impl NormalEquation {
    pub fn new(n: usize) -> NormalEquation {
        NormalEquation {
            n,
            normal: Array2::zeros((n, n)),
            rhs: Array1::zeros(n),
            count: 0,
            sum_sq: 0.0,
        }
    }

    /// The number of unknowns.
    pub fn num_unknowns(&self) -> usize {
        self.n
    }

    /// The number of scalar observations added.
    pub fn count(&self) -> usize {
        self.count
    }

    /// The sum of the squared residuals.
    pub fn sum_sq(&self) -> f64 {
        self.sum_sq
    }

    pub fn rhs(&self) -> ArrayView1<f64> {
        self.rhs.view()
    }

    /// The accumulated upper triangle of the normal matrix.
    pub fn upper(&self) -> ArrayView2<f64> {
        self.normal.view()
    }

    /// The full, symmetric normal matrix.
    pub fn normal_matrix(&self) -> Array2<f64> {
        let mut full = self.normal.clone();
        for i in 0..self.n {
            for j in 0..i {
                full[(i, j)] = full[(j, i)];
            }
        }
        full
    }

    /// Has nothing been added yet?
    pub fn is_zero(&self) -> bool {
        self.count == 0
            && self.rhs.iter().all(|&v| v == 0.0)
            && self.normal.iter().all(|&v| v == 0.0)
    }

    /// Add an observation whose derivatives with respect to every unknown
    /// are given.
    pub fn add_dense(&mut self, derivatives: &[f64], residual: f64) {
        assert_eq!(derivatives.len(), self.n);
        for (i, &di) in derivatives.iter().enumerate() {
            if di == 0.0 {
                continue;
            }
            for (j, &dj) in derivatives.iter().enumerate().skip(i) {
                self.normal[(i, j)] += di * dj;
            }
            self.rhs[i] += di * residual;
        }
        self.count += 1;
        self.sum_sq += residual * residual;
    }

    /// Add an observation that only depends on the unknowns in `index`;
    /// `derivatives[k]` is the derivative with respect to unknown `index[k]`.
    pub fn add_sparse(&mut self, index: &[usize], derivatives: &[f64], residual: f64) {
        assert_eq!(index.len(), derivatives.len());
        for (k, (&i, &di)) in index.iter().zip(derivatives).enumerate() {
            for (&j, &dj) in index.iter().zip(derivatives).skip(k) {
                let (lo, hi) = if i <= j { (i, j) } else { (j, i) };
                self.normal[(lo, hi)] += di * dj;
            }
            self.rhs[i] += di * residual;
        }
        self.count += 1;
        self.sum_sq += residual * residual;
    }

    /// Add the observations of another set of equations of the same size.
    pub fn merge(&mut self, other: &NormalEquation) {
        assert_eq!(
            self.n, other.n,
            "Can't merge normal equations of different sizes"
        );
        self.normal += &other.normal;
        self.rhs += &other.rhs;
        self.count += other.count;
        self.sum_sq += other.sum_sq;
    }
}

/// The normal equations of one solve-domain cell.
#[derive(Debug, Clone, PartialEq)]
pub struct CellEquation {
    /// The linear id of the cell in the calibration grid.
    pub id: usize,
    pub equation: NormalEquation,
}
