//! Finite-difference generator of the controlled state process.
//!
//! The generator `A` is stored as five band buffers over the flattened grid:
//! capital neighbours at offsets `∓1`, exogenous neighbours at offsets `∓I`, and the
//! diagonal. Each state block keeps its own diagonal so conservation can be checked
//! per block. Transitions that would leave the grid are dropped, which is the
//! reflecting / state-constraint boundary, and a capital edge never aliases into the
//! neighbouring exogenous row.

use nalgebra::DMatrix;

use crate::core::SolverError;
use crate::engines::hjb::grid::{StateGrid, idx};
use crate::engines::hjb::upwind::PolicyFunction;
use crate::models::GrowthModel;

/// Transition rates of the exogenous state, one pair per exogenous node.
///
/// Depends only on the process and grid, so it is built once per solve.
#[derive(Debug, Clone, PartialEq)]
pub struct ExogenousBlock {
    /// Rate from row `j` to row `j + 1`.
    pub up: Vec<f64>,
    /// Rate from row `j` to row `j - 1`.
    pub down: Vec<f64>,
}

impl ExogenousBlock {
    /// Upwind drift plus evenly split diffusion; `None` for single-state models.
    pub fn new(model: &GrowthModel, grid: &StateGrid) -> Result<Option<Self>, SolverError> {
        let (Some(process), Some(z_grid)) = (model.exogenous(), grid.exogenous.as_ref()) else {
            return Ok(None);
        };
        let dz = z_grid.step();
        let dz2 = dz * dz;
        let n_z = z_grid.len();
        let mut up = vec![0.0; n_z];
        let mut down = vec![0.0; n_z];

        for (j, &z) in z_grid.nodes().iter().enumerate() {
            let mu = process.drift(z);
            let half_diffusion = 0.5 * process.variance(z) / dz2;
            up[j] = mu.max(0.0) / dz + half_diffusion;
            down[j] = -mu.min(0.0) / dz + half_diffusion;
        }
        up[n_z - 1] = 0.0;
        down[0] = 0.0;

        if up.iter().chain(&down).any(|r| !r.is_finite()) {
            return Err(SolverError::Domain(
                "exogenous transition rates are not finite".to_string(),
            ));
        }
        Ok(Some(Self { up, down }))
    }
}

/// Sparse generator over the flattened `(k, z)` grid.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorMatrix {
    n_k: usize,
    n_z: usize,
    capital_lower: Vec<f64>,
    capital_upper: Vec<f64>,
    capital_diagonal: Vec<f64>,
    exogenous_lower: Vec<f64>,
    exogenous_upper: Vec<f64>,
    exogenous_diagonal: Vec<f64>,
}

impl GeneratorMatrix {
    /// Assembles the generator implied by `policy`.
    pub fn assemble(
        model: &GrowthModel,
        grid: &StateGrid,
        policy: &PolicyFunction,
        exogenous: Option<&ExogenousBlock>,
    ) -> Result<Self, SolverError> {
        let n_k = grid.n_capital();
        let n_z = grid.n_exogenous();
        let n = n_k * n_z;
        if policy.len() != n {
            return Err(SolverError::InvalidInput(format!(
                "policy has {} nodes, grid has {n}",
                policy.len()
            )));
        }
        if let Some(block) = exogenous {
            if block.up.len() != n_z || block.down.len() != n_z {
                return Err(SolverError::InvalidInput(
                    "exogenous block does not match the exogenous grid".to_string(),
                ));
            }
        }

        let dk = grid.capital.step();
        let dk2 = dk * dk;
        let k_nodes = grid.capital.nodes();

        let mut op = Self {
            n_k,
            n_z,
            capital_lower: vec![0.0; n],
            capital_upper: vec![0.0; n],
            capital_diagonal: vec![0.0; n],
            exogenous_lower: vec![0.0; n],
            exogenous_upper: vec![0.0; n],
            exogenous_diagonal: vec![0.0; n],
        };

        for j in 0..n_z {
            for (i, &k) in k_nodes.iter().enumerate() {
                let p = idx(i, j, n_k);
                let mu = policy.drift[p];
                let half_diffusion = 0.5 * model.capital_variance(k) / dk2;

                let lower = if i > 0 {
                    -mu.min(0.0) / dk + half_diffusion
                } else {
                    0.0
                };
                let upper = if i + 1 < n_k {
                    mu.max(0.0) / dk + half_diffusion
                } else {
                    0.0
                };
                if !lower.is_finite() || !upper.is_finite() {
                    return Err(SolverError::Domain(format!(
                        "capital transition rate not finite at node ({i}, {j})"
                    )));
                }
                op.capital_lower[p] = lower;
                op.capital_upper[p] = upper;
                op.capital_diagonal[p] = -(lower + upper);

                if let Some(block) = exogenous {
                    let down = if j > 0 { block.down[j] } else { 0.0 };
                    let up = if j + 1 < n_z { block.up[j] } else { 0.0 };
                    op.exogenous_lower[p] = down;
                    op.exogenous_upper[p] = up;
                    op.exogenous_diagonal[p] = -(down + up);
                }
            }
        }
        Ok(op)
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.n_k * self.n_z
    }

    #[inline]
    pub fn n_capital(&self) -> usize {
        self.n_k
    }

    #[inline]
    pub fn n_exogenous(&self) -> usize {
        self.n_z
    }

    /// Total diagonal entry of `row`.
    #[inline]
    pub fn diagonal(&self, row: usize) -> f64 {
        self.capital_diagonal[row] + self.exogenous_diagonal[row]
    }

    /// Diagonal contribution of the capital block.
    #[inline]
    pub fn capital_diagonal(&self, row: usize) -> f64 {
        self.capital_diagonal[row]
    }

    /// Diagonal contribution of the exogenous block.
    #[inline]
    pub fn exogenous_diagonal(&self, row: usize) -> f64 {
        self.exogenous_diagonal[row]
    }

    /// Rates `(to row - 1, to row + 1)` within the capital block.
    #[inline]
    pub fn capital_rates(&self, row: usize) -> (f64, f64) {
        (self.capital_lower[row], self.capital_upper[row])
    }

    /// Rates `(to row - I, to row + I)` within the exogenous block.
    #[inline]
    pub fn exogenous_rates(&self, row: usize) -> (f64, f64) {
        (self.exogenous_lower[row], self.exogenous_upper[row])
    }

    /// Entry `A[row, col]`.
    pub fn entry(&self, row: usize, col: usize) -> f64 {
        let n_k = self.n_k;
        let mut v = 0.0;
        if col == row {
            v += self.diagonal(row);
        }
        if col + 1 == row {
            v += self.capital_lower[row];
        }
        if col == row + 1 {
            v += self.capital_upper[row];
        }
        if col + n_k == row {
            v += self.exogenous_lower[row];
        }
        if col == row + n_k {
            v += self.exogenous_upper[row];
        }
        v
    }

    /// Structurally non-zero entries of `row` as `(col, value)`, diagonal first.
    pub fn row_entries(&self, row: usize) -> Vec<(usize, f64)> {
        let n_k = self.n_k;
        let mut out = vec![(row, self.diagonal(row))];
        let (cl, cu) = self.capital_rates(row);
        let (zl, zu) = self.exogenous_rates(row);
        if cl != 0.0 {
            out.push((row - 1, cl));
        }
        if cu != 0.0 {
            out.push((row + 1, cu));
        }
        if zl != 0.0 {
            out.push((row - n_k, zl));
        }
        if zu != 0.0 {
            out.push((row + n_k, zu));
        }
        out
    }

    /// Largest absolute row sum; zero for an exactly conservative generator.
    pub fn max_row_sum(&self) -> f64 {
        (0..self.dim())
            .map(|row| self.row_entries(row).iter().map(|(_, v)| v).sum::<f64>().abs())
            .fold(0.0, f64::max)
    }

    /// Matrix-vector product `A v`.
    pub fn apply(&self, v: &[f64]) -> Vec<f64> {
        let n = self.dim();
        debug_assert_eq!(v.len(), n);
        let n_k = self.n_k;
        let mut out = vec![0.0; n];
        for (p, o) in out.iter_mut().enumerate() {
            let mut acc = self.diagonal(p) * v[p];
            if self.capital_lower[p] != 0.0 {
                acc += self.capital_lower[p] * v[p - 1];
            }
            if self.capital_upper[p] != 0.0 {
                acc += self.capital_upper[p] * v[p + 1];
            }
            if self.exogenous_lower[p] != 0.0 {
                acc += self.exogenous_lower[p] * v[p - n_k];
            }
            if self.exogenous_upper[p] != 0.0 {
                acc += self.exogenous_upper[p] * v[p + n_k];
            }
            *o = acc;
        }
        out
    }

    /// Dense copy, for inspection and cross-checking small problems.
    pub fn to_dense(&self) -> DMatrix<f64> {
        let n = self.dim();
        let mut dense = DMatrix::<f64>::zeros(n, n);
        for row in 0..n {
            for (col, v) in self.row_entries(row) {
                dense[(row, col)] += v;
            }
        }
        dense
    }
}
