//! One implicit (backward Euler) step of the HJB equation in pseudo-time.
//!
//! Solves `((ρ + 1/Δ) I - A) V' = u(c) + V / Δ` exactly. Because `A` has
//! non-negative off-diagonals and zero row sums, the left-hand matrix is strictly
//! diagonally dominant for `ρ > 0`, `Δ > 0` and elimination never needs pivoting.

use crate::core::SolverError;
use crate::engines::hjb::generator::GeneratorMatrix;
use crate::math::{BandedMatrix, solve_tridiagonal_inplace};

/// Implicit step with discount rate `ρ` and relaxation step `Δ`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImplicitSolver {
    pub discount_rate: f64,
    pub delta: f64,
}

impl ImplicitSolver {
    pub fn new(discount_rate: f64, delta: f64) -> Result<Self, SolverError> {
        if !discount_rate.is_finite() || discount_rate <= 0.0 {
            return Err(SolverError::InvalidInput(
                "discount_rate must be finite and > 0".to_string(),
            ));
        }
        if !delta.is_finite() || delta <= 0.0 {
            return Err(SolverError::InvalidInput(
                "relaxation step delta must be finite and > 0".to_string(),
            ));
        }
        Ok(Self {
            discount_rate,
            delta,
        })
    }

    /// Returns the next value-function iterate.
    pub fn step(
        &self,
        generator: &GeneratorMatrix,
        utility: &[f64],
        current: &[f64],
    ) -> Result<Vec<f64>, SolverError> {
        let n = generator.dim();
        if utility.len() != n || current.len() != n {
            return Err(SolverError::InvalidInput(format!(
                "implicit step expects {n} nodes, got utility={} value={}",
                utility.len(),
                current.len()
            )));
        }

        let inv_delta = 1.0 / self.delta;
        let shift = self.discount_rate + inv_delta;
        let rhs: Vec<f64> = utility
            .iter()
            .zip(current)
            .map(|(u, v)| v.mul_add(inv_delta, *u))
            .collect();

        if generator.n_exogenous() == 1 {
            self.solve_tridiagonal(generator, shift, &rhs)
        } else {
            self.solve_banded(generator, shift, &rhs)
        }
    }

    fn solve_tridiagonal(
        &self,
        generator: &GeneratorMatrix,
        shift: f64,
        rhs: &[f64],
    ) -> Result<Vec<f64>, SolverError> {
        let n = generator.dim();
        let mut lower = vec![0.0_f64; n];
        let mut diag = vec![0.0_f64; n];
        let mut upper = vec![0.0_f64; n];
        for p in 0..n {
            let (cl, cu) = generator.capital_rates(p);
            lower[p] = -cl;
            diag[p] = shift - generator.diagonal(p);
            upper[p] = -cu;
        }

        let mut c_star = vec![0.0_f64; n];
        let mut d_star = vec![0.0_f64; n];
        let mut next = vec![0.0_f64; n];
        solve_tridiagonal_inplace(
            &lower,
            &diag,
            &upper,
            rhs,
            &mut c_star,
            &mut d_star,
            &mut next,
        )?;

        if next.iter().any(|v| !v.is_finite()) {
            return Err(SolverError::SingularSystem(
                "implicit step produced a non-finite value function".to_string(),
            ));
        }
        Ok(next)
    }

    fn solve_banded(
        &self,
        generator: &GeneratorMatrix,
        shift: f64,
        rhs: &[f64],
    ) -> Result<Vec<f64>, SolverError> {
        let n = generator.dim();
        let n_k = generator.n_capital();
        let mut lhs = BandedMatrix::zeros(n, n_k, n_k);
        for p in 0..n {
            lhs.add(p, p, shift - generator.diagonal(p));
            let (cl, cu) = generator.capital_rates(p);
            let (zl, zu) = generator.exogenous_rates(p);
            if cl != 0.0 {
                lhs.add(p, p - 1, -cl);
            }
            if cu != 0.0 {
                lhs.add(p, p + 1, -cu);
            }
            if zl != 0.0 {
                lhs.add(p, p - n_k, -zl);
            }
            if zu != 0.0 {
                lhs.add(p, p + n_k, -zu);
            }
        }
        lhs.solve(rhs)
    }
}
