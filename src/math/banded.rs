//! Direct solvers for the banded systems produced by implicit finite differences.
//!
//! A single-state HJB step is tridiagonal and goes through the Thomas algorithm.
//! The two-state step couples row `p` to `p ± 1` and `p ± I`, so it is solved by
//! banded Gaussian elimination with half-bandwidth `I`. Both run without pivoting:
//! the implicit HJB matrix `(ρ + 1/Δ) I - A` is strictly diagonally dominant
//! whenever `A` is a generator, and elimination then keeps fill inside the band.

use crate::core::SolverError;

const PIVOT_FLOOR: f64 = 1.0e-14;

/// In-place tridiagonal solve using pre-allocated scratch buffers.
///
/// `lower[0]` and `upper[n - 1]` are ignored.
#[inline]
pub fn solve_tridiagonal_inplace(
    lower: &[f64],
    diag: &[f64],
    upper: &[f64],
    rhs: &[f64],
    c_star: &mut [f64],
    d_star: &mut [f64],
    x: &mut [f64],
) -> Result<(), SolverError> {
    let n = diag.len();
    if n == 0 {
        return Ok(());
    }
    if lower.len() != n
        || upper.len() != n
        || rhs.len() != n
        || c_star.len() != n
        || d_star.len() != n
        || x.len() != n
    {
        return Err(SolverError::InvalidInput(
            "tridiagonal input lengths must match".to_string(),
        ));
    }

    if !diag[0].is_finite() || diag[0].abs() <= PIVOT_FLOOR {
        return Err(SolverError::SingularSystem(
            "tridiagonal solver: vanishing pivot at row 0".to_string(),
        ));
    }
    let inv_denom0 = 1.0 / diag[0];
    c_star[0] = if n > 1 { upper[0] * inv_denom0 } else { 0.0 };
    d_star[0] = rhs[0] * inv_denom0;

    for i in 1..n {
        let denom = (-lower[i]).mul_add(c_star[i - 1], diag[i]);
        if !denom.is_finite() || denom.abs() <= PIVOT_FLOOR {
            return Err(SolverError::SingularSystem(format!(
                "tridiagonal solver: vanishing pivot at row {i}"
            )));
        }
        let inv_denom = 1.0 / denom;
        c_star[i] = if i < n - 1 { upper[i] * inv_denom } else { 0.0 };
        d_star[i] = (-lower[i]).mul_add(d_star[i - 1], rhs[i]) * inv_denom;
    }

    x[n - 1] = d_star[n - 1];
    for i in (0..(n - 1)).rev() {
        x[i] = (-c_star[i]).mul_add(x[i + 1], d_star[i]);
    }
    Ok(())
}

/// Square matrix stored by diagonals within a fixed band.
///
/// Row `r` keeps columns `r - lower_bw ..= r + upper_bw`; entry `(r, c)` lives at
/// `r * width + (c + lower_bw - r)`.
#[derive(Debug, Clone, PartialEq)]
pub struct BandedMatrix {
    n: usize,
    lower_bw: usize,
    upper_bw: usize,
    data: Vec<f64>,
}

impl BandedMatrix {
    pub fn zeros(n: usize, lower_bw: usize, upper_bw: usize) -> Self {
        let width = lower_bw + upper_bw + 1;
        Self {
            n,
            lower_bw,
            upper_bw,
            data: vec![0.0; n * width],
        }
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.n
    }

    #[inline]
    fn width(&self) -> usize {
        self.lower_bw + self.upper_bw + 1
    }

    #[inline]
    fn in_band(&self, row: usize, col: usize) -> bool {
        row < self.n
            && col < self.n
            && col + self.lower_bw >= row
            && col <= row + self.upper_bw
    }

    #[inline]
    fn offset(&self, row: usize, col: usize) -> usize {
        row * self.width() + (col + self.lower_bw - row)
    }

    /// Returns entry `(row, col)`, zero outside the band.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        if self.in_band(row, col) {
            self.data[self.offset(row, col)]
        } else {
            0.0
        }
    }

    /// Adds `value` to entry `(row, col)`.
    ///
    /// # Panics
    /// Panics if `(row, col)` lies outside the band.
    #[inline]
    pub fn add(&mut self, row: usize, col: usize, value: f64) {
        assert!(
            self.in_band(row, col),
            "entry ({row}, {col}) outside band [-{}, +{}]",
            self.lower_bw,
            self.upper_bw
        );
        let off = self.offset(row, col);
        self.data[off] += value;
    }

    /// Solves `A x = rhs` by banded Gaussian elimination, consuming the matrix.
    pub fn solve(mut self, rhs: &[f64]) -> Result<Vec<f64>, SolverError> {
        let n = self.n;
        if rhs.len() != n {
            return Err(SolverError::InvalidInput(format!(
                "rhs length {} does not match matrix dimension {n}",
                rhs.len()
            )));
        }
        let mut x = rhs.to_vec();

        for k in 0..n {
            let pivot = self.data[self.offset(k, k)];
            if !pivot.is_finite() || pivot.abs() <= PIVOT_FLOOR {
                return Err(SolverError::SingularSystem(format!(
                    "banded solver: vanishing pivot {pivot:e} at row {k}"
                )));
            }
            let row_end = (k + self.lower_bw).min(n - 1);
            let col_end = (k + self.upper_bw).min(n - 1);
            for i in (k + 1)..=row_end {
                let off_ik = self.offset(i, k);
                let factor = self.data[off_ik] / pivot;
                if factor == 0.0 {
                    continue;
                }
                self.data[off_ik] = 0.0;
                for j in (k + 1)..=col_end {
                    let akj = self.data[self.offset(k, j)];
                    if akj != 0.0 {
                        let off_ij = self.offset(i, j);
                        self.data[off_ij] -= factor * akj;
                    }
                }
                x[i] -= factor * x[k];
            }
        }

        for k in (0..n).rev() {
            let col_end = (k + self.upper_bw).min(n - 1);
            let mut acc = x[k];
            for j in (k + 1)..=col_end {
                acc -= self.data[self.offset(k, j)] * x[j];
            }
            x[k] = acc / self.data[self.offset(k, k)];
        }

        if x.iter().any(|v| !v.is_finite()) {
            return Err(SolverError::SingularSystem(
                "banded solver produced a non-finite solution".to_string(),
            ));
        }
        Ok(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{DMatrix, DVector};

    #[test]
    fn tridiagonal_solves_diagonally_dominant_system() {
        let lower = [0.0, -1.0, -1.0, -1.0];
        let diag = [4.0, 4.0, 4.0, 4.0];
        let upper = [-1.0, -1.0, -1.0, 0.0];
        let rhs = [3.0, 2.0, 2.0, 3.0];
        let mut c = [0.0; 4];
        let mut d = [0.0; 4];
        let mut x = [0.0; 4];
        solve_tridiagonal_inplace(&lower, &diag, &upper, &rhs, &mut c, &mut d, &mut x).unwrap();
        for xi in x {
            assert_relative_eq!(xi, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn tridiagonal_reports_singular_pivot() {
        let zeros = [0.0; 3];
        let mut c = [0.0; 3];
        let mut d = [0.0; 3];
        let mut x = [0.0; 3];
        let err = solve_tridiagonal_inplace(&zeros, &zeros, &zeros, &[1.0; 3], &mut c, &mut d, &mut x);
        assert!(matches!(err, Err(SolverError::SingularSystem(_))));
    }

    #[test]
    fn banded_solve_matches_dense_lu() {
        let n = 12;
        let bw = 3;
        let mut banded = BandedMatrix::zeros(n, bw, bw);
        let mut dense = DMatrix::<f64>::zeros(n, n);
        for r in 0..n {
            let mut off_sum = 0.0;
            for c in r.saturating_sub(bw)..=(r + bw).min(n - 1) {
                if c == r {
                    continue;
                }
                let v = -0.1 * (1.0 + ((r * 7 + c * 3) % 5) as f64);
                banded.add(r, c, v);
                dense[(r, c)] = v;
                off_sum += v.abs();
            }
            banded.add(r, r, off_sum + 0.5);
            dense[(r, r)] = off_sum + 0.5;
        }
        let rhs: Vec<f64> = (0..n).map(|i| (i as f64).sin() + 2.0).collect();

        let x = banded.solve(&rhs).unwrap();
        let expected = dense
            .lu()
            .solve(&DVector::from_vec(rhs))
            .expect("dense system is non-singular");
        for i in 0..n {
            assert_relative_eq!(x[i], expected[i], epsilon = 1e-10);
        }
    }

    #[test]
    fn banded_get_is_zero_outside_band() {
        let mut m = BandedMatrix::zeros(5, 1, 2);
        m.add(1, 3, 2.5);
        assert_eq!(m.get(1, 3), 2.5);
        assert_eq!(m.get(4, 0), 0.0);
        assert_eq!(m.get(0, 4), 0.0);
    }

    #[test]
    fn banded_solver_reports_zero_pivot() {
        let m = BandedMatrix::zeros(4, 1, 1);
        assert!(matches!(m.solve(&[1.0; 4]), Err(SolverError::SingularSystem(_))));
    }
}
