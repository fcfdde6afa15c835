//! Numerical kernels shared by the HJB engines: banded linear solvers and seeded RNGs.

pub mod banded;
pub mod fast_rng;

pub use banded::{BandedMatrix, solve_tridiagonal_inplace};
pub use fast_rng::{FastRng, FastRngKind};

/// Sup-norm distance `max_i |a_i - b_i|`.
///
/// Returns `f64::INFINITY` when the slices differ in length or any pair is non-finite,
/// so that a corrupted iterate never reads as converged.
pub fn sup_norm_distance(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() {
        return f64::INFINITY;
    }
    let mut dist = 0.0_f64;
    for (x, y) in a.iter().zip(b) {
        let d = (x - y).abs();
        if !d.is_finite() {
            return f64::INFINITY;
        }
        dist = dist.max(d);
    }
    dist
}
