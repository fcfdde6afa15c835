//! Fixed-point loop `upwind → generator → implicit step` until the sup-norm
//! change of the value function drops below tolerance or the budget runs out.

use tracing::{debug, warn};

use crate::core::{DiagKey, Diagnostics, SolverError};
use crate::engines::hjb::generator::{ExogenousBlock, GeneratorMatrix};
use crate::engines::hjb::grid::{StateGrid, idx};
use crate::engines::hjb::implicit::ImplicitSolver;
use crate::engines::hjb::upwind::{PolicyFunction, UpwindScheme};
use crate::math::sup_norm_distance;
use crate::models::GrowthModel;

/// Terminal state of the value-iteration loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ConvergenceStatus {
    /// Sup-norm change fell below tolerance.
    Converged,
    /// Iteration budget exhausted; the last iterate is returned.
    Exhausted,
}

/// Converged (or last) value function with its policy and loop diagnostics.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HjbSolution {
    pub grid: StateGrid,
    pub value: Vec<f64>,
    pub policy: PolicyFunction,
    pub status: ConvergenceStatus,
    pub iterations: usize,
    /// Sup-norm change after each iteration.
    pub distance_history: Vec<f64>,
    pub diagnostics: Diagnostics,
}

impl HjbSolution {
    #[inline]
    pub fn is_converged(&self) -> bool {
        self.status == ConvergenceStatus::Converged
    }

    /// Last recorded sup-norm change.
    pub fn final_distance(&self) -> f64 {
        self.distance_history.last().copied().unwrap_or(f64::INFINITY)
    }

    /// Capital level where the drift in exogenous row `j` crosses zero from above.
    ///
    /// Returns the node itself when the crossing lands on a steady-state node,
    /// otherwise interpolates linearly between the bracketing nodes. An edge node
    /// whose drift is exactly zero only reflects the state constraint and is never
    /// reported.
    pub fn steady_state_capital(&self, j: usize) -> Option<f64> {
        let n_k = self.grid.n_capital();
        if j >= self.grid.n_exogenous() {
            return None;
        }
        let k = self.grid.capital.nodes();
        let drift = &self.policy.drift[idx(0, j, n_k)..idx(0, j, n_k) + n_k];
        let constrained = |i: usize| (i == 0 || i == n_k - 1) && drift[i] == 0.0;

        for i in 0..n_k.saturating_sub(1) {
            if constrained(i) || constrained(i + 1) {
                continue;
            }
            let (lo, hi) = (drift[i], drift[i + 1]);
            if !(lo >= 0.0 && hi <= 0.0 && (lo > 0.0 || hi < 0.0)) {
                continue;
            }
            return Some(if lo == 0.0 {
                k[i]
            } else if hi == 0.0 {
                k[i + 1]
            } else {
                let w = lo / (lo - hi);
                k[i] + w * (k[i + 1] - k[i])
            });
        }
        None
    }
}

/// Value-iteration settings.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ValueIteration {
    /// Sup-norm convergence tolerance `ε`.
    pub tolerance: f64,
    /// Pseudo-time relaxation step `Δ`.
    pub delta: f64,
    pub max_iterations: usize,
}

impl Default for ValueIteration {
    fn default() -> Self {
        Self {
            tolerance: 1.0e-6,
            delta: 1000.0,
            max_iterations: 30,
        }
    }
}

impl ValueIteration {
    pub fn new(tolerance: f64, delta: f64, max_iterations: usize) -> Self {
        Self {
            tolerance,
            delta,
            max_iterations,
        }
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_delta(mut self, delta: f64) -> Self {
        self.delta = delta;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn validate(&self) -> Result<(), SolverError> {
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(SolverError::InvalidInput(
                "tolerance must be finite and > 0".to_string(),
            ));
        }
        if self.max_iterations == 0 {
            return Err(SolverError::InvalidInput(
                "max_iterations must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Runs the loop from `guess`, or from [`initial_guess`] when `None`.
    pub fn run(
        &self,
        model: &GrowthModel,
        grid: &StateGrid,
        guess: Option<Vec<f64>>,
    ) -> Result<HjbSolution, SolverError> {
        self.validate()?;
        let solver = ImplicitSolver::new(model.params.discount_rate, self.delta)?;
        let utility = model.utility();
        let upwind = UpwindScheme::new(model, grid);
        let exogenous = ExogenousBlock::new(model, grid)?;

        let mut value = match guess {
            Some(v) if v.len() != grid.n_points() => {
                return Err(SolverError::InvalidInput(format!(
                    "initial guess has {} entries, grid has {}",
                    v.len(),
                    grid.n_points()
                )));
            }
            Some(v) => v,
            None => initial_guess(model, grid),
        };

        let mut status = ConvergenceStatus::Exhausted;
        let mut distance_history = Vec::with_capacity(self.max_iterations);

        for iteration in 1..=self.max_iterations {
            let policy = upwind.policy(&value)?;
            let generator = GeneratorMatrix::assemble(model, grid, &policy, exogenous.as_ref())?;
            let flow = policy.utility(utility);
            let next = solver.step(&generator, &flow, &value)?;

            let distance = sup_norm_distance(&next, &value);
            distance_history.push(distance);
            debug!(iteration, distance, "hjb value iteration");
            value = next;

            if distance < self.tolerance {
                status = ConvergenceStatus::Converged;
                break;
            }
        }

        let iterations = distance_history.len();
        if status == ConvergenceStatus::Exhausted {
            warn!(
                iterations,
                distance = distance_history.last().copied().unwrap_or(f64::NAN),
                tolerance = self.tolerance,
                "hjb value iteration exhausted its budget without converging"
            );
        }

        let policy = upwind.policy(&value)?;
        let mut solution = HjbSolution {
            grid: grid.clone(),
            value,
            policy,
            status,
            iterations,
            distance_history,
            diagnostics: Diagnostics::new(),
        };

        let diag = &mut solution.diagnostics;
        diag.insert_key(DiagKey::Iterations, iterations as f64);
        diag.insert_key(
            DiagKey::FinalDistance,
            solution.distance_history.last().copied().unwrap_or(f64::NAN),
        );
        diag.insert_key(
            DiagKey::Converged,
            if status == ConvergenceStatus::Converged { 1.0 } else { 0.0 },
        );
        diag.insert_key(DiagKey::Delta, self.delta);
        diag.insert_key(DiagKey::CapitalPoints, grid.n_capital() as f64);
        diag.insert_key(DiagKey::ExogenousPoints, grid.n_exogenous() as f64);
        diag.insert_key(DiagKey::KMin, grid.capital.min());
        diag.insert_key(DiagKey::KMax, grid.capital.max());
        if let Some(kss) = solution.steady_state_capital(grid.n_exogenous() / 2) {
            solution
                .diagnostics
                .insert_key(DiagKey::SteadyStateCapital, kss);
        }

        Ok(solution)
    }
}

/// Value of consuming current output forever, `u(A z k^α) / ρ`.
///
/// Increasing and concave in `k`, so every one-sided difference of the guess is a
/// valid marginal utility.
pub fn initial_guess(model: &GrowthModel, grid: &StateGrid) -> Vec<f64> {
    let utility = model.utility();
    let rho = model.params.discount_rate;
    grid.capital_mesh()
        .iter()
        .zip(grid.exogenous_mesh())
        .map(|(&k, z)| utility.utility(model.production(k, z)) / rho)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::hjb::grid::GridSpec;
    use crate::models::{Dynamics, LogOuProcess, ModelParameters};

    fn stochastic_model() -> GrowthModel {
        GrowthModel::new(
            ModelParameters::default(),
            Dynamics::CapitalDiffusion { sigma: 0.05 },
        )
        .unwrap()
    }

    #[test]
    fn converges_and_records_diagnostics() {
        let model = stochastic_model();
        let grid = GridSpec::new(80).build(&model).unwrap();
        let sol = ValueIteration::default()
            .with_max_iterations(200)
            .run(&model, &grid, None)
            .unwrap();
        assert!(sol.is_converged());
        assert!(sol.final_distance() < 1e-6);
        assert_eq!(sol.diagnostics.get_key(DiagKey::Converged), Some(1.0));
        assert_eq!(sol.diagnostics.get_key(DiagKey::CapitalPoints), Some(80.0));
        assert_eq!(sol.iterations, sol.distance_history.len());
    }

    #[test]
    fn exhausted_budget_is_not_an_error() {
        let model = stochastic_model();
        let grid = GridSpec::new(40).build(&model).unwrap();
        let sol = ValueIteration::default()
            .with_max_iterations(1)
            .with_tolerance(1e-14)
            .run(&model, &grid, None)
            .unwrap();
        assert_eq!(sol.status, ConvergenceStatus::Exhausted);
        assert_eq!(sol.iterations, 1);
        assert_eq!(sol.diagnostics.get_key(DiagKey::Converged), Some(0.0));
    }

    #[test]
    fn converged_value_is_a_fixed_point() {
        let model = stochastic_model();
        let grid = GridSpec::new(60).build(&model).unwrap();
        let iter = ValueIteration::default().with_max_iterations(200);
        let first = iter.run(&model, &grid, None).unwrap();
        assert!(first.is_converged());

        let again = iter.run(&model, &grid, Some(first.value.clone())).unwrap();
        assert!(again.distance_history[0] < iter.tolerance);
        assert_eq!(again.iterations, 1);
    }

    #[test]
    fn value_is_increasing_and_consumption_positive() {
        let model = stochastic_model();
        let grid = GridSpec::new(60).build(&model).unwrap();
        let sol = ValueIteration::default()
            .with_max_iterations(200)
            .run(&model, &grid, None)
            .unwrap();
        assert!(sol.value.windows(2).all(|w| w[1] > w[0]));
        assert!(sol.policy.consumption.iter().all(|&c| c > 0.0));
    }

    #[test]
    fn steady_state_skips_constrained_lower_edge() {
        let model = GrowthModel::new(
            ModelParameters::default(),
            Dynamics::CapitalDiffusion { sigma: 0.2 },
        )
        .unwrap();
        let grid = GridSpec::default().build(&model).unwrap();
        let sol = ValueIteration::default()
            .with_max_iterations(200)
            .run(&model, &grid, None)
            .unwrap();

        let kss = sol.steady_state_capital(0).unwrap();
        assert!(kss > grid.capital.min() && kss < grid.capital.max(), "kss={kss}");
        assert_eq!(sol.diagnostics.get_key(DiagKey::SteadyStateCapital), Some(kss));
    }

    #[test]
    fn two_state_model_converges() {
        let process = LogOuProcess::from_correlation(0.9, 0.07).unwrap();
        let model =
            GrowthModel::new(ModelParameters::default(), Dynamics::Exogenous { process }).unwrap();
        let grid = GridSpec::new(40).with_exogenous_points(10).build(&model).unwrap();
        let sol = ValueIteration::default()
            .with_max_iterations(200)
            .run(&model, &grid, None)
            .unwrap();
        assert!(sol.is_converged());
        assert_eq!(sol.value.len(), 400);
        // Higher productivity rows consume more at the same capital.
        let n_k = grid.n_capital();
        assert!(sol.policy.consumption[idx(20, 9, n_k)] > sol.policy.consumption[idx(20, 0, n_k)]);
    }

    #[test]
    fn rejects_misshapen_guess() {
        let model = stochastic_model();
        let grid = GridSpec::new(20).build(&model).unwrap();
        let err = ValueIteration::default().run(&model, &grid, Some(vec![0.0; 3]));
        assert!(matches!(err, Err(SolverError::InvalidInput(_))));
    }
}
