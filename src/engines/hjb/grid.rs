//! Uniform state grids and the bounds policy that centres them on the steady state.

use crate::core::SolverError;
use crate::models::GrowthModel;

/// Uniformly spaced, strictly increasing one-dimensional grid.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Grid {
    nodes: Vec<f64>,
    step: f64,
}

impl Grid {
    /// Builds `count` nodes from `min` to `max` with `step = (max - min)/(count - 1)`.
    pub fn uniform(min: f64, max: f64, count: usize) -> Result<Self, SolverError> {
        if count < 2 {
            return Err(SolverError::InvalidGrid(format!(
                "point count must be >= 2, got {count}"
            )));
        }
        if !min.is_finite() || !max.is_finite() {
            return Err(SolverError::InvalidGrid(
                "grid bounds must be finite".to_string(),
            ));
        }
        if min >= max {
            return Err(SolverError::InvalidGrid(format!(
                "grid min {min} must be < max {max}"
            )));
        }

        let step = (max - min) / (count - 1) as f64;
        let mut nodes: Vec<f64> = (0..count).map(|i| min + i as f64 * step).collect();
        nodes[count - 1] = max;

        if nodes.windows(2).any(|w| w[1] <= w[0]) {
            return Err(SolverError::InvalidGrid(
                "grid spacing underflows; nodes are not strictly increasing".to_string(),
            ));
        }
        Ok(Self { nodes, step })
    }

    #[inline]
    pub fn nodes(&self) -> &[f64] {
        &self.nodes
    }

    #[inline]
    pub fn step(&self) -> f64 {
        self.step
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    pub fn min(&self) -> f64 {
        self.nodes[0]
    }

    #[inline]
    pub fn max(&self) -> f64 {
        self.nodes[self.nodes.len() - 1]
    }
}

/// Flattened index of capital node `i` in exogenous row `j`.
#[inline]
pub fn idx(i: usize, j: usize, n_k: usize) -> usize {
    j * n_k + i
}

/// Capital grid, optionally crossed with an exogenous-state grid.
///
/// Flattening is row-major with capital varying fastest: node `(i, j)` sits at
/// `j * I + i`, so capital neighbours are one apart and exogenous neighbours `I`
/// apart.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StateGrid {
    pub capital: Grid,
    pub exogenous: Option<Grid>,
}

impl StateGrid {
    pub fn one_dimensional(capital: Grid) -> Self {
        Self {
            capital,
            exogenous: None,
        }
    }

    pub fn two_dimensional(capital: Grid, exogenous: Grid) -> Self {
        Self {
            capital,
            exogenous: Some(exogenous),
        }
    }

    /// Number of capital nodes `I`.
    #[inline]
    pub fn n_capital(&self) -> usize {
        self.capital.len()
    }

    /// Number of exogenous nodes `J` (1 without an exogenous state).
    #[inline]
    pub fn n_exogenous(&self) -> usize {
        self.exogenous.as_ref().map_or(1, Grid::len)
    }

    #[inline]
    pub fn n_points(&self) -> usize {
        self.n_capital() * self.n_exogenous()
    }

    /// Exogenous level in row `j` (1 without an exogenous state).
    #[inline]
    pub fn exogenous_value(&self, j: usize) -> f64 {
        self.exogenous.as_ref().map_or(1.0, |g| g.nodes[j])
    }

    /// Capital coordinate of every flattened node.
    pub fn capital_mesh(&self) -> Vec<f64> {
        let mut mesh = Vec::with_capacity(self.n_points());
        for _ in 0..self.n_exogenous() {
            mesh.extend_from_slice(self.capital.nodes());
        }
        mesh
    }

    /// Exogenous coordinate of every flattened node.
    pub fn exogenous_mesh(&self) -> Vec<f64> {
        let n_k = self.n_capital();
        let mut mesh = Vec::with_capacity(self.n_points());
        for j in 0..self.n_exogenous() {
            let z = self.exogenous_value(j);
            mesh.extend(std::iter::repeat_n(z, n_k));
        }
        mesh
    }
}

/// Bounds policy for building a [`StateGrid`] around a model's steady state.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GridSpec {
    /// Capital node count `I`.
    pub capital_points: usize,
    /// Exogenous node count `J`, ignored for single-state models.
    pub exogenous_points: usize,
    /// `k_min = lower_factor * k*`.
    pub lower_factor: f64,
    /// `k_max = upper_factor * k* * (1 + sigma_widening * σ)`.
    pub upper_factor: f64,
    /// Widening of the upper capital bound per unit of diffusion parameter.
    pub sigma_widening: f64,
    /// Exogenous bounds `z̄ exp(±width * sd(ln z))`.
    pub exogenous_width: f64,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            capital_points: 100,
            exogenous_points: 40,
            lower_factor: 0.3,
            upper_factor: 3.0,
            sigma_widening: 1.0,
            exogenous_width: 2.0,
        }
    }
}

impl GridSpec {
    pub fn new(capital_points: usize) -> Self {
        Self {
            capital_points,
            ..Self::default()
        }
    }

    pub fn with_exogenous_points(mut self, exogenous_points: usize) -> Self {
        self.exogenous_points = exogenous_points;
        self
    }

    pub fn with_capital_factors(mut self, lower_factor: f64, upper_factor: f64) -> Self {
        self.lower_factor = lower_factor;
        self.upper_factor = upper_factor;
        self
    }

    pub fn with_sigma_widening(mut self, sigma_widening: f64) -> Self {
        self.sigma_widening = sigma_widening;
        self
    }

    pub fn with_exogenous_width(mut self, exogenous_width: f64) -> Self {
        self.exogenous_width = exogenous_width;
        self
    }

    /// Capital bounds implied by the model's steady state and diffusion parameter.
    pub fn capital_bounds(&self, model: &GrowthModel) -> Result<(f64, f64), SolverError> {
        if !self.lower_factor.is_finite()
            || !self.upper_factor.is_finite()
            || !self.sigma_widening.is_finite()
            || self.lower_factor <= 0.0
            || self.sigma_widening < 0.0
        {
            return Err(SolverError::InvalidGrid(
                "capital bound factors must be finite, lower_factor > 0, sigma_widening >= 0"
                    .to_string(),
            ));
        }
        let kss = model.steady_state_capital();
        let sigma = model.dynamics.diffusion_parameter();
        let k_min = self.lower_factor * kss;
        let k_max = self.upper_factor * kss * (1.0 + self.sigma_widening * sigma);
        Ok((k_min, k_max))
    }

    /// Exogenous bounds `z̄ exp(±width * sd)`; `None` for single-state models.
    pub fn exogenous_bounds(
        &self,
        model: &GrowthModel,
    ) -> Result<Option<(f64, f64)>, SolverError> {
        let Some(process) = model.exogenous() else {
            return Ok(None);
        };
        if !self.exogenous_width.is_finite() || self.exogenous_width <= 0.0 {
            return Err(SolverError::InvalidGrid(
                "exogenous_width must be finite and > 0".to_string(),
            ));
        }
        let sd = process.stationary_variance().sqrt();
        let z_bar = process.stationary_mean();
        let spread = (self.exogenous_width * sd).exp();
        Ok(Some((z_bar / spread, z_bar * spread)))
    }

    /// Builds the grid for `model`.
    pub fn build(&self, model: &GrowthModel) -> Result<StateGrid, SolverError> {
        let (k_min, k_max) = self.capital_bounds(model)?;
        let capital = Grid::uniform(k_min, k_max, self.capital_points)?;
        match self.exogenous_bounds(model)? {
            None => Ok(StateGrid::one_dimensional(capital)),
            Some((z_min, z_max)) => {
                let exogenous = Grid::uniform(z_min, z_max, self.exogenous_points)?;
                Ok(StateGrid::two_dimensional(capital, exogenous))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Dynamics, LogOuProcess, ModelParameters};
    use approx::assert_relative_eq;

    #[test]
    fn uniform_grid_has_constant_spacing() {
        let g = Grid::uniform(0.5, 3.5, 7).unwrap();
        assert_eq!(g.len(), 7);
        assert_relative_eq!(g.step(), 0.5, epsilon = 1e-15);
        for w in g.nodes().windows(2) {
            assert!(w[1] > w[0]);
            assert_relative_eq!(w[1] - w[0], g.step(), epsilon = 1e-12);
        }
        assert_eq!(g.max(), 3.5);
    }

    #[test]
    fn rejects_malformed_bounds() {
        assert!(matches!(Grid::uniform(1.0, 1.0, 5), Err(SolverError::InvalidGrid(_))));
        assert!(matches!(Grid::uniform(2.0, 1.0, 5), Err(SolverError::InvalidGrid(_))));
        assert!(matches!(Grid::uniform(0.0, 1.0, 1), Err(SolverError::InvalidGrid(_))));
        assert!(matches!(
            Grid::uniform(f64::NAN, 1.0, 4),
            Err(SolverError::InvalidGrid(_))
        ));
    }

    #[test]
    fn meshes_follow_row_major_flattening() {
        let k = Grid::uniform(1.0, 3.0, 3).unwrap();
        let z = Grid::uniform(0.5, 1.5, 2).unwrap();
        let grid = StateGrid::two_dimensional(k, z);
        assert_eq!(grid.n_points(), 6);
        assert_eq!(grid.capital_mesh(), vec![1.0, 2.0, 3.0, 1.0, 2.0, 3.0]);
        assert_eq!(grid.exogenous_mesh(), vec![0.5, 0.5, 0.5, 1.5, 1.5, 1.5]);
        assert_eq!(idx(2, 1, 3), 5);
    }

    #[test]
    fn one_dimensional_grid_has_unit_exogenous_level() {
        let grid = StateGrid::one_dimensional(Grid::uniform(1.0, 2.0, 4).unwrap());
        assert_eq!(grid.n_exogenous(), 1);
        assert_eq!(grid.exogenous_mesh(), vec![1.0; 4]);
    }

    #[test]
    fn grid_spec_brackets_steady_state_and_widens_with_sigma() {
        let model = GrowthModel::deterministic(ModelParameters::default()).unwrap();
        let spec = GridSpec::new(50);
        let grid = spec.build(&model).unwrap();
        let kss = model.steady_state_capital();
        assert!(grid.capital.min() < kss && kss < grid.capital.max());

        let noisy = model.with_diffusion_parameter(0.2).unwrap();
        let wide = spec.build(&noisy).unwrap();
        assert_relative_eq!(wide.capital.max(), grid.capital.max() * 1.2, epsilon = 1e-10);
    }

    #[test]
    fn degenerate_exogenous_process_is_an_invalid_grid() {
        let process = LogOuProcess::new(0.1, 0.0).unwrap();
        let model =
            GrowthModel::new(ModelParameters::default(), Dynamics::Exogenous { process }).unwrap();
        assert!(matches!(
            GridSpec::default().build(&model),
            Err(SolverError::InvalidGrid(_))
        ));
    }
}
