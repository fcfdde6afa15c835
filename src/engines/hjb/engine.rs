use tracing::info;

use crate::core::{HjbEngine, SolverError};
use crate::engines::hjb::grid::GridSpec;
use crate::engines::hjb::value_iteration::{HjbSolution, ValueIteration};
use crate::models::GrowthModel;

/// Implicit upwind finite-difference engine for the stationary HJB equation.
///
/// Builds a fresh grid from the model on every solve, so grid bounds follow the
/// model's diffusion parameter.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct ImplicitHjbEngine {
    pub grid: GridSpec,
    pub iteration: ValueIteration,
}

impl ImplicitHjbEngine {
    pub fn new(grid: GridSpec) -> Self {
        Self {
            grid,
            iteration: ValueIteration::default(),
        }
    }

    pub fn with_value_iteration(mut self, iteration: ValueIteration) -> Self {
        self.iteration = iteration;
        self
    }
}

impl HjbEngine for ImplicitHjbEngine {
    fn solve(&self, model: &GrowthModel) -> Result<HjbSolution, SolverError> {
        let grid = self.grid.build(model)?;
        let solution = self.iteration.run(model, &grid, None)?;
        info!(
            iterations = solution.iterations,
            converged = solution.is_converged(),
            sigma = model.dynamics.diffusion_parameter(),
            "hjb solve finished"
        );
        Ok(solution)
    }
}
