//! Implicit upwind finite-difference solver for the stationary growth-model HJB equation.

pub mod belief;
pub mod engine;
pub mod generator;
pub mod grid;
pub mod implicit;
pub mod upwind;
pub mod value_iteration;

pub use belief::{
    BeliefTrajectory, BeliefUpdate, FailurePolicy, PeriodOutcome, PeriodRecord, nudge_belief,
};
pub use engine::ImplicitHjbEngine;
pub use generator::{ExogenousBlock, GeneratorMatrix};
pub use grid::{Grid, GridSpec, StateGrid, idx};
pub use implicit::ImplicitSolver;
pub use upwind::{NodeCandidates, PolicyFunction, UpwindDirection, UpwindScheme};
pub use value_iteration::{ConvergenceStatus, HjbSolution, ValueIteration, initial_guess};
