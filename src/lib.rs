//! `ramsey_fd` solves the stationary Hamilton-Jacobi-Bellman equation of the
//! neoclassical (Ramsey / real-business-cycle) growth model on a finite grid.
//!
//! The value function is found with the implicit upwind finite-difference scheme:
//! forward and backward differences of `V` along capital each imply a consumption
//! level, the one consistent with the sign of the implied capital drift is kept, and
//! the resulting Markov-chain generator is inverted implicitly in pseudo-time until
//! the sup-norm change falls below tolerance.
//!
//! Three flavours of uncertainty are supported: none, a diffusion proportional to
//! capital, and a mean-reverting log-productivity process that adds a second state
//! dimension. On top of the solver sits a belief-update experiment in which the
//! agent re-solves the model every period under a diffusion parameter that drifts
//! towards the true one at random moments.
//!
//! References:
//! - Achdou, Han, Lasry, Lions and Moll (2022), *Income and Wealth Distribution in
//!   Macroeconomics: A Continuous-Time Approach*.
//! - Barles and Souganidis (1991) for monotone-scheme convergence.
//!
//! Numerical considerations:
//! - The capital grid must stay below the stock at which output no longer covers
//!   effective depreciation; past that point the drift-free consumption is negative
//!   and the solve fails with a domain error.
//! - Large relaxation steps `Δ` converge in a handful of iterations because each step
//!   is an exact linear solve.
//!
//! # Quick Start
//! Solve the deterministic model and locate its steady state:
//! ```rust
//! use ramsey_fd::core::HjbEngine;
//! use ramsey_fd::engines::hjb::{GridSpec, ImplicitHjbEngine, ValueIteration};
//! use ramsey_fd::models::{GrowthModel, ModelParameters};
//!
//! let model = GrowthModel::deterministic(ModelParameters::default()).unwrap();
//! let engine = ImplicitHjbEngine::new(GridSpec::new(80))
//!     .with_value_iteration(ValueIteration::default().with_max_iterations(200));
//! let solution = engine.solve(&model).unwrap();
//! assert!(solution.is_converged());
//!
//! let kss = solution.steady_state_capital(0).unwrap();
//! assert!((kss / model.steady_state_capital() - 1.0).abs() < 0.05);
//! ```
//!
//! Run a short belief-update experiment:
//! ```rust
//! use ramsey_fd::engines::hjb::{BeliefTrajectory, BeliefUpdate, GridSpec, ImplicitHjbEngine};
//! use ramsey_fd::math::{FastRng, FastRngKind};
//! use ramsey_fd::models::{GrowthModel, ModelParameters};
//!
//! let model = GrowthModel::deterministic(ModelParameters::default()).unwrap();
//! let engine = ImplicitHjbEngine::new(GridSpec::new(30));
//! let experiment = BeliefUpdate::new(0.05, 0.1, 3)
//!     .with_update_probability(1.0)
//!     .with_learning_rate(0.5);
//!
//! let mut rng = FastRng::from_seed(FastRngKind::Xoshiro256PlusPlus, 7);
//! let mut trajectory = BeliefTrajectory::new();
//! experiment.run(&engine, &model, &mut rng, &mut trajectory).unwrap();
//! assert_eq!(trajectory.len(), 3);
//! assert!((trajectory.current_belief() - 0.05625).abs() < 1e-12);
//! ```

pub mod core;
pub mod engines;
pub mod math;
pub mod models;

/// Common imports for ergonomic usage.
#[allow(ambiguous_glob_reexports)]
pub mod prelude {
    pub use crate::core::*;
    pub use crate::engines::hjb::*;
    pub use crate::math::{FastRng, FastRngKind};
    pub use crate::models::*;
}
