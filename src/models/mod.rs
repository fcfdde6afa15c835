//! Growth-model primitives: preferences, technology, and state dynamics.
//!
//! Everything here is a pure function of parameters and state; the finite-difference
//! engines in [`crate::engines::hjb`] consume these to build upwind coefficients.

pub mod exogenous;
pub mod growth;
pub mod utility;

pub use exogenous::LogOuProcess;
pub use growth::{Dynamics, GrowthModel, ModelParameters, ModelParametersBuilder};
pub use utility::Crra;
