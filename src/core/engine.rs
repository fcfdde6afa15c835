//! Core traits, solver result diagnostics, and library-wide error structures.

use crate::engines::hjb::HjbSolution;
use crate::models::GrowthModel;

/// Solver abstraction over a growth model.
pub trait HjbEngine {
    /// Solves the stationary HJB equation of `model` on the engine's grid.
    fn solve(&self, model: &GrowthModel) -> Result<HjbSolution, SolverError>;
}

/// Compact key set for solver diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum DiagKey {
    CapitalPoints,
    Converged,
    Delta,
    ExogenousPoints,
    FinalDistance,
    Iterations,
    KMax,
    KMin,
    SteadyStateCapital,
}

impl DiagKey {
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CapitalPoints => "capital_points",
            Self::Converged => "converged",
            Self::Delta => "delta",
            Self::ExogenousPoints => "exogenous_points",
            Self::FinalDistance => "final_distance",
            Self::Iterations => "iterations",
            Self::KMax => "k_max",
            Self::KMin => "k_min",
            Self::SteadyStateCapital => "steady_state_capital",
        }
    }
}

impl std::str::FromStr for DiagKey {
    type Err = ();

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        match key {
            "capital_points" => Ok(Self::CapitalPoints),
            "converged" => Ok(Self::Converged),
            "delta" => Ok(Self::Delta),
            "exogenous_points" => Ok(Self::ExogenousPoints),
            "final_distance" => Ok(Self::FinalDistance),
            "iterations" => Ok(Self::Iterations),
            "k_max" => Ok(Self::KMax),
            "k_min" => Ok(Self::KMin),
            "steady_state_capital" => Ok(Self::SteadyStateCapital),
            _ => Err(()),
        }
    }
}

/// Inline diagnostics storage used in [`HjbSolution`].
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Diagnostics {
    entries: [Option<(DiagKey, f64)>; 10],
}

impl Diagnostics {
    pub const CAPACITY: usize = 10;

    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.iter().flatten().count()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries[0].is_none()
    }

    /// Insert a diagnostic value, returning the previous value for `key`.
    #[inline]
    pub fn insert_key(&mut self, key: DiagKey, value: f64) -> Option<f64> {
        for (entry_key, existing) in self.entries.iter_mut().flatten() {
            if *entry_key == key {
                let prev = *existing;
                *existing = value;
                return Some(prev);
            }
        }

        for entry in &mut self.entries {
            if entry.is_none() {
                *entry = Some((key, value));
                return None;
            }
        }

        panic!("diagnostics capacity exceeded ({})", Self::CAPACITY);
    }

    #[inline]
    fn iter_entries(&self) -> impl Iterator<Item = &(DiagKey, f64)> {
        self.entries.iter().filter_map(Option::as_ref)
    }

    #[inline]
    pub fn get_key(&self, key: DiagKey) -> Option<f64> {
        self.iter_entries()
            .find_map(|(entry_key, value)| (*entry_key == key).then_some(*value))
    }

    #[inline]
    pub fn get(&self, key: &str) -> Option<f64> {
        let key: DiagKey = key.parse().ok()?;
        self.get_key(key)
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &f64)> {
        self.iter_entries().map(|(k, v)| (k.as_str(), v))
    }
}

/// Solver and model errors surfaced by the API.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SolverError {
    /// Malformed grid bounds or point counts.
    InvalidGrid(String),
    /// Parameter or configuration validation error.
    InvalidInput(String),
    /// The implicit linear system could not be solved.
    SingularSystem(String),
    /// Consumption or marginal utility evaluated outside its domain.
    Domain(String),
}

impl std::fmt::Display for SolverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidGrid(msg) => write!(f, "invalid grid: {msg}"),
            Self::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            Self::SingularSystem(msg) => write!(f, "singular system: {msg}"),
            Self::Domain(msg) => write!(f, "domain error: {msg}"),
        }
    }
}

impl std::error::Error for SolverError {}
