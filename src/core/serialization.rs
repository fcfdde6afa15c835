//! Experiment configuration and report payloads.
//!
//! These types define stable serde payloads used to persist experiment inputs and
//! to export solver results.
//!
//! # Examples
//! ```rust
//! use ramsey_fd::core::{ExperimentConfig, from_json, to_json_pretty};
//! use ramsey_fd::models::Dynamics;
//!
//! let config: ExperimentConfig =
//!     from_json(r#"{ "dynamics": { "kind": "capital_diffusion", "sigma": 0.1 }, "seed": 7 }"#)
//!         .expect("json deserialization");
//! assert_eq!(config.dynamics, Dynamics::CapitalDiffusion { sigma: 0.1 });
//! assert_eq!(config.seed, 7);
//!
//! let json = to_json_pretty(&config).expect("json serialization");
//! let decoded: ExperimentConfig = from_json(&json).expect("json deserialization");
//! assert_eq!(decoded, config);
//! ```

use serde::de::DeserializeOwned;

use crate::core::SolverError;
use crate::engines::hjb::{
    BeliefTrajectory, BeliefUpdate, HjbSolution, ImplicitHjbEngine, PeriodOutcome,
};
use crate::math::{FastRng, FastRngKind};
use crate::models::{Dynamics, GrowthModel, ModelParameters};

fn default_dynamics() -> Dynamics {
    Dynamics::Deterministic
}

fn default_seed() -> u64 {
    42
}

/// Complete input of one experiment run.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ExperimentConfig {
    #[serde(default)]
    pub parameters: ModelParameters,
    /// Shape of the uncertainty. Its diffusion parameter is only a placeholder:
    /// [`base_model`](Self::base_model) replaces it with `belief.true_sigma` and the
    /// belief loop replaces it with the belief held each period.
    #[serde(default = "default_dynamics")]
    pub dynamics: Dynamics,
    #[serde(default)]
    pub engine: ImplicitHjbEngine,
    #[serde(default)]
    pub belief: BeliefUpdate,
    #[serde(default)]
    pub rng: FastRngKind,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            parameters: ModelParameters::default(),
            dynamics: default_dynamics(),
            engine: ImplicitHjbEngine::default(),
            belief: BeliefUpdate::default(),
            rng: FastRngKind::default(),
            seed: default_seed(),
        }
    }
}

impl ExperimentConfig {
    /// Validated model described by this configuration.
    pub fn model(&self) -> Result<GrowthModel, SolverError> {
        GrowthModel::new(self.parameters, self.dynamics)
    }

    /// Model under the data-generating diffusion parameter `belief.true_sigma`.
    pub fn base_model(&self) -> Result<GrowthModel, SolverError> {
        self.model()?.with_diffusion_parameter(self.belief.true_sigma)
    }

    /// Whether `dynamics` carries a diffusion parameter that the runs will replace.
    pub fn overrides_configured_diffusion(&self) -> bool {
        let configured = self.dynamics.diffusion_parameter();
        configured != 0.0 && configured != self.belief.true_sigma
    }

    /// Fresh generator seeded from this configuration.
    pub fn rng(&self) -> FastRng {
        FastRng::from_seed(self.rng, self.seed)
    }
}

/// Output of a single solve.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BaseReport {
    pub config: ExperimentConfig,
    pub solution: HjbSolution,
}

/// Per-period digest of a belief experiment.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PeriodSummary {
    pub period: usize,
    pub belief_used: f64,
    pub belief_next: f64,
    pub updated: bool,
    /// `None` when the period's solve failed.
    pub converged: Option<bool>,
    pub iterations: usize,
    pub steady_state_capital: Option<f64>,
    pub error: Option<String>,
}

/// Output of a belief-update experiment.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AdaptiveReport {
    pub config: ExperimentConfig,
    pub beliefs: Vec<f64>,
    pub periods: Vec<PeriodSummary>,
}

impl AdaptiveReport {
    pub fn from_trajectory(config: ExperimentConfig, trajectory: &BeliefTrajectory) -> Self {
        let periods = trajectory
            .records
            .iter()
            .map(|rec| {
                let solution = rec.solution();
                PeriodSummary {
                    period: rec.period,
                    belief_used: rec.belief_used,
                    belief_next: rec.belief_next,
                    updated: rec.updated,
                    converged: solution.map(HjbSolution::is_converged),
                    iterations: solution.map_or(0, |s| s.iterations),
                    steady_state_capital: solution
                        .and_then(|s| s.steady_state_capital(s.grid.n_exogenous() / 2)),
                    error: match &rec.outcome {
                        PeriodOutcome::Failed(err) => Some(err.to_string()),
                        PeriodOutcome::Solved(_) => None,
                    },
                }
            })
            .collect();
        Self {
            config,
            beliefs: trajectory.beliefs.clone(),
            periods,
        }
    }
}

/// Serialize a value to pretty JSON.
pub fn to_json_pretty<T: serde::Serialize>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(value)
}

/// Deserialize a value from JSON.
pub fn from_json<T: DeserializeOwned>(payload: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(payload)
}

/// Serialize a value to MessagePack bytes.
pub fn to_msgpack<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, rmp_serde::encode::Error> {
    rmp_serde::to_vec_named(value)
}

/// Deserialize a value from MessagePack bytes.
pub fn from_msgpack<T: DeserializeOwned>(payload: &[u8]) -> Result<T, rmp_serde::decode::Error> {
    rmp_serde::from_slice(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::hjb::GridSpec;
    use crate::models::LogOuProcess;

    #[test]
    fn empty_object_yields_defaults() {
        let config: ExperimentConfig = from_json("{}").unwrap();
        assert_eq!(config, ExperimentConfig::default());
        assert!(config.model().is_ok());
    }

    #[test]
    fn exogenous_dynamics_survive_msgpack() {
        let config = ExperimentConfig {
            dynamics: Dynamics::Exogenous {
                process: LogOuProcess::from_correlation(0.9, 0.07).unwrap(),
            },
            engine: ImplicitHjbEngine::new(GridSpec::new(50).with_exogenous_points(12)),
            seed: 99,
            ..ExperimentConfig::default()
        };
        let bytes = to_msgpack(&config).unwrap();
        let decoded: ExperimentConfig = from_msgpack(&bytes).unwrap();
        assert_eq!(decoded, config);
    }

    #[test]
    fn invalid_parameters_rejected_on_model_construction() {
        let config: ExperimentConfig = from_json(
            r#"{ "parameters": { "risk_aversion": 2.0, "discount_rate": -0.05,
                 "capital_share": 0.3, "depreciation": 0.05, "growth_rate": 0.0, "tfp": 1.0 } }"#,
        )
        .unwrap();
        assert!(matches!(config.model(), Err(SolverError::InvalidInput(_))));
    }

    #[test]
    fn base_model_uses_true_sigma_over_configured_diffusion() {
        let process = LogOuProcess::new(0.1, 0.3).unwrap();
        let config = ExperimentConfig {
            dynamics: Dynamics::Exogenous { process },
            belief: BeliefUpdate::new(0.07, 0.2, 1),
            ..ExperimentConfig::default()
        };
        assert!(config.overrides_configured_diffusion());
        let model = config.base_model().unwrap();
        assert_eq!(model.dynamics.diffusion_parameter(), 0.07);
        assert!(matches!(model.dynamics, Dynamics::Exogenous { .. }));

        let plain = ExperimentConfig::default();
        assert!(!plain.overrides_configured_diffusion());
        assert_eq!(
            plain.base_model().unwrap().dynamics,
            Dynamics::CapitalDiffusion { sigma: 0.1 }
        );
    }

    #[test]
    fn same_config_gives_same_random_stream() {
        let config = ExperimentConfig::default();
        let mut a = config.rng();
        let mut b = config.rng();
        for _ in 0..16 {
            assert_eq!(a.random_f64(), b.random_f64());
        }
    }
}
