//! Long-horizon experiment in which the agent's diffusion belief drifts towards truth.
//!
//! Each period re-solves the stationary HJB problem under the currently held
//! diffusion parameter `σ_g` (grid bounds included), then with probability `p`
//! nudges the belief: `σ_g ← σ_g + λ (σ_true - σ_g)`. The run always covers every
//! period; randomness comes only from the caller's seeded [`FastRng`].

use tracing::{debug, info, warn};

use crate::core::{HjbEngine, SolverError};
use crate::engines::hjb::value_iteration::HjbSolution;
use crate::math::FastRng;
use crate::models::GrowthModel;

/// What to do when a period's fixed-point solve fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop and return the error; earlier records stay intact.
    #[default]
    Abort,
    /// Record the failure and carry on with the belief draw.
    SkipPeriod,
}

/// Belief-update experiment settings.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BeliefUpdate {
    /// Data-generating diffusion parameter.
    pub true_sigma: f64,
    /// Belief held in the first period.
    pub initial_belief: f64,
    /// Per-period success probability of the update trial.
    pub update_probability: f64,
    /// Learning rate `λ` applied on success.
    pub learning_rate: f64,
    /// Horizon `T`.
    pub periods: usize,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

impl Default for BeliefUpdate {
    fn default() -> Self {
        Self {
            true_sigma: 0.1,
            initial_belief: 0.2,
            update_probability: 0.1,
            learning_rate: 0.001,
            periods: 10_000,
            failure_policy: FailurePolicy::Abort,
        }
    }
}

/// Belief after one successful update trial.
#[inline]
pub fn nudge_belief(belief: f64, true_sigma: f64, learning_rate: f64) -> f64 {
    belief + learning_rate * (true_sigma - belief)
}

impl BeliefUpdate {
    pub fn new(true_sigma: f64, initial_belief: f64, periods: usize) -> Self {
        Self {
            true_sigma,
            initial_belief,
            periods,
            ..Self::default()
        }
    }

    pub fn with_update_probability(mut self, p: f64) -> Self {
        self.update_probability = p;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }

    pub fn validate(&self) -> Result<(), SolverError> {
        for (name, v) in [
            ("true_sigma", self.true_sigma),
            ("initial_belief", self.initial_belief),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(SolverError::InvalidInput(format!(
                    "{name} must be finite and >= 0"
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.update_probability) {
            return Err(SolverError::InvalidInput(
                "update_probability must lie in [0, 1]".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.learning_rate) {
            return Err(SolverError::InvalidInput(
                "learning_rate must lie in [0, 1]".to_string(),
            ));
        }
        Ok(())
    }

    /// Runs `periods` periods, appending exactly one record per period.
    ///
    /// A non-empty `trajectory` is resumed from its last belief. The diffusion
    /// parameter of `model` is replaced by the belief each period; everything else
    /// about the model is held fixed.
    pub fn run<E: HjbEngine>(
        &self,
        engine: &E,
        model: &GrowthModel,
        rng: &mut FastRng,
        trajectory: &mut BeliefTrajectory,
    ) -> Result<(), SolverError> {
        self.validate()?;
        if trajectory.beliefs.is_empty() {
            trajectory.beliefs.push(self.initial_belief);
        }
        let start = trajectory.records.len();
        info!(
            periods = self.periods,
            start_period = start + 1,
            belief = trajectory.current_belief(),
            true_sigma = self.true_sigma,
            "starting belief-update experiment"
        );

        for period in (start + 1)..=(start + self.periods) {
            let belief = trajectory.current_belief();
            let outcome = match model
                .with_diffusion_parameter(belief)
                .and_then(|m| engine.solve(&m))
            {
                Ok(solution) => PeriodOutcome::Solved(solution),
                Err(err) => match self.failure_policy {
                    FailurePolicy::Abort => return Err(err),
                    FailurePolicy::SkipPeriod => {
                        warn!(period, belief, error = %err, "skipping period after failed solve");
                        PeriodOutcome::Failed(err)
                    }
                },
            };

            let updated = rng.bernoulli(self.update_probability);
            let next = if updated {
                nudge_belief(belief, self.true_sigma, self.learning_rate)
            } else {
                belief
            };
            if updated {
                debug!(period, from = belief, to = next, "belief updated");
            }

            trajectory.push(PeriodRecord {
                period,
                belief_used: belief,
                belief_next: next,
                updated,
                outcome,
            });
        }

        info!(
            periods = self.periods,
            final_belief = trajectory.current_belief(),
            updates = trajectory.update_count(),
            failures = trajectory.failure_count(),
            "belief-update experiment finished"
        );
        Ok(())
    }
}

/// Result of one period's fixed-point solve.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum PeriodOutcome {
    Solved(HjbSolution),
    Failed(SolverError),
}

/// One period of the belief experiment.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PeriodRecord {
    /// 1-based period index.
    pub period: usize,
    /// Belief the period was solved under.
    pub belief_used: f64,
    /// Belief carried into the next period.
    pub belief_next: f64,
    /// Whether the update trial succeeded.
    pub updated: bool,
    pub outcome: PeriodOutcome,
}

impl PeriodRecord {
    pub fn solution(&self) -> Option<&HjbSolution> {
        match &self.outcome {
            PeriodOutcome::Solved(sol) => Some(sol),
            PeriodOutcome::Failed(_) => None,
        }
    }
}

/// Append-only record of a belief experiment.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BeliefTrajectory {
    /// Belief path: the initial belief followed by one entry per period.
    pub beliefs: Vec<f64>,
    pub records: Vec<PeriodRecord>,
}

impl BeliefTrajectory {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, record: PeriodRecord) {
        self.beliefs.push(record.belief_next);
        self.records.push(record);
    }

    /// Belief that the next period will be solved under.
    pub fn current_belief(&self) -> f64 {
        self.beliefs.last().copied().unwrap_or(f64::NAN)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn update_count(&self) -> usize {
        self.records.iter().filter(|r| r.updated).count()
    }

    pub fn failure_count(&self) -> usize {
        self.records.iter().filter(|r| r.solution().is_none()).count()
    }

    /// Periods whose inner loop exhausted its budget.
    pub fn non_converged_periods(&self) -> Vec<usize> {
        self.records
            .iter()
            .filter(|r| r.solution().is_some_and(|s| !s.is_converged()))
            .map(|r| r.period)
            .collect()
    }
}
