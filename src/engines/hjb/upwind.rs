//! Upwind selection of the value-function derivative along the capital dimension.
//!
//! At each node the forward and backward differences each imply a consumption
//! level (through inverse marginal utility) and hence a capital drift. The forward
//! estimate is valid where that drift is positive, the backward one where it is
//! negative, and the drift-free steady-state candidate covers the remainder.
//!
//! The raw indicator construction `If = [μ_f > 0]`, `Ib = [μ_b < 0]`,
//! `I0 = 1 - If - Ib` double counts when both hold at once. Such nodes resolve to
//! the backward candidate, so the selected indicators always sum to one.

use crate::core::SolverError;
use crate::engines::hjb::grid::{StateGrid, idx};
use crate::models::{Crra, GrowthModel};

/// Differencing direction chosen at a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum UpwindDirection {
    Forward,
    Backward,
    SteadyState,
}

impl UpwindDirection {
    /// Indicator weights `[If, Ib, I0]` of this selection.
    #[inline]
    pub fn indicators(self) -> [f64; 3] {
        match self {
            Self::Forward => [1.0, 0.0, 0.0],
            Self::Backward => [0.0, 1.0, 0.0],
            Self::SteadyState => [0.0, 0.0, 1.0],
        }
    }
}

/// Forward, backward, and steady-state candidates at one node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeCandidates {
    pub forward_derivative: f64,
    pub backward_derivative: f64,
    pub steady_derivative: f64,
    pub forward_consumption: f64,
    pub backward_consumption: f64,
    pub steady_consumption: f64,
    pub forward_drift: f64,
    pub backward_drift: f64,
}

impl NodeCandidates {
    /// Unresolved indicators `(If, Ib, I0)` with `I0 = 1 - If - Ib`.
    pub fn raw_indicators(&self) -> (f64, f64, f64) {
        let i_f = if self.forward_drift > 0.0 { 1.0 } else { 0.0 };
        let i_b = if self.backward_drift < 0.0 { 1.0 } else { 0.0 };
        (i_f, i_b, 1.0 - i_f - i_b)
    }

    /// Both one-sided drifts point into the state-improving direction.
    pub fn is_ambiguous(&self) -> bool {
        self.forward_drift > 0.0 && self.backward_drift < 0.0
    }

    /// Selected direction; ambiguous nodes resolve backward.
    pub fn select(&self) -> UpwindDirection {
        if self.backward_drift < 0.0 {
            UpwindDirection::Backward
        } else if self.forward_drift > 0.0 {
            UpwindDirection::Forward
        } else {
            UpwindDirection::SteadyState
        }
    }
}

/// Consumption policy and implied dynamics on the flattened grid.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PolicyFunction {
    pub consumption: Vec<f64>,
    /// Net capital drift `k̇`.
    pub drift: Vec<f64>,
    /// Gross saving `y - c`.
    pub savings: Vec<f64>,
    /// Upwind value-function derivative.
    pub derivative: Vec<f64>,
    pub direction: Vec<UpwindDirection>,
}

impl PolicyFunction {
    /// Period utility at each node.
    pub fn utility(&self, utility: Crra) -> Vec<f64> {
        self.consumption.iter().map(|&c| utility.utility(c)).collect()
    }

    pub fn len(&self) -> usize {
        self.consumption.len()
    }

    pub fn is_empty(&self) -> bool {
        self.consumption.is_empty()
    }
}

/// Upwind differencing of a value function on a [`StateGrid`].
#[derive(Debug, Clone, Copy)]
pub struct UpwindScheme<'a> {
    model: &'a GrowthModel,
    grid: &'a StateGrid,
}

impl<'a> UpwindScheme<'a> {
    pub fn new(model: &'a GrowthModel, grid: &'a StateGrid) -> Self {
        Self { model, grid }
    }

    /// Candidates at every node of `value`.
    pub fn candidates(&self, value: &[f64]) -> Result<Vec<NodeCandidates>, SolverError> {
        let n_k = self.grid.n_capital();
        let n_z = self.grid.n_exogenous();
        if value.len() != n_k * n_z {
            return Err(SolverError::InvalidInput(format!(
                "value function has {} entries, grid has {}",
                value.len(),
                n_k * n_z
            )));
        }

        let utility = self.model.utility();
        let dk = self.grid.capital.step();
        let k_nodes = self.grid.capital.nodes();
        let mut out = Vec::with_capacity(value.len());

        for j in 0..n_z {
            let z = self.grid.exogenous_value(j);
            for (i, &k) in k_nodes.iter().enumerate() {
                let p = idx(i, j, n_k);

                let c0 = self.model.drift_free_consumption(k, z);
                if !c0.is_finite() || c0 <= 0.0 {
                    return Err(SolverError::Domain(format!(
                        "drift-free consumption {c0} at node (k={k}, z={z}); \
                         capital grid extends past the maximum sustainable stock"
                    )));
                }
                let dv0 = utility.marginal(c0);

                // State constraints: the one-sided difference that would leave the
                // grid is pinned to the drift-free marginal utility.
                let vf = if i + 1 < n_k {
                    (value[p + 1] - value[p]) / dk
                } else {
                    dv0
                };
                let vb = if i > 0 { (value[p] - value[p - 1]) / dk } else { dv0 };

                let cf = utility.inverse_marginal(vf).map_err(|e| at_node(e, i, j))?;
                let cb = utility.inverse_marginal(vb).map_err(|e| at_node(e, i, j))?;

                out.push(NodeCandidates {
                    forward_derivative: vf,
                    backward_derivative: vb,
                    steady_derivative: dv0,
                    forward_consumption: cf,
                    backward_consumption: cb,
                    steady_consumption: c0,
                    forward_drift: self.model.capital_drift(k, z, cf),
                    backward_drift: self.model.capital_drift(k, z, cb),
                });
            }
        }
        Ok(out)
    }

    /// Upwind policy implied by `value`.
    pub fn policy(&self, value: &[f64]) -> Result<PolicyFunction, SolverError> {
        let candidates = self.candidates(value)?;
        let n = candidates.len();
        let n_k = self.grid.n_capital();
        let k_nodes = self.grid.capital.nodes();

        let mut policy = PolicyFunction {
            consumption: vec![0.0; n],
            drift: vec![0.0; n],
            savings: vec![0.0; n],
            derivative: vec![0.0; n],
            direction: vec![UpwindDirection::SteadyState; n],
        };

        for (p, cand) in candidates.iter().enumerate() {
            let direction = cand.select();
            let (c, drift, dv) = match direction {
                UpwindDirection::Forward => (
                    cand.forward_consumption,
                    cand.forward_drift,
                    cand.forward_derivative,
                ),
                UpwindDirection::Backward => (
                    cand.backward_consumption,
                    cand.backward_drift,
                    cand.backward_derivative,
                ),
                UpwindDirection::SteadyState => {
                    (cand.steady_consumption, 0.0, cand.steady_derivative)
                }
            };
            let k = k_nodes[p % n_k];
            let z = self.grid.exogenous_value(p / n_k);

            policy.consumption[p] = c;
            policy.drift[p] = drift;
            policy.savings[p] = self.model.production(k, z) - c;
            policy.derivative[p] = dv;
            policy.direction[p] = direction;
        }
        Ok(policy)
    }
}

fn at_node(err: SolverError, i: usize, j: usize) -> SolverError {
    match err {
        SolverError::Domain(msg) => SolverError::Domain(format!("{msg} at node ({i}, {j})")),
        other => other,
    }
}
