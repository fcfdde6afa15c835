//! Neoclassical growth technology and capital dynamics.
//!
//! Output is Cobb-Douglas `y = A z k^α`; capital per effective worker evolves as
//! `dk = (y - (δ + n) k - c) dt [+ σ k dW]`. The drift expression here is the single
//! source of truth for the sign test that drives upwind differencing.

use crate::core::SolverError;
use crate::models::exogenous::LogOuProcess;
use crate::models::utility::Crra;

/// Structural constants of the growth model.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ModelParameters {
    /// Relative risk aversion `γ`.
    pub risk_aversion: f64,
    /// Subjective discount rate `ρ`.
    pub discount_rate: f64,
    /// Capital share `α` in production.
    pub capital_share: f64,
    /// Depreciation rate `δ`.
    pub depreciation: f64,
    /// Growth rate `n` added to depreciation in the capital law of motion.
    pub growth_rate: f64,
    /// Total factor productivity `A`.
    pub tfp: f64,
}

impl Default for ModelParameters {
    fn default() -> Self {
        Self {
            risk_aversion: 2.0,
            discount_rate: 0.05,
            capital_share: 0.3,
            depreciation: 0.05,
            growth_rate: 0.0,
            tfp: 1.0,
        }
    }
}

impl ModelParameters {
    /// Starts a parameter builder seeded with defaults.
    #[inline]
    pub fn builder() -> ModelParametersBuilder {
        ModelParametersBuilder::default()
    }

    pub fn validate(&self) -> Result<(), SolverError> {
        let finite = [
            self.risk_aversion,
            self.discount_rate,
            self.capital_share,
            self.depreciation,
            self.growth_rate,
            self.tfp,
        ]
        .iter()
        .all(|x| x.is_finite());
        if !finite {
            return Err(SolverError::InvalidInput(
                "model parameters must be finite".to_string(),
            ));
        }
        if self.risk_aversion <= 0.0 {
            return Err(SolverError::InvalidInput(
                "risk_aversion must be > 0".to_string(),
            ));
        }
        if self.discount_rate <= 0.0 {
            return Err(SolverError::InvalidInput(
                "discount_rate must be > 0".to_string(),
            ));
        }
        if self.capital_share <= 0.0 || self.capital_share >= 1.0 {
            return Err(SolverError::InvalidInput(
                "capital_share must lie in (0, 1)".to_string(),
            ));
        }
        if self.depreciation < 0.0 {
            return Err(SolverError::InvalidInput(
                "depreciation must be >= 0".to_string(),
            ));
        }
        if self.tfp <= 0.0 {
            return Err(SolverError::InvalidInput("tfp must be > 0".to_string()));
        }
        if self.discount_rate + self.depreciation + self.growth_rate <= 0.0 {
            return Err(SolverError::InvalidInput(
                "discount_rate + depreciation + growth_rate must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`ModelParameters`].
#[derive(Debug, Clone, Default)]
pub struct ModelParametersBuilder {
    risk_aversion: Option<f64>,
    discount_rate: Option<f64>,
    capital_share: Option<f64>,
    depreciation: Option<f64>,
    growth_rate: Option<f64>,
    tfp: Option<f64>,
}

impl ModelParametersBuilder {
    #[inline]
    pub fn risk_aversion(mut self, gamma: f64) -> Self {
        self.risk_aversion = Some(gamma);
        self
    }

    #[inline]
    pub fn discount_rate(mut self, rho: f64) -> Self {
        self.discount_rate = Some(rho);
        self
    }

    #[inline]
    pub fn capital_share(mut self, alpha: f64) -> Self {
        self.capital_share = Some(alpha);
        self
    }

    #[inline]
    pub fn depreciation(mut self, delta: f64) -> Self {
        self.depreciation = Some(delta);
        self
    }

    #[inline]
    pub fn growth_rate(mut self, n: f64) -> Self {
        self.growth_rate = Some(n);
        self
    }

    #[inline]
    pub fn tfp(mut self, tfp: f64) -> Self {
        self.tfp = Some(tfp);
        self
    }

    /// Validates and builds [`ModelParameters`], filling unset fields with defaults.
    pub fn build(self) -> Result<ModelParameters, SolverError> {
        let defaults = ModelParameters::default();
        let params = ModelParameters {
            risk_aversion: self.risk_aversion.unwrap_or(defaults.risk_aversion),
            discount_rate: self.discount_rate.unwrap_or(defaults.discount_rate),
            capital_share: self.capital_share.unwrap_or(defaults.capital_share),
            depreciation: self.depreciation.unwrap_or(defaults.depreciation),
            growth_rate: self.growth_rate.unwrap_or(defaults.growth_rate),
            tfp: self.tfp.unwrap_or(defaults.tfp),
        };
        params.validate()?;
        Ok(params)
    }
}

/// Uncertainty structure of the model.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Dynamics {
    /// Deterministic capital accumulation, single state.
    Deterministic,
    /// Single state with capital shocks `σ k dW`.
    CapitalDiffusion { sigma: f64 },
    /// Two states: capital and a log-OU productivity level.
    Exogenous { process: LogOuProcess },
}

impl Dynamics {
    /// Returns the operative diffusion parameter (`0` when deterministic).
    pub fn diffusion_parameter(&self) -> f64 {
        match self {
            Self::Deterministic => 0.0,
            Self::CapitalDiffusion { sigma } => *sigma,
            Self::Exogenous { process } => process.sigma,
        }
    }

    /// Replaces the operative diffusion parameter.
    ///
    /// A deterministic model becomes a capital-diffusion model when `sigma > 0`.
    pub fn with_diffusion_parameter(self, sigma: f64) -> Result<Self, SolverError> {
        if !sigma.is_finite() || sigma < 0.0 {
            return Err(SolverError::InvalidInput(
                "diffusion parameter must be finite and >= 0".to_string(),
            ));
        }
        Ok(match self {
            Self::Deterministic if sigma == 0.0 => Self::Deterministic,
            Self::Deterministic | Self::CapitalDiffusion { .. } => Self::CapitalDiffusion { sigma },
            Self::Exogenous { process } => Self::Exogenous {
                process: process.with_sigma(sigma),
            },
        })
    }

    pub fn validate(&self) -> Result<(), SolverError> {
        match self {
            Self::Deterministic => Ok(()),
            Self::CapitalDiffusion { sigma } => {
                if !sigma.is_finite() || *sigma < 0.0 {
                    return Err(SolverError::InvalidInput(
                        "capital volatility must be finite and >= 0".to_string(),
                    ));
                }
                Ok(())
            }
            Self::Exogenous { process } => process.validate(),
        }
    }
}

/// Growth model: preferences, technology, and uncertainty.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GrowthModel {
    pub params: ModelParameters,
    pub dynamics: Dynamics,
}

impl GrowthModel {
    pub fn new(params: ModelParameters, dynamics: Dynamics) -> Result<Self, SolverError> {
        params.validate()?;
        dynamics.validate()?;
        Ok(Self { params, dynamics })
    }

    /// Deterministic single-state model.
    pub fn deterministic(params: ModelParameters) -> Result<Self, SolverError> {
        Self::new(params, Dynamics::Deterministic)
    }

    /// Returns a copy with the operative diffusion parameter replaced.
    pub fn with_diffusion_parameter(&self, sigma: f64) -> Result<Self, SolverError> {
        Self::new(self.params, self.dynamics.with_diffusion_parameter(sigma)?)
    }

    #[inline]
    pub fn utility(&self) -> Crra {
        Crra::new(self.params.risk_aversion)
    }

    #[inline]
    pub fn exogenous(&self) -> Option<&LogOuProcess> {
        match &self.dynamics {
            Dynamics::Exogenous { process } => Some(process),
            _ => None,
        }
    }

    /// Effective depreciation `δ + n`.
    #[inline]
    pub fn depreciation_adjustment(&self) -> f64 {
        self.params.depreciation + self.params.growth_rate
    }

    /// Output `A z k^α`.
    #[inline]
    pub fn production(&self, k: f64, z: f64) -> f64 {
        self.params.tfp * z * k.powf(self.params.capital_share)
    }

    /// Consumption that leaves capital unchanged, `y - (δ + n) k`.
    #[inline]
    pub fn drift_free_consumption(&self, k: f64, z: f64) -> f64 {
        self.production(k, z) - self.depreciation_adjustment() * k
    }

    /// Net capital drift under consumption `c`.
    #[inline]
    pub fn capital_drift(&self, k: f64, z: f64, c: f64) -> f64 {
        self.drift_free_consumption(k, z) - c
    }

    /// Instantaneous capital variance (`σ² k²` under capital diffusion).
    #[inline]
    pub fn capital_variance(&self, k: f64) -> f64 {
        match self.dynamics {
            Dynamics::CapitalDiffusion { sigma } => sigma * sigma * k * k,
            _ => 0.0,
        }
    }

    /// Mean productivity level used to centre the capital grid.
    #[inline]
    pub fn mean_productivity(&self) -> f64 {
        self.exogenous()
            .map_or(1.0, LogOuProcess::stationary_mean)
    }

    /// Deterministic steady state `k* = (α A z̄ / (ρ + δ + n))^{1/(1-α)}`.
    pub fn steady_state_capital(&self) -> f64 {
        let p = &self.params;
        let alpha = p.capital_share;
        let user_cost = p.discount_rate + self.depreciation_adjustment();
        (alpha * p.tfp * self.mean_productivity() / user_cost).powf(1.0 / (1.0 - alpha))
    }
}
