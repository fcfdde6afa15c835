//! Exogenous productivity process: `ln z` follows an Ornstein-Uhlenbeck process.
//!
//! With `d ln z = -θ ln z dt + σ dW`, Itô's lemma gives the level dynamics
//! `dz = μ(z) dt + σ z dW` where `μ(z) = (-θ ln z + σ²/2) z` and the
//! instantaneous variance is `Σ(z) = σ² z²`. The stationary distribution of
//! `ln z` is normal with mean 0 and variance `σ²/(2θ)`.

use crate::core::SolverError;

/// Mean-reverting log-productivity process.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LogOuProcess {
    /// Mean-reversion speed `θ > 0`.
    pub theta: f64,
    /// Volatility `σ` of `ln z`.
    pub sigma: f64,
}

impl LogOuProcess {
    pub fn new(theta: f64, sigma: f64) -> Result<Self, SolverError> {
        let process = Self { theta, sigma };
        process.validate()?;
        Ok(process)
    }

    /// Builds the process from the stationary variance of `ln z`: `σ² = 2θ·Var`.
    pub fn from_stationary_variance(theta: f64, variance: f64) -> Result<Self, SolverError> {
        if !variance.is_finite() || variance < 0.0 {
            return Err(SolverError::InvalidInput(
                "stationary variance must be finite and >= 0".to_string(),
            ));
        }
        Self::new(theta, (2.0 * theta * variance).sqrt())
    }

    /// Builds the process from a unit-time autocorrelation: `θ = -ln(corr)`.
    pub fn from_correlation(correlation: f64, variance: f64) -> Result<Self, SolverError> {
        if !(correlation > 0.0 && correlation < 1.0) {
            return Err(SolverError::InvalidInput(
                "autocorrelation must lie in (0, 1)".to_string(),
            ));
        }
        Self::from_stationary_variance(-correlation.ln(), variance)
    }

    pub fn validate(&self) -> Result<(), SolverError> {
        if !self.theta.is_finite() || self.theta <= 0.0 {
            return Err(SolverError::InvalidInput(
                "mean-reversion speed must be finite and > 0".to_string(),
            ));
        }
        if !self.sigma.is_finite() || self.sigma < 0.0 {
            return Err(SolverError::InvalidInput(
                "process volatility must be finite and >= 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns a copy with volatility replaced.
    pub fn with_sigma(self, sigma: f64) -> Self {
        Self { sigma, ..self }
    }

    #[inline]
    pub fn sigma2(&self) -> f64 {
        self.sigma * self.sigma
    }

    /// Level drift `μ(z) = (-θ ln z + σ²/2) z`.
    #[inline]
    pub fn drift(&self, z: f64) -> f64 {
        (-self.theta * z.ln() + 0.5 * self.sigma2()) * z
    }

    /// Level variance `Σ(z) = σ² z²`.
    #[inline]
    pub fn variance(&self, z: f64) -> f64 {
        self.sigma2() * z * z
    }

    /// Stationary variance of `ln z`.
    #[inline]
    pub fn stationary_variance(&self) -> f64 {
        self.sigma2() / (2.0 * self.theta)
    }

    /// Stationary mean of `z`, `exp(Var/2)`.
    #[inline]
    pub fn stationary_mean(&self) -> f64 {
        (0.5 * self.stationary_variance()).exp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn correlation_constructor_matches_variance_target() {
        let process = LogOuProcess::from_correlation(0.9, 0.07).unwrap();
        assert_relative_eq!(process.theta, -(0.9_f64.ln()), epsilon = 1e-14);
        assert_relative_eq!(process.stationary_variance(), 0.07, epsilon = 1e-12);
    }

    #[test]
    fn drift_at_unit_level_is_ito_correction() {
        let process = LogOuProcess::new(0.1, 0.2).unwrap();
        assert_relative_eq!(process.drift(1.0), 0.02, epsilon = 1e-14);
        assert_relative_eq!(process.variance(2.0), 0.16, epsilon = 1e-14);
    }

    #[test]
    fn drift_reverts_towards_the_stationary_region() {
        let process = LogOuProcess::new(0.5, 0.1).unwrap();
        assert!(process.drift(2.0) < 0.0);
        assert!(process.drift(0.5) > 0.0);
    }

    #[test]
    fn rejects_non_positive_mean_reversion() {
        assert!(LogOuProcess::new(0.0, 0.1).is_err());
        assert!(LogOuProcess::from_correlation(1.0, 0.07).is_err());
    }
}
