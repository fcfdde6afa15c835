//! CRRA period utility `u(c) = c^{1-γ}/(1-γ)` with the log limit at `γ = 1`.

use crate::core::SolverError;

/// Constant-relative-risk-aversion utility.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Crra {
    /// Relative risk aversion `γ > 0`.
    pub gamma: f64,
}

impl Crra {
    pub fn new(gamma: f64) -> Self {
        Self { gamma }
    }

    #[inline]
    fn is_log(&self) -> bool {
        (self.gamma - 1.0).abs() <= 1.0e-12
    }

    /// Period utility; `c` must be positive.
    #[inline]
    pub fn utility(&self, c: f64) -> f64 {
        if self.is_log() {
            c.ln()
        } else {
            c.powf(1.0 - self.gamma) / (1.0 - self.gamma)
        }
    }

    /// Marginal utility `u'(c) = c^{-γ}`.
    #[inline]
    pub fn marginal(&self, c: f64) -> f64 {
        c.powf(-self.gamma)
    }

    /// Inverts marginal utility, `c = (V')^{-1/γ}`.
    ///
    /// A non-positive or non-finite marginal value has no consumption preimage
    /// and is reported as [`SolverError::Domain`].
    #[inline]
    pub fn inverse_marginal(&self, marginal_value: f64) -> Result<f64, SolverError> {
        if !marginal_value.is_finite() || marginal_value <= 0.0 {
            return Err(SolverError::Domain(format!(
                "marginal value must be finite and > 0, got {marginal_value}"
            )));
        }
        let c = marginal_value.powf(-1.0 / self.gamma);
        if !c.is_finite() || c <= 0.0 {
            return Err(SolverError::Domain(format!(
                "implied consumption {c} from marginal value {marginal_value}"
            )));
        }
        Ok(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn inverse_marginal_undoes_marginal() {
        let u = Crra::new(2.0);
        let c = 1.37;
        assert_relative_eq!(u.inverse_marginal(u.marginal(c)).unwrap(), c, epsilon = 1e-12);
    }

    #[test]
    fn unit_risk_aversion_is_log_utility() {
        let u = Crra::new(1.0);
        assert_relative_eq!(u.utility(std::f64::consts::E), 1.0, epsilon = 1e-12);
        assert_relative_eq!(u.marginal(4.0), 0.25, epsilon = 1e-12);
    }

    #[test]
    fn crra_utility_is_negative_for_gamma_above_one() {
        let u = Crra::new(2.0);
        assert_relative_eq!(u.utility(2.0), -0.5, epsilon = 1e-12);
    }

    #[test]
    fn non_positive_marginal_value_is_a_domain_error() {
        let u = Crra::new(2.0);
        assert!(matches!(u.inverse_marginal(0.0), Err(SolverError::Domain(_))));
        assert!(matches!(u.inverse_marginal(-1.0), Err(SolverError::Domain(_))));
        assert!(matches!(u.inverse_marginal(f64::NAN), Err(SolverError::Domain(_))));
    }
}
