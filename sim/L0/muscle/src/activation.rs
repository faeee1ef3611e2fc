//! Muscle activation dynamics.
//!
//! Activation dynamics model the delay and filtering between neural excitation
//! (the control signal) and muscle activation (the actual contractile state).
//!
//! # Model
//!
//! ```text
//! da/dt = (u - a) / τ(u, a)
//!
//! where:
//!   a = activation level (0 to 1)
//!   u = neural excitation (0 to 1)
//!   τ = time constant (depends on whether activating or deactivating)
//! ```
//!
//! Activation is faster than deactivation:
//! - τ_act ≈ 10-20 ms (activation)
//! - τ_deact ≈ 40-80 ms (deactivation)

use crate::error::ensure_positive;
use crate::{MuscleError, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// First-order activation dynamics with asymmetric time constants.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ActivationDynamics {
    /// Time constant for activation (rising), in seconds.
    /// Typical range: 0.01 - 0.02 s (10-20 ms).
    pub tau_activation: f64,

    /// Time constant for deactivation (falling), in seconds.
    /// Typical range: 0.04 - 0.08 s (40-80 ms).
    pub tau_deactivation: f64,

    /// Minimum activation level to prevent numerical issues.
    /// Typical value: 0.01 (1% baseline activation).
    pub min_activation: f64,
}

impl Default for ActivationDynamics {
    fn default() -> Self {
        Self {
            tau_activation: 0.015,   // 15 ms
            tau_deactivation: 0.060, // 60 ms
            min_activation: 0.01,    // 1% baseline
        }
    }
}

impl ActivationDynamics {
    /// Create activation dynamics with custom time constants.
    ///
    /// Values are taken as given; [`validate`](Self::validate) rejects
    /// non-positive ones.
    #[must_use]
    pub fn new(tau_act: f64, tau_deact: f64) -> Self {
        Self {
            tau_activation: tau_act,
            tau_deactivation: tau_deact,
            ..Default::default()
        }
    }

    /// Fast-twitch (Type II) fibers.
    #[must_use]
    pub fn fast_twitch() -> Self {
        Self::new(0.010, 0.040)
    }

    /// Slow-twitch (Type I) fibers.
    #[must_use]
    pub fn slow_twitch() -> Self {
        Self::new(0.020, 0.080)
    }

    /// Effective time constant: activating uses `tau_activation`,
    /// deactivating uses `tau_deactivation`.
    #[must_use]
    pub fn time_constant(&self, excitation: f64, activation: f64) -> f64 {
        if excitation > activation {
            self.tau_activation
        } else {
            self.tau_deactivation
        }
    }

    /// Compute the activation derivative (1/s).
    ///
    /// Excitation is clamped to [0, 1] and activation to
    /// [`min_activation`](Self::min_activation), 1].
    pub fn derivative(&self, excitation: f64, activation: f64) -> Result<f64> {
        if !activation.is_finite() || !excitation.is_finite() {
            return Err(MuscleError::numerical(format!(
                "non-finite activation input (u = {excitation}, a = {activation})"
            )));
        }

        let u = excitation.clamp(0.0, 1.0);
        let a = activation.clamp(self.min_activation, 1.0);
        let tau = self.time_constant(u, a);

        if tau <= f64::EPSILON {
            return Err(MuscleError::numerical(format!(
                "activation time constant {tau} is too small"
            )));
        }

        Ok((u - a) / tau)
    }

    /// Validate the time constants.
    pub fn validate(&self) -> Result<()> {
        ensure_positive("tau_activation", self.tau_activation)?;
        ensure_positive("tau_deactivation", self.tau_deactivation)?;
        if !(0.0..1.0).contains(&self.min_activation) {
            return Err(MuscleError::invalid_argument(
                "min_activation",
                self.min_activation,
                "must be in [0, 1)",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_activation_dynamics_default() {
        let dynamics = ActivationDynamics::default();

        assert!(dynamics.tau_activation > 0.0);
        assert!(dynamics.tau_deactivation > dynamics.tau_activation);
        assert!(dynamics.validate().is_ok());
    }

    #[test]
    fn test_asymmetric_time_constants() {
        let dynamics = ActivationDynamics::default();

        let tau_up = dynamics.time_constant(1.0, 0.5);
        assert_relative_eq!(tau_up, dynamics.tau_activation, epsilon = 1e-10);

        let tau_down = dynamics.time_constant(0.0, 0.5);
        assert_relative_eq!(tau_down, dynamics.tau_deactivation, epsilon = 1e-10);
    }

    #[test]
    fn test_derivative_sign() {
        let dynamics = ActivationDynamics::default();

        assert!(dynamics.derivative(1.0, 0.2).unwrap() > 0.0);
        assert!(dynamics.derivative(0.0, 0.5).unwrap() < 0.0);
        assert_relative_eq!(dynamics.derivative(0.4, 0.4).unwrap(), 0.0);
    }

    #[test]
    fn test_derivative_value() {
        let dynamics = ActivationDynamics::new(0.01, 0.04);

        // (1.0 - 0.5) / 0.01
        assert_relative_eq!(dynamics.derivative(1.0, 0.5).unwrap(), 50.0, epsilon = 1e-9);
        // (0.0 - 0.5) / 0.04
        assert_relative_eq!(
            dynamics.derivative(0.0, 0.5).unwrap(),
            -12.5,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_non_finite_input_is_numerical_error() {
        let dynamics = ActivationDynamics::default();
        let err = dynamics.derivative(0.5, f64::NAN).unwrap_err();
        assert!(err.is_numerical());
    }

    #[test]
    fn test_fast_twitch_is_faster() {
        let fast = ActivationDynamics::fast_twitch();
        let slow = ActivationDynamics::slow_twitch();

        assert!(fast.tau_activation < slow.tau_activation);
        assert!(fast.tau_deactivation < slow.tau_deactivation);
    }

    #[test]
    fn test_validate_rejects_bad_constants() {
        let dynamics = ActivationDynamics {
            tau_activation: 0.0,
            ..Default::default()
        };
        assert!(dynamics.validate().is_err());

        let dynamics = ActivationDynamics {
            min_activation: 1.0,
            ..Default::default()
        };
        assert!(dynamics.validate().is_err());

        assert!(ActivationDynamics::new(-0.01, 0.04).validate().is_err());
    }
}
