//! Configuration types for the muscle core.
//!
//! - [`MuscleDefaults`] is the parameter store: the two serialized defaults
//!   used to seed the continuous state when nothing else is assigned.
//! - [`EquilibriumConfig`] controls the initial fiber-equilibrium search.

use crate::error::{ensure_finite, ensure_positive};
use crate::{MuscleError, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Activation assumed when none is assigned.
pub const DEFAULT_ACTIVATION: f64 = 0.05;

/// Fiber length (m) assumed when none is assigned.
pub const DEFAULT_FIBER_LENGTH: f64 = 0.1;

/// Serializable defaults for the two continuous states.
///
/// Setters validate and keep the previous value on rejection. Only finiteness
/// and positivity are enforced here; physiological ranges belong to the force
/// law.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MuscleDefaults {
    /// Assumed activation level if none is assigned.
    default_activation: f64,

    /// Assumed fiber length (m), unless otherwise assigned.
    default_fiber_length: f64,
}

impl Default for MuscleDefaults {
    fn default() -> Self {
        Self {
            default_activation: DEFAULT_ACTIVATION,
            default_fiber_length: DEFAULT_FIBER_LENGTH,
        }
    }
}

impl MuscleDefaults {
    /// Create validated defaults.
    pub fn new(default_activation: f64, default_fiber_length: f64) -> Result<Self> {
        let mut defaults = Self::default();
        defaults.set_default_activation(default_activation)?;
        defaults.set_default_fiber_length(default_fiber_length)?;
        Ok(defaults)
    }

    /// Get the default activation.
    #[must_use]
    pub fn default_activation(&self) -> f64 {
        self.default_activation
    }

    /// Set the default activation.
    pub fn set_default_activation(&mut self, activation: f64) -> Result<()> {
        self.default_activation = ensure_positive("default_activation", activation)?;
        Ok(())
    }

    /// Get the default fiber length (m).
    #[must_use]
    pub fn default_fiber_length(&self) -> f64 {
        self.default_fiber_length
    }

    /// Set the default fiber length (m).
    pub fn set_default_fiber_length(&mut self, length: f64) -> Result<()> {
        self.default_fiber_length = ensure_positive("default_fiber_length", length)?;
        Ok(())
    }

    /// Validate values that bypassed the setters (e.g. deserialized ones).
    pub fn validate(&self) -> Result<()> {
        ensure_positive("default_activation", self.default_activation)?;
        ensure_positive("default_fiber_length", self.default_fiber_length)?;
        Ok(())
    }
}

/// Settings for the initial fiber-equilibrium root search.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EquilibriumConfig {
    /// Convergence tolerance, applied both to the fiber velocity residual
    /// (m/s) and to the half-width of the bracketing interval (m).
    pub tolerance: f64,

    /// Largest fiber velocity (m/s) accepted when the bracket has collapsed
    /// below `tolerance` without the residual reaching it. A larger residual
    /// means the velocity jumps across the bracket instead of crossing zero.
    pub residual_tolerance: f64,

    /// Maximum number of bracket refinement iterations.
    pub max_iterations: usize,

    /// Maximum number of outward probe expansions while looking for a sign
    /// change of the fiber velocity.
    pub max_bracket_expansions: usize,

    /// First probe step as a fraction of the starting fiber length.
    pub initial_step_fraction: f64,
}

impl Default for EquilibriumConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-9,
            residual_tolerance: 1e-6,
            max_iterations: 100,
            max_bracket_expansions: 60,
            initial_step_fraction: 0.05,
        }
    }
}

impl EquilibriumConfig {
    /// Create a configuration for quick, coarse solves.
    #[must_use]
    pub fn fast() -> Self {
        Self {
            tolerance: 1e-6,
            residual_tolerance: 1e-4,
            max_iterations: 30,
            ..Default::default()
        }
    }

    /// Set the convergence tolerance.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the residual velocity accepted on bracket collapse.
    #[must_use]
    pub fn with_residual_tolerance(mut self, residual_tolerance: f64) -> Self {
        self.residual_tolerance = residual_tolerance;
        self
    }

    /// Set the iteration cap.
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the bracketing expansion cap.
    #[must_use]
    pub fn with_max_bracket_expansions(mut self, expansions: usize) -> Self {
        self.max_bracket_expansions = expansions;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        ensure_positive("tolerance", self.tolerance)?;
        ensure_positive("residual_tolerance", self.residual_tolerance)?;
        ensure_finite("initial_step_fraction", self.initial_step_fraction)?;

        if self.max_iterations == 0 {
            return Err(MuscleError::invalid_argument(
                "max_iterations",
                0.0,
                "must be at least 1",
            ));
        }

        if self.max_bracket_expansions == 0 {
            return Err(MuscleError::invalid_argument(
                "max_bracket_expansions",
                0.0,
                "must be at least 1",
            ));
        }

        if self.initial_step_fraction <= 0.0 || self.initial_step_fraction >= 1.0 {
            return Err(MuscleError::invalid_argument(
                "initial_step_fraction",
                self.initial_step_fraction,
                "must be in (0, 1)",
            ));
        }

        Ok(())
    }
}
