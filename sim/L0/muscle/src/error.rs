//! Error types for muscle state and equilibrium operations.

use thiserror::Error;

/// Errors that can occur while configuring, registering or solving a muscle.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MuscleError {
    /// A parameter value was rejected; the previous value is kept.
    #[error("invalid argument: {parameter} = {value} ({reason})")]
    InvalidArgument {
        /// Name of the rejected parameter.
        parameter: &'static str,
        /// The rejected value.
        value: f64,
        /// Why the value was rejected.
        reason: &'static str,
    },

    /// Lifecycle misuse, such as registering the same muscle twice.
    #[error("invalid state: {reason}")]
    InvalidState {
        /// Description of the misuse.
        reason: String,
    },

    /// Unknown state variable name or handle.
    #[error("state variable not found: {name}")]
    NotFound {
        /// The name (or handle description) that was requested.
        name: String,
    },

    /// No sign change of the fiber velocity could be bracketed inside the
    /// valid fiber-length domain.
    #[error(
        "fiber equilibrium not found in [{min_length}, {max_length}] after {probes} probes"
    )]
    EquilibriumNotFound {
        /// Shortest fiber length probed (m).
        min_length: f64,
        /// Longest fiber length probed (m).
        max_length: f64,
        /// Number of function evaluations spent bracketing.
        probes: usize,
    },

    /// The root was bracketed but did not converge within the iteration cap.
    #[error(
        "fiber equilibrium did not converge after {iterations} iterations \
         (best length {best_length}, residual velocity {residual})"
    )]
    ConvergenceFailure {
        /// Iterations spent refining the bracket.
        iterations: usize,
        /// Best fiber length found (m).
        best_length: f64,
        /// Fiber velocity at the best length (m/s).
        residual: f64,
    },

    /// Numerical failure raised by a force law or path model.
    #[error("numerical error: {reason}")]
    NumericalError {
        /// Description of what went wrong.
        reason: String,
    },
}

impl MuscleError {
    /// Create an invalid argument error.
    #[must_use]
    pub fn invalid_argument(parameter: &'static str, value: f64, reason: &'static str) -> Self {
        Self::InvalidArgument {
            parameter,
            value,
            reason,
        }
    }

    /// Create an invalid state error.
    #[must_use]
    pub fn invalid_state(reason: impl Into<String>) -> Self {
        Self::InvalidState {
            reason: reason.into(),
        }
    }

    /// Create a not-found error.
    #[must_use]
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Create a numerical error.
    #[must_use]
    pub fn numerical(reason: impl Into<String>) -> Self {
        Self::NumericalError {
            reason: reason.into(),
        }
    }

    /// Check if this is an equilibrium solve failure.
    ///
    /// Both kinds can be recovered from by picking another starting length
    /// or by accepting the default fiber length.
    #[must_use]
    pub fn is_equilibrium_failure(&self) -> bool {
        matches!(
            self,
            Self::EquilibriumNotFound { .. } | Self::ConvergenceFailure { .. }
        )
    }

    /// Check if the caller can recover from this error without rebuilding
    /// the model.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::InvalidState { .. } | Self::NumericalError { .. })
    }

    /// Check if this is a numerical error propagated from a collaborator.
    #[must_use]
    pub fn is_numerical(&self) -> bool {
        matches!(self, Self::NumericalError { .. })
    }
}

/// Reject non-finite values.
pub(crate) fn ensure_finite(parameter: &'static str, value: f64) -> crate::Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(MuscleError::invalid_argument(
            parameter,
            value,
            "must be finite",
        ))
    }
}

/// Reject non-finite and non-positive values.
pub(crate) fn ensure_positive(parameter: &'static str, value: f64) -> crate::Result<f64> {
    let value = ensure_finite(parameter, value)?;
    if value > 0.0 {
        Ok(value)
    } else {
        Err(MuscleError::invalid_argument(
            parameter,
            value,
            "must be positive",
        ))
    }
}
