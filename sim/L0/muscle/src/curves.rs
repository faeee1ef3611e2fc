//! Force-length, force-velocity and tendon curves for the Hill fiber law.
//!
//! All curves work in normalized units: lengths relative to optimal fiber
//! length (or tendon slack length), velocities relative to the maximum
//! shortening velocity, forces relative to the maximum isometric force.
//!
//! The force-velocity curve is invertible over its whole range so the fiber
//! velocity can be recovered from a force-balance demand.
//!
//! # References
//!
//! - Hill, A.V. (1938). The heat of shortening and dynamic constants of muscle.
//! - Zajac, F.E. (1989). Muscle and tendon: properties, models, scaling, and
//!   application to biomechanics and motor control.

use crate::error::ensure_positive;
use crate::{MuscleError, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Active force-length curve.
///
/// Asymmetric Gaussian centered at optimal fiber length. It never reaches
/// zero, so the force-velocity demand stays defined across the whole fiber
/// length domain.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ActiveForceLengthCurve {
    /// Width of the ascending limb (normalized length units).
    pub width_ascending: f64,

    /// Width of the descending limb (normalized length units).
    pub width_descending: f64,

    /// Shortest normalized fiber length considered physical.
    pub min_normalized_length: f64,

    /// Longest normalized fiber length considered physical.
    pub max_normalized_length: f64,
}

impl Default for ActiveForceLengthCurve {
    fn default() -> Self {
        Self {
            width_ascending: 0.45,
            width_descending: 0.56,
            min_normalized_length: 0.4,
            max_normalized_length: 1.8,
        }
    }
}

impl ActiveForceLengthCurve {
    /// Active force multiplier, 1 at optimal length.
    #[must_use]
    pub fn evaluate(&self, normalized_length: f64) -> f64 {
        let l = normalized_length;
        let width = if l < 1.0 {
            self.width_ascending
        } else {
            self.width_descending
        };

        (-((l - 1.0) / width).powi(2)).exp()
    }
}

/// Passive force-length curve.
///
/// Elastic resistance of passive tissue (titin, collagen) beyond the slack
/// length, normalized so the multiplier reaches `scale` at 1.5 optimal
/// lengths.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PassiveForceLengthCurve {
    /// Normalized length at which passive force begins.
    pub slack_length: f64,

    /// Exponential shape factor.
    pub shape_factor: f64,

    /// Scale factor relative to max isometric force.
    pub scale: f64,
}

impl Default for PassiveForceLengthCurve {
    fn default() -> Self {
        Self {
            slack_length: 1.0,
            shape_factor: 4.0,
            scale: 1.0,
        }
    }
}

impl PassiveForceLengthCurve {
    /// Passive force multiplier.
    #[must_use]
    pub fn evaluate(&self, normalized_length: f64) -> f64 {
        let l = normalized_length;
        if l <= self.slack_length {
            return 0.0;
        }

        let k = self.shape_factor;
        let strain = (l - self.slack_length) / (1.5 - self.slack_length);
        let fp = self.scale * ((k * strain).exp() - 1.0) / (k.exp() - 1.0);

        fp.max(0.0)
    }
}

/// Hill force-velocity curve with an eccentric branch.
///
/// ```text
/// concentric (-1 < v < 0):  f = (1 + v) / (1 - v / a)
/// eccentric  (v > 0):       f = 1 + (f_ecc - 1) · v / (v + b)
/// ```
///
/// `v` is normalized by the maximum shortening velocity. The curve is
/// continuous and strictly increasing, so [`inverse`](Self::inverse) is well
/// defined on `[0, f_ecc)`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ForceVelocityCurve {
    /// Curvature `a` of the concentric branch. Typical: 0.25.
    pub curvature_concentric: f64,

    /// Asymptotic eccentric force multiplier. Typical: 1.4-1.8.
    pub eccentric_force_max: f64,

    /// Curvature `b` of the eccentric branch.
    pub curvature_eccentric: f64,

    /// Largest normalized lengthening velocity returned by the inverse.
    pub max_normalized_lengthening: f64,
}

impl Default for ForceVelocityCurve {
    fn default() -> Self {
        Self {
            curvature_concentric: 0.25,
            eccentric_force_max: 1.5,
            curvature_eccentric: 0.25,
            max_normalized_lengthening: 1.0,
        }
    }
}

impl ForceVelocityCurve {
    /// Force multiplier at a normalized fiber velocity.
    #[must_use]
    pub fn evaluate(&self, normalized_velocity: f64) -> f64 {
        let v = normalized_velocity;

        if v <= -1.0 {
            0.0
        } else if v < 0.0 {
            (1.0 + v) / (1.0 - v / self.curvature_concentric)
        } else {
            let b = self.curvature_eccentric;
            1.0 + (self.eccentric_force_max - 1.0) * v / (v + b)
        }
    }

    /// Normalized velocity producing a force multiplier.
    ///
    /// Demands at or below zero map to maximum shortening (-1). Demands at or
    /// above the eccentric asymptote saturate at
    /// [`max_normalized_lengthening`](Self::max_normalized_lengthening).
    #[must_use]
    pub fn inverse(&self, force_multiplier: f64) -> f64 {
        let f = force_multiplier;

        if f <= 0.0 {
            return -1.0;
        }

        if f < 1.0 {
            let a = self.curvature_concentric;
            return a * (f - 1.0) / (a + f);
        }

        let f_ecc = self.eccentric_force_max;
        if f >= f_ecc {
            return self.max_normalized_lengthening;
        }

        let b = self.curvature_eccentric;
        (b * (f - 1.0) / (f_ecc - f)).min(self.max_normalized_lengthening)
    }
}

/// Quadratic tendon force-strain curve.
///
/// ```text
/// f_t = (ε / ε₀)²   for ε > 0
/// ```
///
/// where `ε = (l_t - l_s) / l_s` and `ε₀` is the strain at which the tendon
/// carries the maximum isometric force.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TendonForceLengthCurve {
    /// Tendon strain at maximum isometric force. Typical: 0.033.
    pub strain_at_max_isometric: f64,
}

impl Default for TendonForceLengthCurve {
    fn default() -> Self {
        Self {
            strain_at_max_isometric: 0.033,
        }
    }
}

impl TendonForceLengthCurve {
    /// Create a tendon curve.
    pub fn new(strain_at_max_isometric: f64) -> Result<Self> {
        Ok(Self {
            strain_at_max_isometric: ensure_positive(
                "strain_at_max_isometric",
                strain_at_max_isometric,
            )?,
        })
    }

    /// Tendon force multiplier at a tendon length normalized by slack length.
    #[must_use]
    pub fn evaluate(&self, normalized_length: f64) -> f64 {
        let strain = normalized_length - 1.0;
        if strain <= 0.0 {
            return 0.0;
        }

        (strain / self.strain_at_max_isometric).powi(2)
    }
}

/// Curve set used by [`HillFiberLaw`](crate::hill::HillFiberLaw).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MuscleForceCurves {
    /// Active force-length relationship.
    pub active_fl: ActiveForceLengthCurve,

    /// Passive force-length relationship.
    pub passive_fl: PassiveForceLengthCurve,

    /// Force-velocity relationship.
    pub fv: ForceVelocityCurve,

    /// Tendon force-strain relationship.
    pub tendon: TendonForceLengthCurve,
}

impl MuscleForceCurves {
    /// Total fiber force multiplier (active + passive).
    #[must_use]
    pub fn evaluate(
        &self,
        activation: f64,
        normalized_length: f64,
        normalized_velocity: f64,
    ) -> f64 {
        let active = activation
            * self.active_fl.evaluate(normalized_length)
            * self.fv.evaluate(normalized_velocity);

        active + self.passive_fl.evaluate(normalized_length)
    }

    /// Check the parameters are usable.
    pub fn validate(&self) -> Result<()> {
        ensure_positive("width_ascending", self.active_fl.width_ascending)?;
        ensure_positive("width_descending", self.active_fl.width_descending)?;
        ensure_positive("curvature_concentric", self.fv.curvature_concentric)?;
        ensure_positive("curvature_eccentric", self.fv.curvature_eccentric)?;
        ensure_positive(
            "strain_at_max_isometric",
            self.tendon.strain_at_max_isometric,
        )?;

        if self.fv.eccentric_force_max <= 1.0 {
            return Err(MuscleError::invalid_argument(
                "eccentric_force_max",
                self.fv.eccentric_force_max,
                "must exceed 1",
            ));
        }

        let (lo, hi) = (
            self.active_fl.min_normalized_length,
            self.active_fl.max_normalized_length,
        );
        if !(lo > 0.0 && lo < 1.0 && hi > 1.0 && hi.is_finite()) {
            return Err(MuscleError::invalid_argument(
                "min_normalized_length",
                lo,
                "fiber length domain must straddle optimal length",
            ));
        }

        Ok(())
    }
}
