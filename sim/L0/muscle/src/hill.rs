//! Compliant-tendon Hill fiber law.
//!
//! A concrete [`FiberForceLaw`] for [`FiberLengthMuscle`](crate::FiberLengthMuscle):
//!
//! - Activation dynamics (neural command to muscle activation)
//! - Force-length relationship (sarcomere mechanics)
//! - Force-velocity relationship, inverted to recover fiber velocity
//! - Pennation angle effects (constant-width model)
//! - Series elastic tendon
//!
//! # Architecture
//!
//! ```text
//!                    ┌────────────────────────────────────┐
//!    Neural         │         Muscle-Tendon Unit         │
//!   Excitation ────►│ ┌──────────────┐   ┌─────────────┐ │──────► Force
//!       u           │ │   Muscle     │   │   Tendon    │ │
//!                   │ │ (Contractile │───│  (Elastic   │ │
//!                   │ │   Element)   │   │   Element)  │ │
//!                   │ └──────────────┘   └─────────────┘ │
//!                   └────────────────────────────────────┘
//! ```
//!
//! # Force balance
//!
//! Given activation `a`, fiber length `l_m` and path length `L`:
//!
//! ```text
//! l_t   = L - l_m cos α
//! F_t   = F₀ f_t(l_t / l_s)
//! f_v   = (F_t / cos α - F₀ f_p(l_m)) / (a F₀ f_l(l_m))
//! v_m   = f_v⁻¹ · v_max · l_opt
//! ```
//!
//! # References
//!
//! - Zajac, F.E. (1989). Muscle and tendon: properties, models, scaling.
//! - Thelen, D.G. (2003). Adjustment of muscle mechanics model parameters.
//! - Millard, M. et al. (2013). Flexing computational muscle: modeling and
//!   simulation of musculotendon dynamics.

use crate::activation::ActivationDynamics;
use crate::curves::MuscleForceCurves;
use crate::error::{ensure_finite, ensure_positive};
use crate::law::{FiberForceLaw, FiberKinematics};
use crate::state::State;
use crate::{MuscleError, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Smallest cosine of the pennation angle used for force projection.
const MIN_COS_PENNATION: f64 = 0.1;

/// Configuration parameters for a Hill-type fiber law.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HillFiberConfig {
    /// Maximum isometric force the muscle can produce (N).
    pub max_isometric_force: f64,

    /// Optimal fiber length where maximum force is generated (m).
    pub optimal_fiber_length: f64,

    /// Tendon slack length - length at which tendon begins to bear load (m).
    pub tendon_slack_length: f64,

    /// Pennation angle at optimal fiber length (radians).
    pub pennation_angle_optimal: f64,

    /// Maximum contraction velocity (optimal lengths per second).
    pub max_contraction_velocity: f64,

    /// Activation dynamics parameters.
    pub activation_dynamics: ActivationDynamics,

    /// Force curve parameters.
    pub force_curves: MuscleForceCurves,
}

impl Default for HillFiberConfig {
    fn default() -> Self {
        Self {
            max_isometric_force: 1000.0,
            optimal_fiber_length: 0.10,
            tendon_slack_length: 0.20,
            pennation_angle_optimal: 0.0,
            max_contraction_velocity: 10.0,
            activation_dynamics: ActivationDynamics::default(),
            force_curves: MuscleForceCurves::default(),
        }
    }
}

impl HillFiberConfig {
    /// Biceps-like muscle.
    #[must_use]
    pub fn biceps() -> Self {
        Self {
            max_isometric_force: 700.0,
            optimal_fiber_length: 0.116,
            tendon_slack_length: 0.272,
            ..Default::default()
        }
    }

    /// Quadriceps-like muscle.
    #[must_use]
    pub fn quadriceps() -> Self {
        Self {
            max_isometric_force: 7000.0,
            optimal_fiber_length: 0.084,
            tendon_slack_length: 0.346,
            pennation_angle_optimal: 0.087, // ~5 degrees
            max_contraction_velocity: 8.0,
            ..Default::default()
        }
    }

    /// Gastrocnemius-like muscle.
    #[must_use]
    pub fn gastrocnemius() -> Self {
        Self {
            max_isometric_force: 1500.0,
            optimal_fiber_length: 0.055,
            tendon_slack_length: 0.400, // Achilles
            pennation_angle_optimal: 0.297, // ~17 degrees
            max_contraction_velocity: 12.0,
            activation_dynamics: ActivationDynamics::fast_twitch(),
            ..Default::default()
        }
    }

    /// Soleus-like muscle.
    #[must_use]
    pub fn soleus() -> Self {
        Self {
            max_isometric_force: 3500.0,
            optimal_fiber_length: 0.030,
            tendon_slack_length: 0.268,
            pennation_angle_optimal: 0.436, // ~25 degrees
            max_contraction_velocity: 6.0,
            activation_dynamics: ActivationDynamics::slow_twitch(),
            ..Default::default()
        }
    }

    /// Set custom force curves.
    #[must_use]
    pub fn with_force_curves(mut self, curves: MuscleForceCurves) -> Self {
        self.force_curves = curves;
        self
    }

    /// Set custom activation dynamics.
    #[must_use]
    pub fn with_activation_dynamics(mut self, dynamics: ActivationDynamics) -> Self {
        self.activation_dynamics = dynamics;
        self
    }

    /// Path length with the tendon at slack and the fiber at optimal length.
    #[must_use]
    pub fn reference_path_length(&self) -> f64 {
        self.tendon_slack_length
            + self.optimal_fiber_length * self.pennation_angle_optimal.cos()
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        ensure_positive("max_isometric_force", self.max_isometric_force)?;
        ensure_positive("optimal_fiber_length", self.optimal_fiber_length)?;
        ensure_positive("tendon_slack_length", self.tendon_slack_length)?;
        ensure_positive("max_contraction_velocity", self.max_contraction_velocity)?;
        ensure_finite("pennation_angle_optimal", self.pennation_angle_optimal)?;

        if !(0.0..std::f64::consts::FRAC_PI_2).contains(&self.pennation_angle_optimal) {
            return Err(MuscleError::invalid_argument(
                "pennation_angle_optimal",
                self.pennation_angle_optimal,
                "must be in [0, pi/2)",
            ));
        }

        self.activation_dynamics.validate()?;
        self.force_curves.validate()
    }
}

/// Compliant-tendon Hill fiber law driven by a neural excitation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HillFiberLaw {
    config: HillFiberConfig,
    excitation: f64,
}

impl HillFiberLaw {
    /// Create a law from a validated configuration.
    pub fn new(config: HillFiberConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            excitation: 0.0,
        })
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &HillFiberConfig {
        &self.config
    }

    /// Get the current neural excitation.
    #[must_use]
    pub fn excitation(&self) -> f64 {
        self.excitation
    }

    /// Set the neural excitation command, clamped to [0, 1].
    pub fn set_excitation(&mut self, excitation: f64) -> Result<()> {
        self.excitation = ensure_finite("excitation", excitation)?.clamp(0.0, 1.0);
        Ok(())
    }

    /// Pennation angle (radians) at a fiber length, constant-width model.
    #[must_use]
    pub fn pennation_angle(&self, fiber_length: f64) -> f64 {
        let alpha0 = self.config.pennation_angle_optimal;
        if alpha0.abs() < 1e-6 {
            return 0.0;
        }

        let width = self.config.optimal_fiber_length * alpha0.sin();
        (width / fiber_length).clamp(-1.0, 1.0).asin()
    }

    fn cos_pennation(&self, fiber_length: f64) -> f64 {
        self.pennation_angle(fiber_length)
            .cos()
            .max(MIN_COS_PENNATION)
    }

    /// Full breakdown of fiber and tendon forces at the given kinematics,
    /// assuming the force-balance fiber velocity.
    pub fn diagnostics(&self, kinematics: &FiberKinematics) -> Result<FiberDiagnostics> {
        let cfg = &self.config;
        let curves = &cfg.force_curves;
        let lm = checked_fiber_length(kinematics.fiber_length)?;
        let l_norm = lm / cfg.optimal_fiber_length;
        let cos_alpha = self.cos_pennation(lm);

        let tendon_length = kinematics.path_length - lm * cos_alpha;
        let tendon_force =
            cfg.max_isometric_force * curves.tendon.evaluate(tendon_length / cfg.tendon_slack_length);

        let velocity = self.fiber_velocity(kinematics)?;
        let v_norm = velocity / (cfg.optimal_fiber_length * cfg.max_contraction_velocity);

        let fl_active = curves.active_fl.evaluate(l_norm);
        let fl_passive = curves.passive_fl.evaluate(l_norm);
        let fv = curves.fv.evaluate(v_norm);

        Ok(FiberDiagnostics {
            activation: kinematics.activation,
            normalized_fiber_length: l_norm,
            normalized_fiber_velocity: v_norm,
            pennation_angle: self.pennation_angle(lm),
            tendon_length,
            active_force_length_multiplier: fl_active,
            passive_force_length_multiplier: fl_passive,
            force_velocity_multiplier: fv,
            fiber_force: cfg.max_isometric_force
                * curves.evaluate(self.clamped_activation(kinematics.activation), l_norm, v_norm),
            tendon_force,
        })
    }

    fn clamped_activation(&self, activation: f64) -> f64 {
        activation.clamp(self.config.activation_dynamics.min_activation, 1.0)
    }
}

fn checked_fiber_length(fiber_length: f64) -> Result<f64> {
    if fiber_length.is_finite() && fiber_length > 0.0 {
        Ok(fiber_length)
    } else {
        Err(MuscleError::numerical(format!(
            "fiber length {fiber_length} is not positive and finite"
        )))
    }
}

impl FiberForceLaw for HillFiberLaw {
    fn activation_rate(&self, _state: &State, activation: f64) -> Result<f64> {
        self.config
            .activation_dynamics
            .derivative(self.excitation, activation)
    }

    fn fiber_velocity(&self, kinematics: &FiberKinematics) -> Result<f64> {
        let cfg = &self.config;
        let curves = &cfg.force_curves;
        let f0 = cfg.max_isometric_force;

        let lm = checked_fiber_length(kinematics.fiber_length)?;
        if !kinematics.activation.is_finite() || !kinematics.path_length.is_finite() {
            return Err(MuscleError::numerical(format!(
                "non-finite kinematics (a = {}, L = {})",
                kinematics.activation, kinematics.path_length
            )));
        }

        let l_norm = lm / cfg.optimal_fiber_length;
        let cos_alpha = self.cos_pennation(lm);

        let tendon_length = kinematics.path_length - lm * cos_alpha;
        let tendon_force = f0 * curves.tendon.evaluate(tendon_length / cfg.tendon_slack_length);
        let passive_force = f0 * curves.passive_fl.evaluate(l_norm);

        let a = self.clamped_activation(kinematics.activation);
        let active_capacity = a * f0 * curves.active_fl.evaluate(l_norm);
        if active_capacity <= f0 * 1e-12 {
            return Err(MuscleError::numerical(format!(
                "active force capacity vanishes at fiber length {lm}"
            )));
        }

        let demand = (tendon_force / cos_alpha - passive_force) / active_capacity;
        let v_norm = curves.fv.inverse(demand);

        Ok(v_norm * cfg.max_contraction_velocity * cfg.optimal_fiber_length)
    }

    fn isometric_force(&self, kinematics: &FiberKinematics) -> Result<f64> {
        let cfg = &self.config;
        let curves = &cfg.force_curves;

        let lm = checked_fiber_length(kinematics.fiber_length)?;
        let a = ensure_finite("activation", kinematics.activation)?;
        let l_norm = lm / cfg.optimal_fiber_length;

        let fiber_force = cfg.max_isometric_force * curves.evaluate(a, l_norm, 0.0);
        Ok(fiber_force * self.cos_pennation(lm))
    }

    fn fiber_length_bounds(&self) -> (f64, f64) {
        let l_opt = self.config.optimal_fiber_length;
        let fl = &self.config.force_curves.active_fl;
        (
            fl.min_normalized_length * l_opt,
            fl.max_normalized_length * l_opt,
        )
    }
}

/// Breakdown of the Hill law at a given fiber state.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FiberDiagnostics {
    /// Activation level the breakdown was computed for.
    pub activation: f64,

    /// Normalized fiber length (L / L_opt).
    pub normalized_fiber_length: f64,

    /// Normalized fiber velocity (v / v_max).
    pub normalized_fiber_velocity: f64,

    /// Pennation angle (radians).
    pub pennation_angle: f64,

    /// Tendon length (m).
    pub tendon_length: f64,

    /// Active force-length multiplier.
    pub active_force_length_multiplier: f64,

    /// Passive force-length multiplier.
    pub passive_force_length_multiplier: f64,

    /// Force-velocity multiplier.
    pub force_velocity_multiplier: f64,

    /// Fiber force along the fiber (N).
    pub fiber_force: f64,

    /// Tendon force (N).
    pub tendon_force: f64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::curves::TendonForceLengthCurve;
    use crate::state::StateSystem;
    use approx::assert_relative_eq;

    fn kinematics(activation: f64, fiber_length: f64, path_length: f64) -> FiberKinematics {
        FiberKinematics {
            activation,
            fiber_length,
            path_length,
            path_lengthening_speed: 0.0,
        }
    }

    #[test]
    fn test_presets_validate() {
        for config in [
            HillFiberConfig::default(),
            HillFiberConfig::biceps(),
            HillFiberConfig::quadriceps(),
            HillFiberConfig::gastrocnemius(),
            HillFiberConfig::soleus(),
        ] {
            assert!(config.validate().is_ok());
            assert!(HillFiberLaw::new(config).is_ok());
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = HillFiberConfig {
            optimal_fiber_length: 0.0,
            ..HillFiberConfig::default()
        };
        assert!(HillFiberLaw::new(config).is_err());

        let config = HillFiberConfig {
            pennation_angle_optimal: 2.0,
            ..HillFiberConfig::default()
        };
        assert!(HillFiberLaw::new(config).is_err());
    }

    #[test]
    fn test_activation_rate_follows_excitation() {
        let state = StateSystem::new().make_state();
        let mut law = HillFiberLaw::new(HillFiberConfig::biceps()).unwrap();

        law.set_excitation(1.0).unwrap();
        assert!(law.activation_rate(&state, 0.2).unwrap() > 0.0);

        law.set_excitation(0.0).unwrap();
        assert!(law.activation_rate(&state, 0.2).unwrap() < 0.0);

        law.set_excitation(3.0).unwrap();
        assert_eq!(law.excitation(), 1.0);
        assert!(law.set_excitation(f64::NAN).is_err());
    }

    #[test]
    fn test_stiffer_tendon_curve_changes_fiber_velocity() {
        let biceps = HillFiberConfig::biceps();
        let path = biceps.reference_path_length();
        let stiff_curves = MuscleForceCurves {
            tendon: TendonForceLengthCurve::new(0.02).unwrap(),
            ..MuscleForceCurves::default()
        };

        let compliant = HillFiberLaw::new(biceps.clone()).unwrap();
        let stiff = HillFiberLaw::new(biceps.clone().with_force_curves(stiff_curves)).unwrap();

        // Same fiber length: the compliant tendon lets the fiber shorten,
        // the stiff one pulls it longer.
        let kin = kinematics(0.5, 0.112, path);
        assert!(compliant.fiber_velocity(&kin).unwrap() < 0.0);
        assert!(stiff.fiber_velocity(&kin).unwrap() > 0.0);

        let mut invalid = MuscleForceCurves::default();
        invalid.fv.eccentric_force_max = 1.0;
        assert!(HillFiberLaw::new(biceps.with_force_curves(invalid)).is_err());
    }

    #[test]
    fn test_custom_activation_dynamics() {
        let state = StateSystem::new().make_state();
        let biceps = HillFiberConfig::biceps();

        let mut baseline = HillFiberLaw::new(biceps.clone()).unwrap();
        let mut fast = HillFiberLaw::new(
            biceps
                .clone()
                .with_activation_dynamics(ActivationDynamics::fast_twitch()),
        )
        .unwrap();
        baseline.set_excitation(1.0).unwrap();
        fast.set_excitation(1.0).unwrap();

        assert!(
            fast.activation_rate(&state, 0.2).unwrap()
                > baseline.activation_rate(&state, 0.2).unwrap()
        );

        let broken = biceps.with_activation_dynamics(ActivationDynamics::new(0.0, 0.04));
        assert!(HillFiberLaw::new(broken).is_err());
    }

    #[test]
    fn test_slack_tendon_means_shortening() {
        let law = HillFiberLaw::new(HillFiberConfig::biceps()).unwrap();
        let cfg = law.config().clone();

        // Tendon exactly at slack: no tendon force, fiber shortens at v_max.
        let kin = kinematics(0.5, cfg.optimal_fiber_length, cfg.reference_path_length());
        let v = law.fiber_velocity(&kin).unwrap();
        assert_relative_eq!(
            v,
            -cfg.max_contraction_velocity * cfg.optimal_fiber_length,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_stretched_tendon_means_lengthening() {
        let law = HillFiberLaw::new(HillFiberConfig::biceps()).unwrap();
        let cfg = law.config().clone();

        let short_fiber = 0.6 * cfg.optimal_fiber_length;
        let kin = kinematics(0.5, short_fiber, cfg.reference_path_length());
        assert!(law.fiber_velocity(&kin).unwrap() > 0.0);
    }

    #[test]
    fn test_velocity_decreases_with_fiber_length() {
        let law = HillFiberLaw::new(HillFiberConfig::biceps()).unwrap();
        let path = law.config().reference_path_length();

        // Both lengths sit near the balance point, away from saturation.
        let v1 = law.fiber_velocity(&kinematics(0.5, 0.110, path)).unwrap();
        let v2 = law.fiber_velocity(&kinematics(0.5, 0.112, path)).unwrap();
        assert!(v1 > v2);
    }

    #[test]
    fn test_isometric_force_at_optimal_length() {
        let law = HillFiberLaw::new(HillFiberConfig::biceps()).unwrap();
        let cfg = law.config().clone();

        let kin = kinematics(1.0, cfg.optimal_fiber_length, 0.0);
        assert_relative_eq!(
            law.isometric_force(&kin).unwrap(),
            cfg.max_isometric_force,
            epsilon = 1e-9
        );

        let half = kinematics(0.5, cfg.optimal_fiber_length, 0.0);
        assert_relative_eq!(
            law.isometric_force(&half).unwrap(),
            0.5 * cfg.max_isometric_force,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_pennation_increases_as_fiber_shortens() {
        let law = HillFiberLaw::new(HillFiberConfig::soleus()).unwrap();
        let l_opt = law.config().optimal_fiber_length;

        let at_optimal = law.pennation_angle(l_opt);
        assert_relative_eq!(at_optimal, law.config().pennation_angle_optimal, epsilon = 1e-12);
        assert!(law.pennation_angle(0.8 * l_opt) > at_optimal);
    }

    #[test]
    fn test_non_positive_fiber_length_is_numerical_error() {
        let law = HillFiberLaw::new(HillFiberConfig::default()).unwrap();
        let err = law.fiber_velocity(&kinematics(0.5, 0.0, 0.3)).unwrap_err();
        assert!(err.is_numerical());
    }

    #[test]
    fn test_bounds_scale_with_optimal_length() {
        let law = HillFiberLaw::new(HillFiberConfig::biceps()).unwrap();
        let (lo, hi) = law.fiber_length_bounds();

        assert_relative_eq!(lo, 0.4 * 0.116, epsilon = 1e-12);
        assert_relative_eq!(hi, 1.8 * 0.116, epsilon = 1e-12);
    }

    #[test]
    fn test_diagnostics_report_stretched_tendon() {
        let law = HillFiberLaw::new(HillFiberConfig::biceps()).unwrap();
        let path = law.config().reference_path_length();
        let diag = law.diagnostics(&kinematics(0.5, 0.09, path)).unwrap();

        assert!(diag.tendon_force > 0.0);
        assert!(diag.tendon_length > law.config().tendon_slack_length);
        assert!(diag.active_force_length_multiplier > 0.0);
        assert!(diag.active_force_length_multiplier <= 1.0);
    }
}
