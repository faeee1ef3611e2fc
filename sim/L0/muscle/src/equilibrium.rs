//! Initial fiber-equilibrium search.
//!
//! Finds the fiber length at which the force-balance fiber velocity is zero,
//! holding activation and path length fixed. The velocity is treated as a
//! scalar function `f(l)` of the candidate fiber length:
//!
//! 1. **Bracket**: probe outward from the starting length with a growing
//!    step until `f` changes sign, staying inside the valid domain
//!    `(min, max]`. Probes that would cross the exclusive minimum move half
//!    way towards it instead.
//! 2. **Refine**: Illinois-modified regula falsi on the bracket, falling back
//!    to bisection whenever the bracket stops halving.
//!
//! Both phases are capped by [`EquilibriumConfig`]; running out of probes is
//! [`MuscleError::EquilibriumNotFound`], running out of iterations is
//! [`MuscleError::ConvergenceFailure`]. A bracket that collapses onto a jump
//! in the velocity (residual above `residual_tolerance`) is also a
//! [`MuscleError::ConvergenceFailure`]. Nothing is substituted on failure.

use crate::config::EquilibriumConfig;
use crate::error::ensure_finite;
use crate::{MuscleError, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Successful equilibrium solve.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FiberEquilibrium {
    /// Fiber length with zero force-balance velocity (m).
    pub fiber_length: f64,

    /// Fiber velocity remaining at that length (m/s).
    pub residual_velocity: f64,

    /// Refinement iterations used (0 if a probe landed on the root).
    pub iterations: usize,

    /// Function evaluations spent bracketing, including the starting point.
    pub probes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    None,
    Lower,
    Upper,
}

/// Search for a root of `velocity` in the fiber length domain `bounds`.
///
/// `bounds` is `(min, max)` with `min` exclusive. `start` outside the domain
/// is moved inside it: above `max` it becomes `max`, at or below `min` it
/// becomes the domain midpoint.
pub fn find_fiber_equilibrium<F>(
    mut velocity: F,
    start: f64,
    bounds: (f64, f64),
    config: &EquilibriumConfig,
) -> Result<FiberEquilibrium>
where
    F: FnMut(f64) -> Result<f64>,
{
    config.validate()?;
    let (min, max) = checked_bounds(bounds)?;
    let x0 = starting_length(ensure_finite("start", start)?, min, max)?;
    let tol = config.tolerance;

    let mut eval = |length: f64| -> Result<f64> {
        let v = velocity(length)?;
        if v.is_finite() {
            Ok(v)
        } else {
            Err(MuscleError::numerical(format!(
                "fiber velocity is {v} at fiber length {length}"
            )))
        }
    };

    let f0 = eval(x0)?;
    let mut probes = 1;
    if f0.abs() <= tol {
        return Ok(solved(x0, f0, 0, probes));
    }

    // Bracketing
    let (mut lo, mut f_lo) = (x0, f0);
    let (mut hi, mut f_hi) = (x0, f0);
    let mut step = x0 * config.initial_step_fraction;
    let mut bracket = None;

    for _ in 0..config.max_bracket_expansions {
        let mut moved = false;

        let next_lo = if lo - step > min { lo - step } else { 0.5 * (lo + min) };
        if next_lo < lo && next_lo > min {
            let f = eval(next_lo)?;
            probes += 1;
            if f.abs() <= tol {
                return Ok(solved(next_lo, f, 0, probes));
            }
            if f.signum() != f_lo.signum() {
                bracket = Some((next_lo, f, lo, f_lo));
                break;
            }
            lo = next_lo;
            f_lo = f;
            moved = true;
        }

        let next_hi = (hi + step).min(max);
        if next_hi > hi {
            let f = eval(next_hi)?;
            probes += 1;
            if f.abs() <= tol {
                return Ok(solved(next_hi, f, 0, probes));
            }
            if f.signum() != f_hi.signum() {
                bracket = Some((hi, f_hi, next_hi, f));
                break;
            }
            hi = next_hi;
            f_hi = f;
            moved = true;
        }

        if !moved {
            break;
        }
        step *= 2.0;
    }

    let Some((mut a, mut fa, mut b, mut fb)) = bracket else {
        tracing::warn!(
            start = x0,
            min_probed = lo,
            max_probed = hi,
            probes,
            "no sign change of fiber velocity inside the valid domain"
        );
        return Err(MuscleError::EquilibriumNotFound {
            min_length: lo,
            max_length: hi,
            probes,
        });
    };

    tracing::trace!(a, b, fa, fb, probes, "bracketed fiber equilibrium");

    // Refinement. `fa`/`fb` may be scaled by the Illinois rule; `best`
    // keeps the true residual.
    let mut best = if fa.abs() <= fb.abs() { (a, fa) } else { (b, fb) };
    let mut side = Side::None;
    let mut stalled = 0;

    for iteration in 1..=config.max_iterations {
        let width = b - a;

        let mut x = if stalled >= 2 {
            0.5 * (a + b)
        } else {
            (a * fb - b * fa) / (fb - fa)
        };
        if !(x > a && x < b) {
            x = 0.5 * (a + b);
        }

        let fx = eval(x)?;
        if fx.abs() <= best.1.abs() {
            best = (x, fx);
        }

        tracing::trace!(iteration, x, fx, width, "refining fiber equilibrium");

        if fx.abs() <= tol {
            return Ok(solved(x, fx, iteration, probes));
        }

        if fx.signum() == fa.signum() {
            a = x;
            fa = fx;
            if side == Side::Lower {
                fb *= 0.5;
            }
            side = Side::Lower;
        } else {
            b = x;
            fb = fx;
            if side == Side::Upper {
                fa *= 0.5;
            }
            side = Side::Upper;
        }

        if 0.5 * (b - a) <= tol {
            let mid = 0.5 * (a + b);
            let f_mid = eval(mid)?;
            if f_mid.abs() <= config.residual_tolerance {
                return Ok(solved(mid, f_mid, iteration, probes));
            }
            if f_mid.abs() <= best.1.abs() {
                best = (mid, f_mid);
            }
            return Err(not_converged(iteration, best));
        }

        if b - a > 0.5 * width {
            stalled += 1;
        } else {
            stalled = 0;
        }
    }

    Err(not_converged(config.max_iterations, best))
}

fn not_converged(iterations: usize, (best_length, residual): (f64, f64)) -> MuscleError {
    tracing::warn!(
        iterations,
        best_length,
        residual,
        "fiber equilibrium did not converge"
    );
    MuscleError::ConvergenceFailure {
        iterations,
        best_length,
        residual,
    }
}

fn solved(fiber_length: f64, residual_velocity: f64, iterations: usize, probes: usize) -> FiberEquilibrium {
    tracing::debug!(
        fiber_length,
        residual_velocity,
        iterations,
        probes,
        "fiber equilibrium converged"
    );
    FiberEquilibrium {
        fiber_length,
        residual_velocity,
        iterations,
        probes,
    }
}

fn checked_bounds((min, max): (f64, f64)) -> Result<(f64, f64)> {
    if !min.is_finite() || min < 0.0 {
        return Err(MuscleError::invalid_argument(
            "min_fiber_length",
            min,
            "must be finite and non-negative",
        ));
    }
    if max.is_nan() || max <= min {
        return Err(MuscleError::invalid_argument(
            "max_fiber_length",
            max,
            "must exceed the minimum fiber length",
        ));
    }
    Ok((min, max))
}

fn starting_length(start: f64, min: f64, max: f64) -> Result<f64> {
    if start > min && start <= max {
        return Ok(start);
    }
    if start > max {
        return Ok(max);
    }
    if max.is_finite() {
        return Ok(0.5 * (min + max));
    }
    Err(MuscleError::invalid_argument(
        "start",
        start,
        "must exceed the minimum fiber length when the domain is unbounded",
    ))
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    clippy::panic
)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn linear(k: f64, rest: f64) -> impl FnMut(f64) -> Result<f64> {
        move |l| Ok(k * (rest - l))
    }

    #[test]
    fn test_linear_spring_root() {
        let config = EquilibriumConfig::default();
        let sol = find_fiber_equilibrium(linear(1.0, 0.12), 0.1, (0.0, 1.0), &config).unwrap();

        assert_relative_eq!(sol.fiber_length, 0.12, epsilon = config.tolerance);
        assert!(sol.residual_velocity.abs() <= config.tolerance);
    }

    #[test]
    fn test_start_on_root_needs_one_probe() {
        let config = EquilibriumConfig::default();
        let sol = find_fiber_equilibrium(linear(5.0, 0.1), 0.1, (0.0, 1.0), &config).unwrap();

        assert_eq!(sol.fiber_length, 0.1);
        assert_eq!(sol.probes, 1);
        assert_eq!(sol.iterations, 0);
    }

    #[test]
    fn test_nonlinear_root() {
        // v(l) = 0.3 - l^3, root at cbrt(0.3)
        let config = EquilibriumConfig::default();
        let sol =
            find_fiber_equilibrium(|l: f64| Ok(0.3 - l.powi(3)), 0.2, (0.0, 2.0), &config).unwrap();

        assert_relative_eq!(sol.fiber_length, 0.3f64.cbrt(), epsilon = 1e-8);
    }

    #[test]
    fn test_root_near_exclusive_minimum() {
        let config = EquilibriumConfig::default();
        let sol = find_fiber_equilibrium(linear(1.0, 0.001), 0.5, (0.0, 1.0), &config).unwrap();

        assert_relative_eq!(sol.fiber_length, 0.001, epsilon = 1e-8);
    }

    #[test]
    fn test_no_root_is_equilibrium_not_found() {
        let config = EquilibriumConfig::default();
        let err = find_fiber_equilibrium(|l: f64| Ok(1.0 + l), 0.1, (0.0, 1.0), &config)
            .unwrap_err();

        match err {
            MuscleError::EquilibriumNotFound {
                min_length,
                max_length,
                probes,
            } => {
                assert!(min_length > 0.0);
                assert_eq!(max_length, 1.0);
                assert!(probes > 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_iteration_cap_is_convergence_failure() {
        let config = EquilibriumConfig::default()
            .with_tolerance(1e-15)
            .with_max_iterations(2);
        // Discontinuous sign change: width shrinks but |f| never drops.
        let step = |l: f64| Ok(if l < 0.1234567 { 1.0 } else { -1.0 });
        let err = find_fiber_equilibrium(step, 0.1, (0.0, 1.0), &config).unwrap_err();

        assert!(matches!(
            err,
            MuscleError::ConvergenceFailure { iterations: 2, .. }
        ));
        assert!(err.is_equilibrium_failure());
    }

    #[test]
    fn test_velocity_jump_is_not_an_equilibrium() {
        // Sign change without a zero crossing: the bracket collapses onto the
        // jump but the fiber is still moving there.
        let config = EquilibriumConfig::default().with_tolerance(1e-10);
        let step = |l: f64| Ok(if l < 0.1234567 { 0.5 } else { -0.5 });
        let err = find_fiber_equilibrium(step, 0.1, (0.01, 0.5), &config).unwrap_err();

        match err {
            MuscleError::ConvergenceFailure {
                iterations,
                best_length,
                residual,
            } => {
                assert!(iterations < config.max_iterations);
                assert_relative_eq!(best_length, 0.1234567, epsilon = 1e-9);
                assert_eq!(residual.abs(), 0.5);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_bracket_collapse_accepts_small_residual() {
        // Kinked at the root: the bracket usually collapses before the
        // residual reaches `tolerance`, but the fiber is effectively still.
        let config = EquilibriumConfig::default().with_tolerance(1e-10);
        let kinked = |l: f64| {
            let d = 0.1234567 - l;
            Ok(if d > 0.0 { 1e3 * d } else { 10.0 * d })
        };
        let sol = find_fiber_equilibrium(kinked, 0.1, (0.01, 0.5), &config).unwrap();

        assert_relative_eq!(sol.fiber_length, 0.1234567, epsilon = 1e-9);
        assert!(sol.residual_velocity.abs() <= config.residual_tolerance);
    }

    #[test]
    fn test_nan_velocity_is_numerical_error() {
        let config = EquilibriumConfig::default();
        let err = find_fiber_equilibrium(|_| Ok(f64::NAN), 0.1, (0.0, 1.0), &config).unwrap_err();
        assert!(err.is_numerical());
    }

    #[test]
    fn test_collaborator_error_propagates() {
        let config = EquilibriumConfig::default();
        let err = find_fiber_equilibrium(
            |_| Err(MuscleError::numerical("stiff")),
            0.1,
            (0.0, 1.0),
            &config,
        )
        .unwrap_err();
        assert_eq!(err, MuscleError::numerical("stiff"));
    }

    #[test]
    fn test_start_outside_domain_is_moved_inside() {
        let config = EquilibriumConfig::default();

        let sol = find_fiber_equilibrium(linear(1.0, 0.3), 5.0, (0.0, 1.0), &config).unwrap();
        assert_relative_eq!(sol.fiber_length, 0.3, epsilon = 1e-8);

        let sol = find_fiber_equilibrium(linear(1.0, 0.3), -1.0, (0.0, 1.0), &config).unwrap();
        assert_relative_eq!(sol.fiber_length, 0.3, epsilon = 1e-8);

        let err = find_fiber_equilibrium(linear(1.0, 0.3), -1.0, (0.0, f64::INFINITY), &config)
            .unwrap_err();
        assert!(matches!(err, MuscleError::InvalidArgument { .. }));
    }

    #[test]
    fn test_invalid_bounds_rejected() {
        let config = EquilibriumConfig::default();
        assert!(find_fiber_equilibrium(linear(1.0, 0.3), 0.1, (0.5, 0.2), &config).is_err());
        assert!(find_fiber_equilibrium(linear(1.0, 0.3), 0.1, (-1.0, 1.0), &config).is_err());
    }
}
