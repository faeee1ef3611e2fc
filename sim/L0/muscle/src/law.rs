//! Force-law capability consumed by the muscle core.
//!
//! The core never fixes a force-length or force-velocity curve family. A
//! concrete muscle model supplies the activation dynamics and the fiber
//! velocity implied by force balance between fiber and tendon; the core
//! routes those values into the host state and uses them for the
//! equilibrium search.

use crate::state::State;
use crate::Result;

/// Instantaneous inputs to the force-balance relation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FiberKinematics {
    /// Activation level.
    pub activation: f64,

    /// Fiber length (m).
    pub fiber_length: f64,

    /// Total musculotendon path length (m).
    pub path_length: f64,

    /// Rate of change of the path length (m/s).
    pub path_lengthening_speed: f64,
}

/// Concrete tension-generation law of an activation / fiber-length muscle.
///
/// Implementations must be pure functions of their inputs: the host may call
/// them any number of times with the same snapshot, including for rejected
/// integrator trials.
pub trait FiberForceLaw {
    /// Activation time-derivative (1/s) at the given activation.
    fn activation_rate(&self, state: &State, activation: f64) -> Result<f64>;

    /// Fiber velocity (m/s) implied by force balance between fiber and
    /// tendon. Negative values are shortening.
    fn fiber_velocity(&self, kinematics: &FiberKinematics) -> Result<f64>;

    /// Force (N) along the line of action with zero fiber velocity.
    fn isometric_force(&self, kinematics: &FiberKinematics) -> Result<f64>;

    /// Valid fiber length domain `(min, max)` in meters. The minimum is
    /// exclusive.
    fn fiber_length_bounds(&self) -> (f64, f64) {
        (0.0, f64::INFINITY)
    }
}

impl<L: FiberForceLaw + ?Sized> FiberForceLaw for Box<L> {
    fn activation_rate(&self, state: &State, activation: f64) -> Result<f64> {
        (**self).activation_rate(state, activation)
    }

    fn fiber_velocity(&self, kinematics: &FiberKinematics) -> Result<f64> {
        (**self).fiber_velocity(kinematics)
    }

    fn isometric_force(&self, kinematics: &FiberKinematics) -> Result<f64> {
        (**self).isometric_force(kinematics)
    }

    fn fiber_length_bounds(&self) -> (f64, f64) {
        (**self).fiber_length_bounds()
    }
}
