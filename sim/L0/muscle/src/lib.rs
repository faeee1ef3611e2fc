//! Two-state fiber-length muscle core for musculoskeletal simulation.
//!
//! This crate provides the state-management core of a muscle-tendon actuator
//! whose continuous state is its **activation** and its **fiber length**.
//! A host integrator owns the state vector; the muscle declares its two slots,
//! evaluates their time-derivatives on demand and can solve for an initial
//! fiber length at which fiber and tendon forces balance.
//!
//! ```text
//!   StateSystem ──declare──► [ ..., activation, fiber_length, ... ]
//!                                      │            │
//!                         activation_rate      fiber_velocity
//!                                      │            │
//!                                      └─── FiberForceLaw ◄── MusclePath
//! ```
//!
//! # Parts
//!
//! - **Parameter store** ([`MuscleDefaults`]): default activation and fiber
//!   length, used to seed a fresh state.
//! - **State variable registry** ([`StateSystem`], [`State`]): named slots with
//!   separate value and derivative sides, addressed by [`StateHandle`].
//! - **Derivative evaluator**: [`FiberLengthMuscle::compute_state_variable_derivatives`]
//!   delegates activation and fiber-velocity physics to a [`FiberForceLaw`].
//! - **Equilibrium solver** ([`find_fiber_equilibrium`]): bracketed root search
//!   for the fiber length with zero fiber velocity.
//!
//! # Quick Start
//!
//! ```
//! use sim_fiber_muscle::{
//!     FiberLengthMuscle, FixedPath, HillFiberConfig, HillFiberLaw, StateSystem,
//! };
//!
//! let config = HillFiberConfig::biceps();
//! let path = FixedPath::new(config.reference_path_length()).unwrap();
//! let mut law = HillFiberLaw::new(config).unwrap();
//! law.set_excitation(0.7).unwrap();
//!
//! let mut muscle = FiberLengthMuscle::new("biceps", law, path);
//!
//! let mut system = StateSystem::new();
//! muscle.declare_state_variables(&mut system).unwrap();
//! let mut state = system.make_state();
//!
//! let rates = muscle.compute_state_variable_derivatives(&mut state).unwrap();
//! println!("da/dt = {:.3}, dl/dt = {:.4}", rates.activation_rate, rates.fiber_velocity);
//! ```
//!
//! # Force Law
//!
//! The bundled [`HillFiberLaw`] uses first-order activation dynamics with
//! asymmetric time constants, Gaussian active force-length, exponential
//! passive force-length, a Hill force-velocity curve and a quadratic tendon.
//! Fiber velocity follows from the force balance
//!
//! ```text
//! F_tendon = (a · f_L(l) · f_V(v) + f_PE(l)) · F0 · cos(α)
//! ```
//!
//! solved for `v` through the inverse force-velocity curve.
//!
//! # Layer 0 Crate
//!
//! This is a Layer 0 crate with **zero Bevy dependencies**. It can be driven by
//! any integrator that can hold a flat state vector.
//!
//! # References
//!
//! - Zajac, F.E. (1989). Muscle and tendon: properties, models, scaling.
//! - Thelen, D.G. (2003). Adjustment of muscle mechanics model parameters.
//! - Millard, M. et al. (2013). Flexing computational muscle.

#![doc(html_root_url = "https://docs.rs/sim-fiber-muscle/0.1.0")]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,
    clippy::module_name_repetitions,
    clippy::doc_markdown,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::similar_names,
    clippy::too_many_lines,
    clippy::suboptimal_flops,
    clippy::cast_precision_loss,
    clippy::imprecise_flops
)]
#![cfg_attr(test, allow(clippy::float_cmp, clippy::let_underscore_must_use))]

pub mod activation;
pub mod config;
pub mod curves;
pub mod equilibrium;
mod error;
pub mod hill;
pub mod law;
pub mod muscle;
pub mod path;
pub mod state;

// Re-export main types at crate root
pub use activation::ActivationDynamics;
pub use config::{EquilibriumConfig, MuscleDefaults, DEFAULT_ACTIVATION, DEFAULT_FIBER_LENGTH};
pub use curves::{
    ActiveForceLengthCurve, ForceVelocityCurve, MuscleForceCurves, PassiveForceLengthCurve,
    TendonForceLengthCurve,
};
pub use equilibrium::{find_fiber_equilibrium, FiberEquilibrium};
pub use error::MuscleError;
pub use hill::{FiberDiagnostics, HillFiberConfig, HillFiberLaw};
pub use law::{FiberForceLaw, FiberKinematics};
pub use muscle::{
    FiberLengthMuscle, StateDerivatives, STATE_ACTIVATION_NAME, STATE_FIBER_LENGTH_NAME,
    STATE_VARIABLE_NAMES,
};
pub use path::{CoordinatePath, FixedPath, MusclePath};
pub use state::{State, StateHandle, StateSystem, SystemId};

/// Result type for muscle operations.
pub type Result<T> = std::result::Result<T, MuscleError>;
