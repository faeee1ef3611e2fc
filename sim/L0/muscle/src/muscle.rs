//! Two-state activation / fiber-length muscle.
//!
//! [`FiberLengthMuscle`] owns the parameter store, the identity of its two
//! continuous state slots and its collaborators (force law and path). The
//! state values themselves live in the host [`State`].
//!
//! # Lifecycle
//!
//! ```text
//! Unregistered ──declare_state_variables──► Registered
//!      Registered ──init_state_from_properties──► Initialized
//!      Initialized ──compute_initial_fiber_equilibrium──► Equilibrated (optional)
//!      ──compute_state_variable_derivatives (repeatedly)──► Integrating
//! ```
//!
//! # Example
//!
//! ```
//! use sim_fiber_muscle::{
//!     FiberLengthMuscle, FixedPath, HillFiberConfig, HillFiberLaw, StateSystem,
//! };
//!
//! let config = HillFiberConfig::biceps();
//! let path = FixedPath::new(config.reference_path_length()).unwrap();
//! let mut law = HillFiberLaw::new(config).unwrap();
//! law.set_excitation(0.5).unwrap();
//!
//! let mut muscle = FiberLengthMuscle::new("biceps", law, path);
//! muscle.set_default_activation(0.5).unwrap();
//! muscle.set_default_fiber_length(0.1).unwrap();
//!
//! let mut system = StateSystem::new();
//! muscle.declare_state_variables(&mut system).unwrap();
//!
//! let mut state = system.make_state();
//! muscle.init_state_from_properties(&mut state).unwrap();
//! let eq = muscle.compute_initial_fiber_equilibrium(&mut state).unwrap();
//! assert!(eq.fiber_length > 0.0);
//!
//! muscle.compute_state_variable_derivatives(&mut state).unwrap();
//! ```

use crate::config::{EquilibriumConfig, MuscleDefaults};
use crate::equilibrium::{find_fiber_equilibrium, FiberEquilibrium};
use crate::law::{FiberForceLaw, FiberKinematics};
use crate::path::MusclePath;
use crate::state::{State, StateHandle, StateSystem, SystemId};
use crate::{MuscleError, Result};

/// Name of the activation state variable.
pub const STATE_ACTIVATION_NAME: &str = "activation";

/// Name of the fiber-length state variable.
pub const STATE_FIBER_LENGTH_NAME: &str = "fiber_length";

/// Continuous state variable names in declaration order.
pub const STATE_VARIABLE_NAMES: [&str; 2] = [STATE_ACTIVATION_NAME, STATE_FIBER_LENGTH_NAME];

/// Handles resolved when the muscle is added to a host system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Registration {
    system: SystemId,
    activation: StateHandle,
    fiber_length: StateHandle,
}

/// Time-derivatives of the two continuous states.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateDerivatives {
    /// Activation rate (1/s).
    pub activation_rate: f64,

    /// Fiber velocity (m/s).
    pub fiber_velocity: f64,
}

impl StateDerivatives {
    /// Derivatives in declaration order.
    #[must_use]
    pub fn to_array(self) -> [f64; 2] {
        [self.activation_rate, self.fiber_velocity]
    }
}

/// Muscle-tendon actuator with activation and fiber length as continuous
/// states.
#[derive(Debug, Clone)]
pub struct FiberLengthMuscle<L, P> {
    name: String,
    defaults: MuscleDefaults,
    equilibrium: EquilibriumConfig,
    law: L,
    path: P,
    registration: Option<Registration>,
}

impl<L, P> FiberLengthMuscle<L, P>
where
    L: FiberForceLaw,
    P: MusclePath,
{
    /// Create an unregistered muscle with documented defaults.
    #[must_use]
    pub fn new(name: impl Into<String>, law: L, path: P) -> Self {
        Self {
            name: name.into(),
            defaults: MuscleDefaults::default(),
            equilibrium: EquilibriumConfig::default(),
            law,
            path,
            registration: None,
        }
    }

    /// Replace the parameter store.
    pub fn with_defaults(mut self, defaults: MuscleDefaults) -> Result<Self> {
        defaults.validate()?;
        self.in_fiber_length_domain(defaults.default_fiber_length())?;
        self.defaults = defaults;
        Ok(self)
    }

    /// Replace the equilibrium solver settings.
    pub fn with_equilibrium_config(mut self, config: EquilibriumConfig) -> Result<Self> {
        config.validate()?;
        self.equilibrium = config;
        Ok(self)
    }

    /// Muscle name, used as the owner of its state variables.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The force law.
    #[must_use]
    pub fn law(&self) -> &L {
        &self.law
    }

    /// Mutable access to the force law (e.g. to change excitation).
    pub fn law_mut(&mut self) -> &mut L {
        &mut self.law
    }

    /// The path model.
    #[must_use]
    pub fn path(&self) -> &P {
        &self.path
    }

    /// Equilibrium solver settings.
    #[must_use]
    pub fn equilibrium_config(&self) -> &EquilibriumConfig {
        &self.equilibrium
    }

    // ------------------------------------------------------------------
    // Parameter store
    // ------------------------------------------------------------------

    /// The parameter store.
    #[must_use]
    pub fn defaults(&self) -> &MuscleDefaults {
        &self.defaults
    }

    /// Activation assumed if none is assigned.
    #[must_use]
    pub fn default_activation(&self) -> f64 {
        self.defaults.default_activation()
    }

    /// Set the default activation. Does not touch any live state.
    pub fn set_default_activation(&mut self, activation: f64) -> Result<()> {
        self.defaults.set_default_activation(activation)
    }

    /// Fiber length (m) assumed if none is assigned.
    #[must_use]
    pub fn default_fiber_length(&self) -> f64 {
        self.defaults.default_fiber_length()
    }

    /// Set the default fiber length (m). Does not touch any live state.
    ///
    /// Lengths outside the force law's
    /// [`fiber_length_bounds`](FiberForceLaw::fiber_length_bounds) are
    /// rejected and the previous value is kept.
    pub fn set_default_fiber_length(&mut self, length: f64) -> Result<()> {
        self.in_fiber_length_domain(length)?;
        self.defaults.set_default_fiber_length(length)
    }

    fn in_fiber_length_domain(&self, length: f64) -> Result<f64> {
        let (min, max) = self.law.fiber_length_bounds();
        if length > min && length <= max {
            Ok(length)
        } else {
            Err(MuscleError::invalid_argument(
                "default_fiber_length",
                length,
                "outside the force law's fiber length domain",
            ))
        }
    }

    fn warn_if_default_outside_domain(&self) {
        let length = self.defaults.default_fiber_length();
        if self.in_fiber_length_domain(length).is_err() {
            let (min, max) = self.law.fiber_length_bounds();
            tracing::warn!(
                muscle = %self.name,
                default_fiber_length = length,
                min,
                max,
                "default fiber length is outside the force law's domain"
            );
        }
    }

    // ------------------------------------------------------------------
    // State variable registry
    // ------------------------------------------------------------------

    /// Canonical state variable names in declaration order.
    #[must_use]
    pub fn state_variable_names(&self) -> [&'static str; 2] {
        STATE_VARIABLE_NAMES
    }

    /// Check if the muscle has declared its states with a system.
    #[must_use]
    pub fn is_registered(&self) -> bool {
        self.registration.is_some()
    }

    /// The system the muscle is registered with.
    #[must_use]
    pub fn registered_system(&self) -> Option<SystemId> {
        self.registration.map(|r| r.system)
    }

    /// Declare activation then fiber length with the host system, seeded from
    /// the parameter store, and cache the resulting handles.
    ///
    /// Declaring twice with the same system is [`MuscleError::InvalidState`].
    /// Declaring with a newly built system replaces the cached handles.
    pub fn declare_state_variables(&mut self, system: &mut StateSystem) -> Result<()> {
        if self.registered_system() == Some(system.id()) {
            return Err(MuscleError::invalid_state(format!(
                "muscle '{}' already declared its state variables in {}",
                self.name,
                system.id()
            )));
        }

        let activation = system.declare_continuous(
            &self.name,
            STATE_ACTIVATION_NAME,
            self.defaults.default_activation(),
        )?;
        let fiber_length = system.declare_continuous(
            &self.name,
            STATE_FIBER_LENGTH_NAME,
            self.defaults.default_fiber_length(),
        )?;

        self.registration = Some(Registration {
            system: system.id(),
            activation,
            fiber_length,
        });

        tracing::debug!(
            muscle = %self.name,
            system = %system.id(),
            %activation,
            %fiber_length,
            "declared muscle state variables"
        );
        self.warn_if_default_outside_domain();
        Ok(())
    }

    fn registration_for(&self, state: &State) -> Result<Registration> {
        let registration = self.registration.ok_or_else(|| {
            MuscleError::invalid_state(format!(
                "muscle '{}' has not declared its state variables",
                self.name
            ))
        })?;

        if registration.system != state.system_id() {
            return Err(MuscleError::invalid_state(format!(
                "muscle '{}' is registered with {} but the state belongs to {}",
                self.name,
                registration.system,
                state.system_id()
            )));
        }

        Ok(registration)
    }

    /// Resolve a state variable name to its cached handle.
    pub fn resolve_handle(&self, state: &State, name: &str) -> Result<StateHandle> {
        let registration = self.registration_for(state)?;
        match name {
            STATE_ACTIVATION_NAME => Ok(registration.activation),
            STATE_FIBER_LENGTH_NAME => Ok(registration.fiber_length),
            _ => Err(MuscleError::not_found(format!("{}.{name}", self.name))),
        }
    }

    /// Read a state value through a handle.
    pub fn state_value(&self, state: &State, handle: StateHandle) -> Result<f64> {
        self.owned_handle(state, handle)?;
        state.value(handle)
    }

    /// Write a state value through a handle. The only sanctioned way to
    /// change the muscle's continuous state outside of integration.
    pub fn set_state_value(&self, state: &mut State, handle: StateHandle, value: f64) -> Result<()> {
        self.owned_handle(state, handle)?;
        state.set_value(handle, value)
    }

    fn owned_handle(&self, state: &State, handle: StateHandle) -> Result<()> {
        let registration = self.registration_for(state)?;
        if handle == registration.activation || handle == registration.fiber_length {
            Ok(())
        } else {
            Err(MuscleError::not_found(format!(
                "{handle} is not a state variable of muscle '{}'",
                self.name
            )))
        }
    }

    /// Current activation.
    pub fn activation(&self, state: &State) -> Result<f64> {
        state.value(self.registration_for(state)?.activation)
    }

    /// Set the activation state.
    pub fn set_activation(&self, state: &mut State, activation: f64) -> Result<()> {
        let handle = self.registration_for(state)?.activation;
        state.set_value(handle, activation)
    }

    /// Current fiber length (m).
    pub fn fiber_length(&self, state: &State) -> Result<f64> {
        state.value(self.registration_for(state)?.fiber_length)
    }

    /// Set the fiber-length state (m).
    pub fn set_fiber_length(&self, state: &mut State, fiber_length: f64) -> Result<()> {
        let handle = self.registration_for(state)?.fiber_length;
        state.set_value(handle, fiber_length)
    }

    /// Seed both value slots from the parameter store.
    pub fn init_state_from_properties(&self, state: &mut State) -> Result<()> {
        let registration = self.registration_for(state)?;
        state.set_value(registration.activation, self.defaults.default_activation())?;
        state.set_value(registration.fiber_length, self.defaults.default_fiber_length())?;

        tracing::debug!(
            muscle = %self.name,
            activation = self.defaults.default_activation(),
            fiber_length = self.defaults.default_fiber_length(),
            "initialized muscle state from defaults"
        );
        self.warn_if_default_outside_domain();
        Ok(())
    }

    /// Copy the live state back into the parameter store.
    ///
    /// Values that fail validation leave the store unchanged.
    pub fn set_properties_from_state(&mut self, state: &State) -> Result<()> {
        let activation = self.activation(state)?;
        let fiber_length = self.fiber_length(state)?;
        let defaults = MuscleDefaults::new(activation, fiber_length)?;
        self.in_fiber_length_domain(fiber_length)?;
        self.defaults = defaults;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Derivative evaluator
    // ------------------------------------------------------------------

    fn kinematics(&self, state: &State, registration: Registration) -> Result<FiberKinematics> {
        Ok(FiberKinematics {
            activation: state.value(registration.activation)?,
            fiber_length: state.value(registration.fiber_length)?,
            path_length: self.path.length(state)?,
            path_lengthening_speed: self.path.lengthening_speed(state)?,
        })
    }

    /// Evaluate both derivatives without writing them.
    pub fn state_variable_derivatives(&self, state: &State) -> Result<StateDerivatives> {
        let registration = self.registration_for(state)?;
        let kinematics = self.kinematics(state, registration)?;

        Ok(StateDerivatives {
            activation_rate: self.law.activation_rate(state, kinematics.activation)?,
            fiber_velocity: self.law.fiber_velocity(&kinematics)?,
        })
    }

    /// Evaluate both derivatives and write them into the derivative slots.
    ///
    /// Only the derivative side of the snapshot changes. On error nothing
    /// is written.
    pub fn compute_state_variable_derivatives(&self, state: &mut State) -> Result<StateDerivatives> {
        let registration = self.registration_for(state)?;
        let derivatives = self.state_variable_derivatives(state)?;

        state.set_derivative(registration.activation, derivatives.activation_rate)?;
        state.set_derivative(registration.fiber_length, derivatives.fiber_velocity)?;
        Ok(derivatives)
    }

    /// Activation rate last written to the derivative slot.
    pub fn activation_rate(&self, state: &State) -> Result<f64> {
        state.derivative(self.registration_for(state)?.activation)
    }

    /// Read a derivative slot by state variable name.
    pub fn state_variable_derivative(&self, state: &State, name: &str) -> Result<f64> {
        let handle = self.resolve_handle(state, name)?;
        state.derivative(handle)
    }

    /// Write a derivative slot by state variable name.
    pub fn set_state_variable_derivative(
        &self,
        state: &mut State,
        name: &str,
        rate: f64,
    ) -> Result<()> {
        let handle = self.resolve_handle(state, name)?;
        state.set_derivative(handle, rate)
    }

    // ------------------------------------------------------------------
    // Equilibrium solver
    // ------------------------------------------------------------------

    /// Find the fiber length with zero force-balance velocity for the current
    /// activation and path length, and write it to the fiber-length slot.
    ///
    /// The search starts from the stored fiber length. Activation is left
    /// untouched. On failure the state is unchanged.
    pub fn compute_initial_fiber_equilibrium(&self, state: &mut State) -> Result<FiberEquilibrium> {
        let registration = self.registration_for(state)?;
        let kinematics = self.kinematics(state, registration)?;

        // Static equilibrium: the path is held still.
        let solution = find_fiber_equilibrium(
            |fiber_length| {
                self.law.fiber_velocity(&FiberKinematics {
                    fiber_length,
                    path_lengthening_speed: 0.0,
                    ..kinematics
                })
            },
            kinematics.fiber_length,
            self.law.fiber_length_bounds(),
            &self.equilibrium,
        )
        .map_err(|err| {
            tracing::warn!(muscle = %self.name, %err, "initial fiber equilibrium failed");
            err
        })?;

        state.set_value(registration.fiber_length, solution.fiber_length)?;
        Ok(solution)
    }

    /// Isometric force (N) at the stored fiber length for a hypothetical
    /// activation. Does not modify the state.
    pub fn compute_isometric_force(&self, state: &State, activation: f64) -> Result<f64> {
        let registration = self.registration_for(state)?;
        let kinematics = FiberKinematics {
            activation,
            path_lengthening_speed: 0.0,
            ..self.kinematics(state, registration)?
        };
        self.law.isometric_force(&kinematics)
    }
}
