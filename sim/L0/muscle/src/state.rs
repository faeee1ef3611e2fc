//! Continuous-state arena shared by every component of a host system.
//!
//! [`StateSystem`] is built once: components declare their continuous
//! variables and receive a [`StateHandle`] per variable. [`State`] is a
//! value-like snapshot made from the system with one slot per declared
//! variable on the value side and one on the derivative side, the same split
//! as `mjData.act` / `mjData.act_dot`.
//!
//! ```text
//!   StateSystem ── declare_continuous("biceps", "activation", 0.05) ──► handle 0
//!               ── declare_continuous("biceps", "fiber_length", 0.1) ─► handle 1
//!               ── make_state() ─► State { values: [0.05, 0.1], derivatives: [0, 0] }
//! ```
//!
//! Handles are plain indices. A component resolves them once at declaration
//! time and keeps them for the lifetime of the system.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use nalgebra::DVector;

use crate::error::ensure_finite;
use crate::{MuscleError, Result};

/// Unique identity of a [`StateSystem`] and of every [`State`] made from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SystemId(u64);

impl SystemId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "system#{}", self.0)
    }
}

/// Opaque reference to one slot of the continuous state vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateHandle(usize);

impl StateHandle {
    /// Position of the slot in the state vector.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for StateHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "y[{}]", self.0)
    }
}

/// Builder for the continuous state vector of a host system.
#[derive(Debug, Clone)]
pub struct StateSystem {
    id: SystemId,
    names: Vec<String>,
    initial: Vec<f64>,
    lookup: HashMap<String, StateHandle>,
}

impl Default for StateSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl StateSystem {
    /// Create an empty system.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: SystemId::next(),
            names: Vec::new(),
            initial: Vec::new(),
            lookup: HashMap::new(),
        }
    }

    /// Identity of this system.
    #[must_use]
    pub fn id(&self) -> SystemId {
        self.id
    }

    /// Number of declared continuous variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Check if nothing has been declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Declare a continuous variable owned by `owner`.
    ///
    /// Slots are allocated in declaration order. Declaring the same
    /// `(owner, name)` pair twice is a lifecycle error.
    pub fn declare_continuous(
        &mut self,
        owner: &str,
        name: &str,
        initial: f64,
    ) -> Result<StateHandle> {
        let initial = ensure_finite("initial", initial)?;
        let key = qualified_name(owner, name);

        if self.lookup.contains_key(&key) {
            return Err(MuscleError::invalid_state(format!(
                "state variable '{key}' already declared in {}",
                self.id
            )));
        }

        let handle = StateHandle(self.names.len());
        self.names.push(key.clone());
        self.initial.push(initial);
        self.lookup.insert(key, handle);

        tracing::trace!(system = %self.id, %handle, owner, name, "declared continuous state");
        Ok(handle)
    }

    /// Look up a handle by owner and variable name.
    #[must_use]
    pub fn handle(&self, owner: &str, name: &str) -> Option<StateHandle> {
        self.lookup.get(&qualified_name(owner, name)).copied()
    }

    /// Qualified name of a declared slot.
    #[must_use]
    pub fn name(&self, handle: StateHandle) -> Option<&str> {
        self.names.get(handle.0).map(String::as_str)
    }

    /// Iterate over qualified names in slot order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Create a fresh snapshot holding the declared initial values and zero
    /// derivatives.
    #[must_use]
    pub fn make_state(&self) -> State {
        State {
            system: self.id,
            time: 0.0,
            values: DVector::from_column_slice(&self.initial),
            derivatives: DVector::zeros(self.initial.len()),
        }
    }
}

fn qualified_name(owner: &str, name: &str) -> String {
    if owner.is_empty() {
        name.to_owned()
    } else {
        format!("{owner}.{name}")
    }
}

/// Snapshot of the continuous state of a host system.
///
/// Each integrator trial works on its own clone; nothing here is shared.
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    system: SystemId,
    time: f64,
    values: DVector<f64>,
    derivatives: DVector<f64>,
}

impl State {
    /// Identity of the system this snapshot was made from.
    #[must_use]
    pub fn system_id(&self) -> SystemId {
        self.system
    }

    /// Simulation time (s).
    #[must_use]
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Set the simulation time (s).
    pub fn set_time(&mut self, time: f64) {
        self.time = time;
    }

    /// Number of continuous slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the snapshot has no slots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value side of the state vector.
    #[must_use]
    pub fn values(&self) -> &DVector<f64> {
        &self.values
    }

    /// Mutable value side, for host integrators.
    pub fn values_mut(&mut self) -> &mut DVector<f64> {
        &mut self.values
    }

    /// Derivative side of the state vector.
    #[must_use]
    pub fn derivatives(&self) -> &DVector<f64> {
        &self.derivatives
    }

    /// Read a value slot.
    pub fn value(&self, handle: StateHandle) -> Result<f64> {
        self.values
            .get(handle.0)
            .copied()
            .ok_or_else(|| missing_slot(handle, self.system))
    }

    /// Write a value slot.
    pub fn set_value(&mut self, handle: StateHandle, value: f64) -> Result<()> {
        let system = self.system;
        let slot = self
            .values
            .get_mut(handle.0)
            .ok_or_else(|| missing_slot(handle, system))?;
        *slot = value;
        Ok(())
    }

    /// Read a derivative slot.
    pub fn derivative(&self, handle: StateHandle) -> Result<f64> {
        self.derivatives
            .get(handle.0)
            .copied()
            .ok_or_else(|| missing_slot(handle, self.system))
    }

    /// Write a derivative slot.
    pub fn set_derivative(&mut self, handle: StateHandle, rate: f64) -> Result<()> {
        let system = self.system;
        let slot = self
            .derivatives
            .get_mut(handle.0)
            .ok_or_else(|| missing_slot(handle, system))?;
        *slot = rate;
        Ok(())
    }
}

fn missing_slot(handle: StateHandle, system: SystemId) -> MuscleError {
    MuscleError::not_found(format!("{handle} in {system}"))
}
