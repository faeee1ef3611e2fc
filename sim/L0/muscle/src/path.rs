//! Musculotendon path length models.
//!
//! Path geometry (via points, wrapping) is owned by the host. The muscle core
//! only needs the total musculotendon length and its rate of change, which
//! it reads through [`MusclePath`].
//!
//! ## Available Models
//!
//! - [`FixedPath`]: Constant length (isometric test rigs, calibration)
//! - [`CoordinatePath`]: Linear moment-arm model over a host coordinate
//!
//! ```text
//! L_mt(q) = L_ref - r * q
//! ```

use crate::error::{ensure_finite, ensure_positive};
use crate::state::{State, StateHandle};
use crate::Result;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Source of the total musculotendon length.
pub trait MusclePath {
    /// Total musculotendon length (m) in the given snapshot.
    fn length(&self, state: &State) -> Result<f64>;

    /// Rate of change of the musculotendon length (m/s).
    ///
    /// Positive when the path is being stretched.
    fn lengthening_speed(&self, state: &State) -> Result<f64>;
}

/// Path with a constant length.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FixedPath {
    /// Musculotendon length (m).
    pub length: f64,
}

impl FixedPath {
    /// Create a fixed path.
    pub fn new(length: f64) -> Result<Self> {
        Ok(Self {
            length: ensure_positive("path_length", length)?,
        })
    }
}

impl MusclePath for FixedPath {
    fn length(&self, _state: &State) -> Result<f64> {
        Ok(self.length)
    }

    fn lengthening_speed(&self, _state: &State) -> Result<f64> {
        Ok(0.0)
    }
}

/// Path whose length follows a host coordinate through a constant moment arm.
///
/// The coordinate and its speed are continuous states declared by another
/// component (e.g. a hinge joint). The moment arm keeps its sign: with a
/// positive arm, positive coordinate motion shortens the muscle; with a
/// negative arm (e.g. an extensor on the same joint) it lengthens it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinatePath {
    /// Length at zero coordinate (m), typically tendon slack plus optimal
    /// fiber length.
    pub reference_length: f64,

    /// Signed moment arm (m).
    pub moment_arm: f64,

    /// Coordinate slot (rad).
    pub coordinate: StateHandle,

    /// Coordinate speed slot (rad/s), if the host tracks one.
    pub speed: Option<StateHandle>,
}

impl CoordinatePath {
    /// Create a coordinate-driven path.
    pub fn new(reference_length: f64, moment_arm: f64, coordinate: StateHandle) -> Result<Self> {
        Ok(Self {
            reference_length: ensure_positive("reference_length", reference_length)?,
            moment_arm: ensure_finite("moment_arm", moment_arm)?,
            coordinate,
            speed: None,
        })
    }

    /// Attach the coordinate speed slot.
    #[must_use]
    pub fn with_speed(mut self, speed: StateHandle) -> Self {
        self.speed = Some(speed);
        self
    }
}

impl MusclePath for CoordinatePath {
    fn length(&self, state: &State) -> Result<f64> {
        let q = state.value(self.coordinate)?;
        Ok(self.reference_length - self.moment_arm * q)
    }

    fn lengthening_speed(&self, state: &State) -> Result<f64> {
        match self.speed {
            Some(speed) => Ok(-self.moment_arm * state.value(speed)?),
            None => Ok(0.0),
        }
    }
}
