//! ## schedsim-core::time
//! **Virtual clock owned by the engine**
//!
//! Time is an opaque unit (one instruction at unit CPU speed). Only the engine
//! advances the clock; tasks observe it through their `Context`.

use crate::error::SimulationError;

/// Virtual time in simulation units.
pub type SimTime = f64;

#[derive(Debug, Clone, Default)]
pub struct VirtualClock {
    now: SimTime,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self { now: 0.0 }
    }

    /// Current virtual time.
    #[inline]
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Moves the clock to `due`. The clock is monotonically non-decreasing, so
    /// an earlier `due` is a core bug and is reported rather than applied.
    pub(crate) fn advance_to(&mut self, due: SimTime) -> Result<(), SimulationError> {
        if due < self.now || due.is_nan() {
            return Err(SimulationError::ClockRegression {
                clock: self.now,
                due,
            });
        }
        self.now = due;
        Ok(())
    }
}
