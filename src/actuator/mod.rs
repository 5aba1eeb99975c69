//! Relay outputs driven by the control loop.
//!
//! The zone has two relay channels (lighting and ventilation) that always
//! switch together. Callers only deal in logical ON/OFF; the electrical
//! polarity of the relay board is handled by each bank implementation.

pub mod gpio;
pub mod simulated;

pub use gpio::GpioRelayBank;
pub use simulated::SimulatedRelayBank;

use crate::error::Result;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

/// Physical relay channels, in status-output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum ActuatorChannel {
    #[strum(serialize = "LED")]
    Light,
    #[strum(serialize = "FAN")]
    Fan,
}

/// Logical state shared by both channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActuatorState {
    pub on: bool,
}

impl ActuatorState {
    pub const OFF: Self = Self { on: false };
    pub const ON: Self = Self { on: true };

    pub fn label(&self) -> &'static str {
        if self.on { "ON" } else { "OFF" }
    }
}

impl From<bool> for ActuatorState {
    fn from(on: bool) -> Self {
        Self { on }
    }
}

/// Electrical level that energizes a relay coil.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelayPolarity {
    /// Relay closes when the pin is driven low (common on opto-isolated boards).
    ActiveLow,
    ActiveHigh,
}

impl RelayPolarity {
    pub fn from_active_low(active_low: bool) -> Self {
        if active_low {
            Self::ActiveLow
        } else {
            Self::ActiveHigh
        }
    }

    /// Pin level (`true` = high) for a logical state.
    pub fn level(&self, state: ActuatorState) -> bool {
        match self {
            Self::ActiveLow => !state.on,
            Self::ActiveHigh => state.on,
        }
    }
}

/// The coupled relay pair.
pub trait ActuatorBank: Send {
    /// Drive every channel to `state`.
    ///
    /// On error no channel may be left disagreeing with the others.
    fn apply(&mut self, state: ActuatorState) -> Result<()>;
}

impl<T: ActuatorBank + ?Sized> ActuatorBank for Box<T> {
    fn apply(&mut self, state: ActuatorState) -> Result<()> {
        (**self).apply(state)
    }
}
