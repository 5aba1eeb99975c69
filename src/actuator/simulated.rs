//! Relay bank without hardware.
//!
//! Logs every switch so a bench run shows what the control loop applied.

use super::{ActuatorBank, ActuatorState};
use crate::error::Result;
use log::info;

#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedRelayBank;

impl SimulatedRelayBank {
    pub fn new() -> Self {
        Self
    }
}

impl ActuatorBank for SimulatedRelayBank {
    fn apply(&mut self, state: ActuatorState) -> Result<()> {
        info!("[Relay] (simulated) LED={} FAN={}", state.label(), state.label());
        Ok(())
    }
}
