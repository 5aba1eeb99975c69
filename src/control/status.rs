//! Per-tick status line.
//!
//! Downstream log consumers parse this exact layout:
//!
//! ```text
//! People=3 | Temp=22.5 | LED=ON | FAN=ON
//! ```

use crate::actuator::{ActuatorChannel, ActuatorState};
use log::debug;
use std::fmt;
use std::io::Write;
use strum::IntoEnumIterator;

/// Shown in place of the temperature when the sensor had no reading.
pub const NO_READING: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusRecord {
    pub occupancy: u32,
    pub temperature: Option<f32>,
    pub actuators: ActuatorState,
}

impl fmt::Display for StatusRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "People={}", self.occupancy)?;
        match self.temperature {
            Some(t) => write!(f, " | Temp={:.1}", t)?,
            None => write!(f, " | Temp={}", NO_READING)?,
        }
        // Both channels mirror the shared state.
        for channel in ActuatorChannel::iter() {
            write!(f, " | {}={}", channel, self.actuators.label())?;
        }
        Ok(())
    }
}

/// Destination for status records.
pub trait StatusSink: Send {
    fn emit(&mut self, record: &StatusRecord);
}

/// Writes each record as one line on stdout.
#[derive(Debug, Default)]
pub struct StdoutStatusSink;

impl StatusSink for StdoutStatusSink {
    fn emit(&mut self, record: &StatusRecord) {
        let mut out = std::io::stdout().lock();
        if let Err(e) = writeln!(out, "{}", record).and_then(|_| out.flush()) {
            debug!("[Control] Failed to write status line: {}", e);
        }
    }
}
