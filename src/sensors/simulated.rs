//! Simulated temperature source for bench runs without sensor hardware.

use super::{TemperatureSample, TemperatureSource};
use parking_lot::RwLock;
use std::sync::Arc;

/// Temperature source backed by a shared value.
///
/// Clones share the same value, so a test or a simulation task can change
/// the reading while the control loop owns another handle. `None` simulates
/// a failed read.
#[derive(Clone)]
pub struct SimulatedTemperature {
    celsius: Arc<RwLock<Option<f32>>>,
}

impl SimulatedTemperature {
    pub fn new(initial_celsius: f32) -> Self {
        Self {
            celsius: Arc::new(RwLock::new(Some(initial_celsius))),
        }
    }

    /// A source that never has a reading.
    pub fn unavailable() -> Self {
        Self {
            celsius: Arc::new(RwLock::new(None)),
        }
    }

    pub fn set_celsius(&self, celsius: f32) {
        *self.celsius.write() = Some(celsius);
    }

    pub fn set_unavailable(&self) {
        *self.celsius.write() = None;
    }
}

impl TemperatureSource for SimulatedTemperature {
    fn read(&mut self) -> TemperatureSample {
        match *self.celsius.read() {
            Some(celsius) => TemperatureSample::new(celsius),
            None => TemperatureSample::invalid(),
        }
    }
}
