//! Temperature from a Linux sysfs attribute.
//!
//! Kernel drivers for DHT11/DHT22 (IIO) and most hwmon chips expose the
//! temperature as an integer in millidegrees Celsius, e.g.
//! `/sys/bus/iio/devices/iio:device0/in_temp_input`. The DHT driver returns
//! an I/O error when the sensor misses its timing window, which is reported
//! as an invalid sample.

use super::{TemperatureSample, TemperatureSource};
use crate::error::{ControllerError, Result};
use log::debug;
use std::fs;
use std::path::PathBuf;

/// Sysfs-backed temperature sensor.
pub struct IioTemperatureSensor {
    path: PathBuf,
    divisor: f32,
}

impl IioTemperatureSensor {
    /// Create a sensor reading `path`, dividing the raw integer by `divisor`.
    pub fn new(path: impl Into<PathBuf>, divisor: f32) -> Self {
        Self {
            path: path.into(),
            divisor,
        }
    }

    fn read_celsius(&self) -> Result<f32> {
        let raw = fs::read_to_string(&self.path)?;
        let value: f32 = raw.trim().parse().map_err(|_| {
            ControllerError::SensorRead(format!(
                "unparseable value {:?} in {}",
                raw.trim(),
                self.path.display()
            ))
        })?;
        Ok(value / self.divisor)
    }
}

impl TemperatureSource for IioTemperatureSensor {
    fn read(&mut self) -> TemperatureSample {
        match self.read_celsius() {
            Ok(celsius) => TemperatureSample::new(celsius),
            Err(e) => {
                debug!("[Sensor] {}: {}", self.path.display(), e);
                TemperatureSample::invalid()
            }
        }
    }
}
