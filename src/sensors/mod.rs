//! Temperature sources for the control loop.
//!
//! A source is polled once per tick and answers with a [`TemperatureSample`].
//! Failures are not errors from the loop's point of view: the sample is
//! simply marked invalid and that tick's decision is skipped.

pub mod iio;
pub mod simulated;

pub use iio::IioTemperatureSensor;
pub use simulated::SimulatedTemperature;

/// One temperature reading, produced fresh each tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureSample {
    pub celsius: f32,
    pub valid: bool,
}

impl TemperatureSample {
    pub fn new(celsius: f32) -> Self {
        if celsius.is_finite() {
            Self {
                celsius,
                valid: true,
            }
        } else {
            Self::invalid()
        }
    }

    /// Marker for "no reading this tick".
    pub fn invalid() -> Self {
        Self {
            celsius: f32::NAN,
            valid: false,
        }
    }

    /// The reading, if there is one.
    pub fn celsius(&self) -> Option<f32> {
        self.valid.then_some(self.celsius)
    }
}

/// Anything the control loop can poll for a temperature.
pub trait TemperatureSource: Send {
    /// Take one reading. Must not block beyond the tick budget.
    fn read(&mut self) -> TemperatureSample;
}

impl<T: TemperatureSource + ?Sized> TemperatureSource for Box<T> {
    fn read(&mut self) -> TemperatureSample {
        (**self).read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finite_value_is_valid() {
        let sample = TemperatureSample::new(21.4);
        assert!(sample.valid);
        assert_eq!(sample.celsius(), Some(21.4));
    }

    #[test]
    fn test_non_finite_value_is_invalid() {
        assert!(!TemperatureSample::new(f32::NAN).valid);
        assert!(!TemperatureSample::new(f32::INFINITY).valid);
        assert_eq!(TemperatureSample::invalid().celsius(), None);
    }
}
