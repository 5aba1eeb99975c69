//! Relay bank on Linux sysfs GPIO value files.
//!
//! Each channel is a `/sys/class/gpio/gpioN/value` file already exported
//! and configured as an output. Writing `0`/`1` sets the pin level.

use super::{ActuatorBank, ActuatorChannel, ActuatorState, RelayPolarity};
use crate::error::{ControllerError, Result};
use log::{error, info};
use std::fs;
use std::path::PathBuf;

pub struct GpioRelayBank {
    light: PathBuf,
    fan: PathBuf,
    polarity: RelayPolarity,
    /// Last state both pins were successfully driven to.
    applied: Option<ActuatorState>,
}

impl GpioRelayBank {
    pub fn new(light: impl Into<PathBuf>, fan: impl Into<PathBuf>, polarity: RelayPolarity) -> Self {
        Self {
            light: light.into(),
            fan: fan.into(),
            polarity,
            applied: None,
        }
    }

    fn write_level(&self, channel: ActuatorChannel, state: ActuatorState) -> Result<()> {
        let path = match channel {
            ActuatorChannel::Light => &self.light,
            ActuatorChannel::Fan => &self.fan,
        };
        let level = if self.polarity.level(state) { "1" } else { "0" };
        fs::write(path, level).map_err(|e| ControllerError::ActuatorWrite {
            channel: channel.to_string(),
            reason: format!("{}: {}", path.display(), e),
        })
    }
}

impl ActuatorBank for GpioRelayBank {
    fn apply(&mut self, state: ActuatorState) -> Result<()> {
        self.write_level(ActuatorChannel::Light, state)?;

        if let Err(e) = self.write_level(ActuatorChannel::Fan, state) {
            // Put channel 1 back so the pair still agrees. With nothing
            // applied yet the only safe level is OFF.
            let previous = self.applied.unwrap_or(ActuatorState::OFF);
            if let Err(rollback) = self.write_level(ActuatorChannel::Light, previous) {
                error!("[Relay] Failed to restore LED channel: {}", rollback);
            }
            return Err(e);
        }

        self.applied = Some(state);
        info!(
            "[Relay] LED={} FAN={} ({:?})",
            state.label(),
            state.label(),
            self.polarity
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::scratch_dir;
    use std::path::Path;

    fn read(path: &Path) -> String {
        fs::read_to_string(path).unwrap()
    }

    #[test]
    fn test_active_low_levels() {
        let dir = scratch_dir("gpio_active_low");
        let light = dir.join("gpio26");
        let fan = dir.join("gpio27");

        let mut bank = GpioRelayBank::new(&light, &fan, RelayPolarity::ActiveLow);

        bank.apply(ActuatorState::OFF).unwrap();
        assert_eq!(read(&light), "1");
        assert_eq!(read(&fan), "1");

        bank.apply(ActuatorState::ON).unwrap();
        assert_eq!(read(&light), "0");
        assert_eq!(read(&fan), "0");
    }

    #[test]
    fn test_active_high_levels() {
        let dir = scratch_dir("gpio_active_high");
        let light = dir.join("gpio26");
        let fan = dir.join("gpio27");

        let mut bank = GpioRelayBank::new(&light, &fan, RelayPolarity::ActiveHigh);
        bank.apply(ActuatorState::ON).unwrap();
        assert_eq!(read(&light), "1");
        assert_eq!(read(&fan), "1");
    }

    #[test]
    fn test_failed_second_channel_restores_first() {
        let dir = scratch_dir("gpio_rollback");
        let light = dir.join("gpio26");
        // Fan path points into a directory that does not exist.
        let fan = dir.join("missing").join("gpio27");

        let mut bank = GpioRelayBank::new(&light, &fan, RelayPolarity::ActiveLow);
        let err = bank.apply(ActuatorState::ON).unwrap_err();

        assert!(matches!(
            err,
            ControllerError::ActuatorWrite { ref channel, .. } if channel == "FAN"
        ));
        // Back to logical OFF (high for active-low).
        assert_eq!(read(&light), "1");
    }

    #[test]
    fn test_failed_initial_off_leaves_light_off() {
        let dir = scratch_dir("gpio_initial_off");
        let light = dir.join("gpio26");
        let fan = dir.join("missing").join("gpio27");

        let mut bank = GpioRelayBank::new(&light, &fan, RelayPolarity::ActiveLow);
        assert!(bank.apply(ActuatorState::OFF).is_err());
        assert_eq!(read(&light), "1");

        // A second failure still never energizes the light.
        assert!(bank.apply(ActuatorState::OFF).is_err());
        assert_eq!(read(&light), "1");
    }

    #[test]
    fn test_rollback_restores_last_applied_state() {
        let dir = scratch_dir("gpio_rollback_applied");
        let light = dir.join("gpio26");
        let fan_dir = dir.join("fan");
        fs::create_dir_all(&fan_dir).unwrap();
        let fan = fan_dir.join("gpio27");

        let mut bank = GpioRelayBank::new(&light, &fan, RelayPolarity::ActiveHigh);
        bank.apply(ActuatorState::ON).unwrap();

        fs::remove_dir_all(&fan_dir).unwrap();
        assert!(bank.apply(ActuatorState::OFF).is_err());
        assert_eq!(read(&light), "1");
    }
}
