//! Zone controller library.
//!
//! Switches a coupled lighting/ventilation relay pair for one zone from a
//! people count received over MQTT and a local temperature sensor.

pub mod actuator;
pub mod config;
pub mod control;
pub mod error;
pub mod input;
pub mod instance_lock;
pub mod occupancy;
pub mod sensors;

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::PathBuf;

    /// Fresh, empty directory for one test.
    pub fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "zone-controller-{}-{}",
            std::process::id(),
            name
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }
}
