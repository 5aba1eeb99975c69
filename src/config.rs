use crate::control::ControlParameters;
use crate::error::{ControllerError, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Load environment variables from a `.env` file in the working directory.
///
/// Variables already present in the environment take precedence.
pub fn load_dotenv() {
    let env_path = Path::new(".env");
    if !env_path.exists() {
        return;
    }

    let content = match fs::read_to_string(env_path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read .env: {}", e);
            return;
        }
    };

    for (key, value) in content.lines().filter_map(parse_dotenv_line) {
        if std::env::var(key).is_err() {
            // SAFETY: called from main before the runtime spawns any other thread
            unsafe { std::env::set_var(key, value) };
        }
    }
}

/// Split one `.env` line into key and value.
///
/// Blank lines and `#` comments yield `None`. Values may contain spaces and
/// may be wrapped in single or double quotes.
fn parse_dotenv_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    let mut value = value.trim();
    if key.is_empty() {
        return None;
    }

    if value.len() >= 2
        && ((value.starts_with('"') && value.ends_with('"'))
            || (value.starts_with('\'') && value.ends_with('\'')))
    {
        value = &value[1..value.len() - 1];
    }

    Some((key, value))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub mqtt: MqttConfig,
    pub control: ControlParameters,
    pub tick_interval: Duration,
    pub sensor: SensorConfig,
    pub relays: RelayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttConfig {
    pub broker_host: String,
    pub broker_port: u16,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Topic the vision sensor publishes occupancy counts on.
    pub topic: String,
    pub keep_alive: Duration,
    /// Fixed backoff between connection attempts.
    pub retry_delay: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Sysfs file holding the raw temperature. `None` selects the simulated source.
    pub path: Option<PathBuf>,
    /// Raw value divisor (1000 for millidegrees).
    pub divisor: f32,
    pub simulated_celsius: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// GPIO value file for the lighting relay (channel 1).
    pub led_gpio: Option<PathBuf>,
    /// GPIO value file for the ventilation relay (channel 2).
    pub fan_gpio: Option<PathBuf>,
    pub active_low: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mqtt: MqttConfig {
                broker_host: "localhost".to_string(),
                broker_port: 1883,
                client_id: "ESP32-energy".to_string(),
                username: None,
                password: None,
                topic: "vision/zone1".to_string(),
                keep_alive: Duration::from_secs(60),
                retry_delay: Duration::from_millis(2000),
            },
            control: ControlParameters::default(),
            tick_interval: Duration::from_millis(1500),
            sensor: SensorConfig {
                path: None,
                divisor: 1000.0,
                simulated_celsius: 20.0,
            },
            relays: RelayConfig {
                led_gpio: None,
                fan_gpio: None,
                active_low: true,
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Overlay values from `lookup` on the defaults.
    ///
    /// Values that fail to parse are reported and the default is kept.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        // MQTT
        if let Some(host) = lookup("MQTT_BROKER_HOST") {
            config.mqtt.broker_host = host;
        }
        if let Some(port) = parsed(&lookup, "MQTT_BROKER_PORT") {
            config.mqtt.broker_port = port;
        }
        if let Some(client_id) = lookup("MQTT_CLIENT_ID") {
            config.mqtt.client_id = client_id;
        }
        if let Some(username) = lookup("MQTT_USERNAME") {
            config.mqtt.username = Some(username);
        }
        if let Some(password) = lookup("MQTT_PASSWORD") {
            config.mqtt.password = Some(password);
        }
        if let Some(topic) = lookup("MQTT_TOPIC") {
            config.mqtt.topic = topic;
        }
        if let Some(secs) = parsed(&lookup, "MQTT_KEEP_ALIVE_SECS") {
            config.mqtt.keep_alive = Duration::from_secs(secs);
        }
        if let Some(ms) = parsed(&lookup, "MQTT_RETRY_DELAY_MS") {
            config.mqtt.retry_delay = Duration::from_millis(ms);
        }

        // Control policy
        if let Some(comfort) = parsed(&lookup, "COMFORT_TEMP_C") {
            config.control.comfort_celsius = comfort;
        }
        if let Some(band) = parsed(&lookup, "TEMP_HYSTERESIS_C") {
            config.control.hysteresis_celsius = band;
        }
        if let Some(min) = parsed(&lookup, "MIN_OCCUPANCY_ON") {
            config.control.min_occupancy_on = min;
        }
        if let Some(secs) = parsed(&lookup, "UNOCCUPIED_DELAY_SECS") {
            config.control.unoccupied_delay = Duration::from_secs(secs);
        }
        if let Some(ms) = parsed(&lookup, "TICK_INTERVAL_MS") {
            config.tick_interval = Duration::from_millis(ms);
        }

        // Hardware
        if let Some(path) = lookup("TEMP_SENSOR_PATH") {
            config.sensor.path = Some(PathBuf::from(path));
        }
        if let Some(divisor) = parsed(&lookup, "TEMP_SENSOR_DIVISOR") {
            config.sensor.divisor = divisor;
        }
        if let Some(celsius) = parsed(&lookup, "SIMULATED_TEMP_C") {
            config.sensor.simulated_celsius = celsius;
        }
        if let Some(path) = lookup("RELAY_LED_GPIO") {
            config.relays.led_gpio = Some(PathBuf::from(path));
        }
        if let Some(path) = lookup("RELAY_FAN_GPIO") {
            config.relays.fan_gpio = Some(PathBuf::from(path));
        }
        if let Some(active_low) = parsed(&lookup, "RELAY_ACTIVE_LOW") {
            config.relays.active_low = active_low;
        }

        config
    }

    /// Reject settings the control loop cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.control.validate()?;

        if self.tick_interval.is_zero() {
            return Err(ControllerError::InvalidConfig(
                "tick interval must be greater than zero".to_string(),
            ));
        }
        if self.mqtt.topic.trim().is_empty() {
            return Err(ControllerError::InvalidConfig(
                "MQTT topic must not be empty".to_string(),
            ));
        }
        if self.mqtt.keep_alive < Duration::from_secs(5) {
            return Err(ControllerError::InvalidConfig(format!(
                "MQTT keep-alive must be at least 5 seconds, got {:?}",
                self.mqtt.keep_alive
            )));
        }
        if !self.sensor.divisor.is_finite() || self.sensor.divisor == 0.0 {
            return Err(ControllerError::InvalidConfig(format!(
                "temperature divisor must be finite and non-zero, got {}",
                self.sensor.divisor
            )));
        }
        if self.relays.led_gpio.is_some() != self.relays.fan_gpio.is_some() {
            return Err(ControllerError::InvalidConfig(
                "RELAY_LED_GPIO and RELAY_FAN_GPIO must be set together".to_string(),
            ));
        }

        Ok(())
    }
}

fn parsed<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring unparseable value for {}: {:?}", key, raw);
            None
        }
    }
}
