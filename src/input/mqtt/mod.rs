//! MQTT input for the vision sensor's occupancy counts.
//!
//! [`MqttClient`] owns the broker connection; [`OccupancyChannel`] turns
//! messages on the occupancy topic into updates of the shared occupancy state.

mod client;
mod occupancy;

pub use client::{MqttClient, mqtt_options};
pub use occupancy::OccupancyChannel;
