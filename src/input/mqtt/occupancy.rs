//! Occupancy channel: the vision sensor's people count over MQTT.
//!
//! The sensor publishes `{"count": 3, "timestamp": 1718000000}` whenever the
//! count in its zone changes (retained, QoS 1). Only `count` is used; updates
//! are stamped with their local arrival time.

use crate::error::{ControllerError, Result};
use crate::occupancy::{SharedOccupancy, parse_count};
use log::{debug, warn};
use std::sync::Arc;
use std::time::Instant;

pub struct OccupancyChannel {
    topic: String,
    occupancy: Arc<SharedOccupancy>,
}

impl OccupancyChannel {
    pub fn new(topic: impl Into<String>, occupancy: Arc<SharedOccupancy>) -> Self {
        Self {
            topic: topic.into(),
            occupancy,
        }
    }

    /// Topic to subscribe to.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Process an incoming MQTT message.
    ///
    /// Returns true if the message was for this channel. Invalid payloads are
    /// logged and leave the occupancy state untouched.
    pub fn process_message(&self, topic: &str, payload: &[u8], arrived_at: Instant) -> bool {
        if topic != self.topic {
            return false;
        }

        match self.apply_payload(payload, arrived_at) {
            Ok(count) => debug!("[MQTT] {} occupancy count: {}", self.topic, count),
            Err(e) => warn!("[MQTT] {} rejected: {}", self.topic, e),
        }
        true
    }

    fn apply_payload(&self, payload: &[u8], arrived_at: Instant) -> Result<u32> {
        let text = std::str::from_utf8(payload)
            .map_err(|e| ControllerError::InvalidPayload(format!("invalid UTF-8: {}", e)))?;
        let count = parse_count(text)?;
        self.occupancy.record(count, arrived_at);
        Ok(count)
    }
}
