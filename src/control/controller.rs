//! The tick loop.
//!
//! Owns the relay bank, the temperature source and the applied relay state.
//! Each tick snapshots occupancy, reads the temperature, evaluates the policy,
//! switches the relays if the decision differs from what is applied, and
//! emits one status record.

use super::logic::{ControlParameters, evaluate};
use super::status::{StatusRecord, StatusSink};
use crate::actuator::{ActuatorBank, ActuatorState};
use crate::occupancy::SharedOccupancy;
use crate::sensors::TemperatureSource;
use log::{debug, error, info};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

pub struct Controller<S, A, K> {
    params: ControlParameters,
    occupancy: Arc<SharedOccupancy>,
    sensor: S,
    actuators: A,
    status: K,
    /// `None` until a write to the relays has succeeded.
    applied: Option<ActuatorState>,
}

impl<S, A, K> Controller<S, A, K>
where
    S: TemperatureSource,
    A: ActuatorBank,
    K: StatusSink,
{
    /// Build the controller and drive every relay to OFF.
    ///
    /// Call this before any network setup so the zone starts in a known state.
    /// If the write fails the state stays unknown and the first tick writes
    /// OFF again.
    pub fn new(
        params: ControlParameters,
        occupancy: Arc<SharedOccupancy>,
        sensor: S,
        mut actuators: A,
        status: K,
    ) -> Self {
        let applied = match actuators.apply(ActuatorState::OFF) {
            Ok(()) => Some(ActuatorState::OFF),
            Err(e) => {
                error!("[Control] Failed to drive relays to initial OFF: {}", e);
                None
            }
        };

        Self {
            params,
            occupancy,
            sensor,
            actuators,
            status,
            applied,
        }
    }

    /// State most recently applied to the relays, if any write succeeded.
    pub fn applied(&self) -> Option<ActuatorState> {
        self.applied
    }

    /// Run one decision cycle at `now`.
    pub fn tick(&mut self, now: Instant) -> StatusRecord {
        let occupancy = self.occupancy.snapshot();
        let sample = self.sensor.read();

        // Unknown relays are treated as OFF, so a hold decision rewrites OFF.
        let current = self.applied.unwrap_or(ActuatorState::OFF);
        let decision = evaluate(&self.params, &occupancy, now, &sample, current);
        debug!(
            "[Control] count={} temp={:?} -> {:?} ({:?})",
            occupancy.count,
            sample.celsius(),
            decision.desired,
            decision.reason
        );

        if self.applied != Some(decision.desired) {
            match self.actuators.apply(decision.desired) {
                Ok(()) => {
                    info!(
                        "[Control] Relays {} -> {} ({:?})",
                        self.applied.map_or("?", |s| s.label()),
                        decision.desired.label(),
                        decision.reason
                    );
                    self.applied = Some(decision.desired);
                }
                Err(e) => {
                    // Keep the old state so the next tick retries.
                    error!("[Control] Failed to apply {}: {}", decision.desired.label(), e);
                }
            }
        }

        let record = StatusRecord {
            occupancy: occupancy.count,
            temperature: sample.celsius(),
            actuators: self.applied.unwrap_or(ActuatorState::OFF),
        };
        self.status.emit(&record);
        record
    }

    /// Tick every `interval` until `cancel` fires, then switch the relays off.
    pub async fn run(mut self, interval: Duration, cancel: CancellationToken) {
        info!("[Control] Tick loop started ({:?} interval)", interval);

        loop {
            self.tick(Instant::now());

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }

        info!("[Control] Tick loop stopped, switching relays off");
        if let Err(e) = self.actuators.apply(ActuatorState::OFF) {
            error!("[Control] Failed to switch relays off on shutdown: {}", e);
        }
    }
}
