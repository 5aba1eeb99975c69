//! Comfort policy.
//!
//! Decides the relay state from occupancy and temperature. Pure: no I/O, the
//! caller supplies the clock.
//!
//! Rules, first match wins:
//! 1. no valid temperature: keep the current state
//! 2. nobody present: OFF once the unoccupied delay has elapsed, else keep
//! 3. somebody present:
//!    - below `comfort - band`: OFF
//!    - at least `min_occupancy_on` people and above `comfort + band`: ON
//!    - at or above `comfort`: ON
//!    - otherwise keep (dead zone)

use crate::actuator::ActuatorState;
use crate::error::{ControllerError, Result};
use crate::occupancy::OccupancyState;
use crate::sensors::TemperatureSample;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Policy constants, fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlParameters {
    pub comfort_celsius: f32,
    pub hysteresis_celsius: f32,
    /// Head count that forces the relays on above the high threshold.
    pub min_occupancy_on: u32,
    /// Grace period after the zone empties before switching off.
    pub unoccupied_delay: Duration,
}

impl Default for ControlParameters {
    fn default() -> Self {
        Self {
            comfort_celsius: 20.0,
            hysteresis_celsius: 1.0,
            min_occupancy_on: 2,
            unoccupied_delay: Duration::from_secs(5 * 60),
        }
    }
}

impl ControlParameters {
    pub fn low_threshold(&self) -> f32 {
        self.comfort_celsius - self.hysteresis_celsius
    }

    pub fn high_threshold(&self) -> f32 {
        self.comfort_celsius + self.hysteresis_celsius
    }

    pub fn validate(&self) -> Result<()> {
        if !self.comfort_celsius.is_finite() {
            return Err(ControllerError::InvalidConfig(format!(
                "comfort temperature must be finite, got {}",
                self.comfort_celsius
            )));
        }
        if !self.hysteresis_celsius.is_finite() || self.hysteresis_celsius < 0.0 {
            return Err(ControllerError::InvalidConfig(format!(
                "hysteresis band must be a non-negative number, got {}",
                self.hysteresis_celsius
            )));
        }
        if self.min_occupancy_on == 0 {
            return Err(ControllerError::InvalidConfig(
                "minimum occupancy for forced on must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Which rule produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionReason {
    NoTemperature,
    UnoccupiedTimeout,
    UnoccupiedGrace,
    TooCold,
    CrowdedAndWarm,
    AtComfort,
    DeadZone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub desired: ActuatorState,
    pub reason: DecisionReason,
}

/// Evaluate the policy and report which rule fired.
pub fn evaluate(
    params: &ControlParameters,
    occupancy: &OccupancyState,
    now: Instant,
    sample: &TemperatureSample,
    current: ActuatorState,
) -> Decision {
    let keep = |reason| Decision {
        desired: current,
        reason,
    };
    let set = |on: bool, reason| Decision {
        desired: ActuatorState::from(on),
        reason,
    };

    let Some(temp) = sample.celsius() else {
        return keep(DecisionReason::NoTemperature);
    };

    if occupancy.count == 0 {
        // Never occupied counts as long past the delay.
        let expired = match occupancy.last_occupied_at {
            Some(at) => now.saturating_duration_since(at) > params.unoccupied_delay,
            None => true,
        };
        return if expired {
            set(false, DecisionReason::UnoccupiedTimeout)
        } else {
            keep(DecisionReason::UnoccupiedGrace)
        };
    }

    if temp < params.low_threshold() {
        set(false, DecisionReason::TooCold)
    } else if occupancy.count >= params.min_occupancy_on && temp > params.high_threshold() {
        set(true, DecisionReason::CrowdedAndWarm)
    } else if occupancy.count >= 1 && temp >= params.comfort_celsius {
        set(true, DecisionReason::AtComfort)
    } else {
        keep(DecisionReason::DeadZone)
    }
}

/// Next relay state for the given inputs.
pub fn decide(
    params: &ControlParameters,
    occupancy: &OccupancyState,
    now: Instant,
    sample: &TemperatureSample,
    current: ActuatorState,
) -> ActuatorState {
    evaluate(params, occupancy, now, sample, current).desired
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: Duration = Duration::from_secs(60);

    fn params() -> ControlParameters {
        ControlParameters {
            comfort_celsius: 20.0,
            hysteresis_celsius: 1.0,
            min_occupancy_on: 2,
            unoccupied_delay: 5 * MINUTE,
        }
    }

    fn occupied(count: u32, now: Instant) -> OccupancyState {
        OccupancyState {
            count,
            last_occupied_at: Some(now),
        }
    }

    fn both_states() -> [ActuatorState; 2] {
        [ActuatorState::OFF, ActuatorState::ON]
    }

    #[test]
    fn test_scenario_crowded_and_warm() {
        let now = Instant::now();
        let decision = evaluate(
            &params(),
            &occupied(3, now),
            now,
            &TemperatureSample::new(22.5),
            ActuatorState::OFF,
        );
        assert_eq!(decision.desired, ActuatorState::ON);
        assert_eq!(decision.reason, DecisionReason::CrowdedAndWarm);
    }

    #[test]
    fn test_scenario_single_person_at_comfort_boundary() {
        let now = Instant::now();
        let decision = evaluate(
            &params(),
            &occupied(1, now),
            now,
            &TemperatureSample::new(20.0),
            ActuatorState::OFF,
        );
        assert_eq!(decision.desired, ActuatorState::ON);
        assert_eq!(decision.reason, DecisionReason::AtComfort);
    }

    #[test]
    fn test_scenario_dead_zone_keeps_state() {
        let now = Instant::now();
        for current in both_states() {
            let decision = evaluate(
                &params(),
                &occupied(1, now),
                now,
                &TemperatureSample::new(19.5),
                current,
            );
            assert_eq!(decision.desired, current);
            assert_eq!(decision.reason, DecisionReason::DeadZone);
        }
    }

    #[test]
    fn test_dead_zone_lower_edge_is_not_too_cold() {
        let now = Instant::now();
        let decision = evaluate(
            &params(),
            &occupied(1, now),
            now,
            &TemperatureSample::new(19.0),
            ActuatorState::ON,
        );
        assert_eq!(decision.desired, ActuatorState::ON);
        assert_eq!(decision.reason, DecisionReason::DeadZone);
    }

    #[test]
    fn test_scenario_unoccupied_past_delay_turns_off() {
        let now = Instant::now() + 10 * MINUTE;
        let occupancy = OccupancyState {
            count: 0,
            last_occupied_at: Some(now - 6 * MINUTE),
        };
        let decision = evaluate(
            &params(),
            &occupancy,
            now,
            &TemperatureSample::new(25.0),
            ActuatorState::ON,
        );
        assert_eq!(decision.desired, ActuatorState::OFF);
        assert_eq!(decision.reason, DecisionReason::UnoccupiedTimeout);
    }

    #[test]
    fn test_scenario_unoccupied_within_delay_keeps_on() {
        let now = Instant::now() + 10 * MINUTE;
        let occupancy = OccupancyState {
            count: 0,
            last_occupied_at: Some(now - 2 * MINUTE),
        };
        let decision = evaluate(
            &params(),
            &occupancy,
            now,
            &TemperatureSample::new(25.0),
            ActuatorState::ON,
        );
        assert_eq!(decision.desired, ActuatorState::ON);
        assert_eq!(decision.reason, DecisionReason::UnoccupiedGrace);
    }

    #[test]
    fn test_unoccupied_exactly_at_delay_is_still_grace() {
        let now = Instant::now() + 10 * MINUTE;
        let occupancy = OccupancyState {
            count: 0,
            last_occupied_at: Some(now - 5 * MINUTE),
        };
        assert_eq!(
            decide(
                &params(),
                &occupancy,
                now,
                &TemperatureSample::new(25.0),
                ActuatorState::ON
            ),
            ActuatorState::ON
        );
    }

    #[test]
    fn test_grace_period_ignores_temperature() {
        let now = Instant::now() + 10 * MINUTE;
        let occupancy = OccupancyState {
            count: 0,
            last_occupied_at: Some(now - MINUTE),
        };
        for temp in [-10.0, 18.9, 19.0, 20.0, 21.5, 40.0] {
            for current in both_states() {
                assert_eq!(
                    decide(
                        &params(),
                        &occupancy,
                        now,
                        &TemperatureSample::new(temp),
                        current
                    ),
                    current,
                    "temp {} current {:?}",
                    temp,
                    current
                );
            }
        }
    }

    #[test]
    fn test_never_occupied_is_off() {
        let now = Instant::now();
        let decision = evaluate(
            &params(),
            &OccupancyState::default(),
            now,
            &TemperatureSample::new(25.0),
            ActuatorState::OFF,
        );
        assert_eq!(decision.desired, ActuatorState::OFF);
        assert_eq!(decision.reason, DecisionReason::UnoccupiedTimeout);
    }

    #[test]
    fn test_too_cold_overrides_occupancy() {
        let now = Instant::now();
        for count in [1, 2, 10, 500] {
            let decision = evaluate(
                &params(),
                &occupied(count, now),
                now,
                &TemperatureSample::new(18.9),
                ActuatorState::ON,
            );
            assert_eq!(decision.desired, ActuatorState::OFF);
            assert_eq!(decision.reason, DecisionReason::TooCold);
        }
    }

    #[test]
    fn test_crowded_above_high_threshold_forces_on() {
        let now = Instant::now();
        for count in [2, 3, 50] {
            for current in both_states() {
                assert_eq!(
                    decide(
                        &params(),
                        &occupied(count, now),
                        now,
                        &TemperatureSample::new(21.1),
                        current
                    ),
                    ActuatorState::ON
                );
            }
        }
    }

    #[test]
    fn test_high_threshold_tie_falls_through_to_comfort_rule() {
        let now = Instant::now();
        let decision = evaluate(
            &params(),
            &occupied(2, now),
            now,
            &TemperatureSample::new(21.0),
            ActuatorState::OFF,
        );
        assert_eq!(decision.desired, ActuatorState::ON);
        assert_eq!(decision.reason, DecisionReason::AtComfort);
    }

    #[test]
    fn test_invalid_temperature_keeps_state() {
        let now = Instant::now() + 10 * MINUTE;
        let stale = OccupancyState {
            count: 0,
            last_occupied_at: Some(now - 9 * MINUTE),
        };
        for occupancy in [stale, occupied(3, now)] {
            for current in both_states() {
                let decision = evaluate(
                    &params(),
                    &occupancy,
                    now,
                    &TemperatureSample::invalid(),
                    current,
                );
                assert_eq!(decision.desired, current);
                assert_eq!(decision.reason, DecisionReason::NoTemperature);
            }
        }
    }

    #[test]
    fn test_decision_is_deterministic() {
        let now = Instant::now();
        let occupancy = occupied(2, now);
        let sample = TemperatureSample::new(20.4);
        let first = evaluate(&params(), &occupancy, now, &sample, ActuatorState::OFF);
        let second = evaluate(&params(), &occupancy, now, &sample, ActuatorState::OFF);
        assert_eq!(first, second);
    }

    #[test]
    fn test_validate() {
        assert!(params().validate().is_ok());

        let mut p = params();
        p.min_occupancy_on = 0;
        assert!(p.validate().is_err());

        let mut p = params();
        p.comfort_celsius = f32::NAN;
        assert!(p.validate().is_err());

        let mut p = params();
        p.hysteresis_celsius = 0.0;
        assert!(p.validate().is_ok());
    }
}
