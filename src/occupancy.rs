//! Shared occupancy state.
//!
//! The occupancy count is written by the messaging task whenever the vision
//! sensor publishes, and read once per tick by the control loop. Both fields
//! live behind one lock so a reader always sees a count together with the
//! last-occupied time that was recorded alongside it.

use crate::error::{ControllerError, Result};
use parking_lot::Mutex;
use serde_json::Value;
use std::time::Instant;

/// Occupancy as of the most recent valid message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OccupancyState {
    pub count: u32,
    /// Arrival time of the last message with a non-zero count.
    /// `None` until the zone has been occupied at least once.
    pub last_occupied_at: Option<Instant>,
}

/// Thread-safe holder for [`OccupancyState`].
///
/// Exposes one write transaction ([`record`](Self::record)) and one read
/// transaction ([`snapshot`](Self::snapshot)).
#[derive(Debug, Default)]
pub struct SharedOccupancy {
    state: Mutex<OccupancyState>,
}

impl SharedOccupancy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new count received at `arrived_at`.
    ///
    /// The last-occupied time only moves when `count > 0`, and never moves
    /// backwards.
    pub fn record(&self, count: u32, arrived_at: Instant) {
        let mut state = self.state.lock();
        state.count = count;
        if count > 0 {
            state.last_occupied_at = Some(match state.last_occupied_at {
                Some(previous) => previous.max(arrived_at),
                None => arrived_at,
            });
        }
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> OccupancyState {
        *self.state.lock()
    }
}

/// Extract the occupancy count from a vision sensor payload.
///
/// The payload is a JSON object whose `count` field is either a non-negative
/// integer or a string holding one. Other fields are ignored.
pub fn parse_count(payload: &str) -> Result<u32> {
    let doc: Value = serde_json::from_str(payload)
        .map_err(|e| ControllerError::InvalidPayload(format!("JSON parse error: {}", e)))?;

    let field = doc
        .get("count")
        .ok_or_else(|| ControllerError::InvalidPayload("missing count field".to_string()))?;

    match field {
        Value::Number(n) => n
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| {
                ControllerError::InvalidPayload(format!("count out of range: {}", n))
            }),
        Value::String(s) => s.trim().parse::<u32>().map_err(|_| {
            ControllerError::InvalidPayload(format!("count is not an integer: {:?}", s))
        }),
        other => Err(ControllerError::InvalidPayload(format!(
            "invalid count type: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_initial_state_is_unoccupied() {
        let shared = SharedOccupancy::new();
        let state = shared.snapshot();
        assert_eq!(state.count, 0);
        assert_eq!(state.last_occupied_at, None);
    }

    #[test]
    fn test_record_positive_count_stamps_arrival() {
        let shared = SharedOccupancy::new();
        let t0 = Instant::now();

        shared.record(3, t0);
        assert_eq!(
            shared.snapshot(),
            OccupancyState {
                count: 3,
                last_occupied_at: Some(t0)
            }
        );
    }

    #[test]
    fn test_record_zero_keeps_last_occupied() {
        let shared = SharedOccupancy::new();
        let t0 = Instant::now();

        shared.record(2, t0);
        shared.record(0, t0 + Duration::from_secs(10));

        let state = shared.snapshot();
        assert_eq!(state.count, 0);
        assert_eq!(state.last_occupied_at, Some(t0));
    }

    #[test]
    fn test_last_occupied_never_decreases() {
        let shared = SharedOccupancy::new();
        let t0 = Instant::now();
        let later = t0 + Duration::from_secs(30);

        shared.record(1, later);
        shared.record(4, t0);

        let state = shared.snapshot();
        assert_eq!(state.count, 4);
        assert_eq!(state.last_occupied_at, Some(later));
    }

    #[test]
    fn test_snapshot_is_never_torn() {
        // The writer always pairs count N with base + N seconds, so every
        // consistent snapshot satisfies that relation exactly.
        let shared = Arc::new(SharedOccupancy::new());
        let base = Instant::now();

        let writer = {
            let shared = shared.clone();
            std::thread::spawn(move || {
                for count in 1..=20_000u32 {
                    shared.record(count, base + Duration::from_secs(count as u64));
                }
            })
        };

        for _ in 0..20_000 {
            let state = shared.snapshot();
            if let Some(at) = state.last_occupied_at {
                assert_eq!(at.duration_since(base).as_secs(), state.count as u64);
            }
        }

        writer.join().unwrap();
        let state = shared.snapshot();
        assert_eq!(state.count, 20_000);
        assert_eq!(
            state.last_occupied_at.map(|at| at.duration_since(base)),
            Some(Duration::from_secs(20_000))
        );
    }

    #[test]
    fn test_parse_integer_count() {
        assert_eq!(parse_count(r#"{"count": 3, "timestamp": 1718000000}"#).unwrap(), 3);
        assert_eq!(parse_count(r#"{"count": 0}"#).unwrap(), 0);
    }

    #[test]
    fn test_parse_string_count() {
        assert_eq!(parse_count(r#"{"count": "5"}"#).unwrap(), 5);
        assert_eq!(parse_count(r#"{"count": " 12 "}"#).unwrap(), 12);
    }

    #[test]
    fn test_parse_rejects_malformed_payloads() {
        let rejected = [
            "not json",
            "",
            r#"{"people": 3}"#,
            r#"{"count": -1}"#,
            r#"{"count": 2.5}"#,
            r#"{"count": "three"}"#,
            r#"{"count": "-4"}"#,
            r#"{"count": true}"#,
            r#"{"count": null}"#,
            r#"{"count": [1]}"#,
            r#"{"count": 99999999999}"#,
            "[3]",
        ];

        for payload in rejected {
            assert!(
                matches!(parse_count(payload), Err(ControllerError::InvalidPayload(_))),
                "payload {:?} should be rejected",
                payload
            );
        }
    }
}
