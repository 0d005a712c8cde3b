use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Seat-state transition broadcast to clients watching a flight.
///
/// Delivery is best-effort UX sugar: clients reconcile authoritative state via
/// the pull queries, so a dropped or reordered event is at most a transient
/// display glitch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatEvent {
    pub kind: SeatEventKind,
    pub flight_id: Uuid,
    pub seats: Vec<String>,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeatEventKind {
    SeatsLocked,
    SeatsBooked,
    SeatsReleased,
}

impl SeatEvent {
    pub fn new(kind: SeatEventKind, flight_id: Uuid, seats: Vec<String>) -> Self {
        Self {
            kind,
            flight_id,
            seats,
            at: Utc::now(),
        }
    }

    /// Topic-friendly name, also used as the SSE event name.
    pub fn kind_str(&self) -> &'static str {
        match self.kind {
            SeatEventKind::SeatsLocked => "seats_locked",
            SeatEventKind::SeatsBooked => "seats_booked",
            SeatEventKind::SeatsReleased => "seats_released",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serializes_with_snake_case_kind() {
        let event = SeatEvent::new(
            SeatEventKind::SeatsLocked,
            Uuid::new_v4(),
            vec!["1A".into(), "1B".into()],
        );
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"seats_locked\""));
        assert!(json.contains("\"1A\""));
    }
}
