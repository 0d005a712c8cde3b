use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Booked,
    Cancelled,
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BookingStatus::Booked => write!(f, "booked"),
            BookingStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "booked" => Ok(BookingStatus::Booked),
            "cancelled" => Ok(BookingStatus::Cancelled),
            other => Err(format!("unknown booking status: {}", other)),
        }
    }
}

/// Price breakdown supplied by the caller at commit time. The engine treats
/// pricing as an external pure function and only records what it is given.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub base_amount: i64,
    pub seat_fees: i64,
    pub tax: i64,
    pub total_amount: i64,
}

/// Immutable-once-created booking record. The only mutation ever applied is
/// the `booked -> cancelled` status transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub flight_id: Uuid,
    pub booker_id: String,
    pub seat_numbers: Vec<String>,
    pub status: BookingStatus,
    pub base_amount: i64,
    pub seat_fees: i64,
    pub tax: i64,
    pub total_amount: i64,
    pub payment_ref: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn seat_count(&self) -> i32 {
        self.seat_numbers.len() as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_strings() {
        assert_eq!(
            "booked".parse::<BookingStatus>().unwrap(),
            BookingStatus::Booked
        );
        assert_eq!(BookingStatus::Cancelled.to_string(), "cancelled");
        assert!("pending".parse::<BookingStatus>().is_err());
    }
}
