use thiserror::Error;

/// Outcomes the reservation engine reports to callers.
///
/// Everything except `StoreUnavailable` is a business outcome that must be
/// surfaced verbatim and never retried automatically. `StoreUnavailable` is the
/// one transient category: a backend round trip failed and the caller may try
/// again; mutating paths fail closed when they hit it.
#[derive(Debug, Error)]
pub enum ReservationError {
    #[error("Seat {0} is held by another user")]
    SeatConflict(String),

    #[error("Seat hold expired before commit")]
    HoldExpired,

    #[error("Not enough seats available: requested {requested}, available {available}")]
    InsufficientInventory { requested: i32, available: i32 },

    #[error("Not authorized")]
    NotAuthorized,

    #[error("Booking is already cancelled")]
    AlreadyCancelled,

    #[error("Flight not found: {0}")]
    FlightNotFound(uuid::Uuid),

    #[error("Booking not found: {0}")]
    BookingNotFound(uuid::Uuid),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Backend unavailable: {0}")]
    StoreUnavailable(String),
}

impl ReservationError {
    /// True for the transient category callers are allowed to retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ReservationError::StoreUnavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_store_unavailable_is_retryable() {
        assert!(ReservationError::StoreUnavailable("redis down".into()).is_retryable());
        assert!(!ReservationError::SeatConflict("1A".into()).is_retryable());
        assert!(!ReservationError::HoldExpired.is_retryable());
        assert!(!ReservationError::AlreadyCancelled.is_retryable());
    }

    #[test]
    fn conflict_names_the_seat() {
        let err = ReservationError::SeatConflict("12C".into());
        assert!(err.to_string().contains("12C"));
    }
}
