use async_trait::async_trait;
use std::time::Duration;
use uuid::Uuid;

use crate::booking::{Booking, PriceBreakdown};
use crate::error::ReservationError;
use crate::flight::{Flight, NewFlight};
use crate::lock::AcquireOutcome;

/// Shared TTL-capable store of ephemeral seat ownership.
///
/// The store is externally synchronized: `acquire_all` and `release_all` must
/// be indivisible with respect to every other call touching the same keys, so
/// the engine never layers check-then-set on top. Entries expire autonomously
/// after their TTL with no sweeping required from the application.
#[async_trait]
pub trait LockStore: Send + Sync {
    /// Current holder of one seat, if any.
    async fn get(
        &self,
        flight_id: Uuid,
        seat_number: &str,
    ) -> Result<Option<String>, ReservationError>;

    /// Acquire every seat for `holder` with a fresh TTL, or change nothing.
    /// A seat already held by `holder` counts as free (idempotent re-hold).
    async fn acquire_all(
        &self,
        flight_id: Uuid,
        seat_numbers: &[String],
        holder: &str,
        ttl: Duration,
    ) -> Result<AcquireOutcome, ReservationError>;

    /// Delete the entries currently owned by `holder` and report how many
    /// were removed. Entries held by someone else (or already expired) are
    /// left untouched; this is never an error.
    async fn release_all(
        &self,
        flight_id: Uuid,
        seat_numbers: &[String],
        holder: &str,
    ) -> Result<u64, ReservationError>;

    /// Seats of this flight with a live lock, holder identity not included.
    async fn current_locks(&self, flight_id: Uuid) -> Result<Vec<String>, ReservationError>;
}

/// Durable seat-count and booking-record store.
///
/// The `available_seats` counter is authoritative at commit time and may only
/// move through conditional updates; implementations must reject a decrement
/// that would oversell rather than apply it partially.
#[async_trait]
pub trait InventoryLedger: Send + Sync {
    async fn create_flight(&self, flight: NewFlight) -> Result<Flight, ReservationError>;

    async fn get_flight(&self, flight_id: Uuid) -> Result<Flight, ReservationError>;

    /// Atomic unit: decrement `available_seats` by the seat count and persist
    /// a `booked` booking. No state is mutated on any precondition failure.
    async fn commit_booking(
        &self,
        flight_id: Uuid,
        seat_numbers: &[String],
        booker_id: &str,
        price: PriceBreakdown,
        payment_ref: &str,
    ) -> Result<Booking, ReservationError>;

    /// Conditional `booked -> cancelled` transition plus the matching seat
    /// restoration, exactly once per booking. `requester` must own the booking
    /// unless `privileged` is set.
    async fn cancel_booking(
        &self,
        booking_id: Uuid,
        requester: &str,
        privileged: bool,
    ) -> Result<Booking, ReservationError>;

    async fn get_booking(&self, booking_id: Uuid) -> Result<Booking, ReservationError>;

    /// Union of seat sets across `booked`-status bookings of the flight.
    async fn occupied_seats(&self, flight_id: Uuid) -> Result<Vec<String>, ReservationError>;

    async fn bookings_for_user(&self, booker_id: &str) -> Result<Vec<Booking>, ReservationError>;
}
