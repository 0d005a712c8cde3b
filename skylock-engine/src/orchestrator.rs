use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use skylock_domain::booking::{Booking, PriceBreakdown};
use skylock_domain::error::ReservationError;
use skylock_domain::events::{SeatEvent, SeatEventKind};
use skylock_domain::flight::Flight;
use skylock_domain::ledger::{InventoryLedger, LockStore};
use skylock_domain::lock::AcquireOutcome;
use skylock_store::app_config::BusinessRules;
use skylock_store::events::{TOPIC_CANCELLED, TOPIC_COMMITTED, TOPIC_HOLDS};
use skylock_store::EventProducer;

use crate::manager::LockManager;
use crate::notifier::Notifier;

/// Where a seat-set attempt ended up. Terminal states are reported to the
/// caller; `Held` is the only state with a pending follow-up (payment, then
/// commit or TTL expiry).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    Held,
    Committed,
    Expired,
    Released,
    Conflicted,
}

impl AttemptState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptState::Held => "HELD",
            AttemptState::Committed => "COMMITTED",
            AttemptState::Expired => "EXPIRED",
            AttemptState::Released => "RELEASED",
            AttemptState::Conflicted => "CONFLICTED",
        }
    }
}

/// Successful hold: all seats are locked for the holder until `expires_at`
/// unless committed or released first.
#[derive(Debug, Clone)]
pub struct HoldGrant {
    pub flight_id: Uuid,
    pub seat_numbers: Vec<String>,
    pub expires_at: DateTime<Utc>,
}

/// Sequences the lock manager, ledger and notifier for each reservation
/// use case, with compensating behavior on failure: a failed commit leaves
/// the locks in place (the TTL is the backstop), a successful commit releases
/// them, and transitions are broadcast only after the store operation that
/// made them true has returned.
pub struct ReservationOrchestrator {
    locks: LockManager,
    ledger: Arc<dyn InventoryLedger>,
    notifier: Arc<Notifier>,
    telemetry: Option<Arc<EventProducer>>,
}

impl ReservationOrchestrator {
    pub fn new(
        lock_store: Arc<dyn LockStore>,
        ledger: Arc<dyn InventoryLedger>,
        notifier: Arc<Notifier>,
        telemetry: Option<Arc<EventProducer>>,
        rules: BusinessRules,
    ) -> Self {
        Self {
            locks: LockManager::new(lock_store, rules),
            ledger,
            notifier,
            telemetry,
        }
    }

    /// `Requested -> Held | Conflicted`. All seats or none; a conflict names a
    /// seat the caller did not get and is terminal for the attempt.
    pub async fn hold_seats(
        &self,
        flight_id: Uuid,
        seat_numbers: &[String],
        holder: &str,
        ttl_seconds: Option<u64>,
    ) -> Result<HoldGrant, ReservationError> {
        // Flight existence is a precondition for holds.
        self.ledger.get_flight(flight_id).await?;
        let seats = crate::manager::normalize_seats(seat_numbers)?;

        match self
            .locks
            .try_hold(flight_id, &seats, holder, ttl_seconds)
            .await?
        {
            AcquireOutcome::Acquired { expires_at } => {
                let event = SeatEvent::new(SeatEventKind::SeatsLocked, flight_id, seats.clone());
                self.broadcast(event, TOPIC_HOLDS).await;

                info!(%flight_id, holder, state = AttemptState::Held.as_str(), "seats held");
                Ok(HoldGrant {
                    flight_id,
                    seat_numbers: seats,
                    expires_at,
                })
            }
            AcquireOutcome::Conflict { seat } => {
                info!(%flight_id, holder, seat, state = AttemptState::Conflicted.as_str(), "hold conflicted");
                Err(ReservationError::SeatConflict(seat))
            }
        }
    }

    /// `Held -> Released`: explicit abandon before commit. Watchers are only
    /// told about seats that were actually freed; a no-op release (nothing
    /// owned by the caller) stays silent.
    pub async fn release_seats(
        &self,
        flight_id: Uuid,
        seat_numbers: &[String],
        holder: &str,
    ) -> Result<(), ReservationError> {
        let seats = crate::manager::normalize_seats(seat_numbers)?;
        let released = self.locks.release(flight_id, &seats, holder).await?;

        if released > 0 {
            let event = SeatEvent::new(SeatEventKind::SeatsReleased, flight_id, seats);
            self.broadcast(event, TOPIC_HOLDS).await;
        }

        info!(%flight_id, holder, released, state = AttemptState::Released.as_str(), "seats released");
        Ok(())
    }

    /// `PaymentPending -> Committed | Expired | Conflicted`.
    ///
    /// Ownership of every seat is re-validated right before the ledger commit
    /// because TTL expiry is uncoordinated with the payment flow. A lapsed
    /// hold is `HoldExpired` and terminal — we never silently re-acquire.
    pub async fn commit_booking(
        &self,
        flight_id: Uuid,
        seat_numbers: &[String],
        booker_id: &str,
        price: PriceBreakdown,
        payment_ref: &str,
    ) -> Result<Booking, ReservationError> {
        if payment_ref.trim().is_empty() {
            return Err(ReservationError::InvalidRequest(
                "a payment reference is required".into(),
            ));
        }
        let seats = crate::manager::normalize_seats(seat_numbers)?;

        if let Err(e) = self.locks.holds_all(flight_id, &seats, booker_id).await {
            if matches!(e, ReservationError::HoldExpired) {
                info!(%flight_id, booker_id, state = AttemptState::Expired.as_str(), "hold lapsed before commit");
            }
            return Err(e);
        }

        let booking = self
            .ledger
            .commit_booking(flight_id, &seats, booker_id, price, payment_ref)
            .await?;

        // The booking is durable; a failed release just means the locks age
        // out by TTL.
        if let Err(e) = self.locks.release(flight_id, &seats, booker_id).await {
            warn!(%flight_id, "failed to release locks after commit: {}", e);
        }

        let event = SeatEvent::new(SeatEventKind::SeatsBooked, flight_id, seats);
        self.broadcast(event, TOPIC_COMMITTED).await;

        info!(booking_id = %booking.id, %flight_id, state = AttemptState::Committed.as_str(), "booking committed");
        Ok(booking)
    }

    /// Reverses the ledger effect of a commit and frees the seats for sale.
    pub async fn cancel_booking(
        &self,
        booking_id: Uuid,
        requester: &str,
        privileged: bool,
    ) -> Result<Booking, ReservationError> {
        let booking = self
            .ledger
            .cancel_booking(booking_id, requester, privileged)
            .await?;

        let event = SeatEvent::new(
            SeatEventKind::SeatsReleased,
            booking.flight_id,
            booking.seat_numbers.clone(),
        );
        self.broadcast(event, TOPIC_CANCELLED).await;

        Ok(booking)
    }

    /// Seats currently under a live hold (pull-side reconciliation).
    pub async fn current_locks(&self, flight_id: Uuid) -> Result<Vec<String>, ReservationError> {
        self.locks.current_locks(flight_id).await
    }

    /// Seats claimed by booked (not merely held) bookings.
    pub async fn occupied_seats(&self, flight_id: Uuid) -> Result<Vec<String>, ReservationError> {
        self.ledger.occupied_seats(flight_id).await
    }

    pub async fn get_flight(&self, flight_id: Uuid) -> Result<Flight, ReservationError> {
        self.ledger.get_flight(flight_id).await
    }

    pub async fn get_booking(&self, booking_id: Uuid) -> Result<Booking, ReservationError> {
        self.ledger.get_booking(booking_id).await
    }

    pub async fn bookings_for_user(
        &self,
        booker_id: &str,
    ) -> Result<Vec<Booking>, ReservationError> {
        self.ledger.bookings_for_user(booker_id).await
    }

    pub fn subscribe(&self, flight_id: Uuid) -> tokio::sync::broadcast::Receiver<SeatEvent> {
        self.notifier.subscribe(flight_id)
    }

    pub fn ledger(&self) -> &Arc<dyn InventoryLedger> {
        &self.ledger
    }

    async fn broadcast(&self, event: SeatEvent, topic: &str) {
        if let Some(telemetry) = &self.telemetry {
            telemetry.publish_seat_event(topic, &event).await;
        }
        self.notifier.publish(event);
    }
}
