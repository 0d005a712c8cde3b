use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use uuid::Uuid;

use skylock_domain::booking::{Booking, BookingStatus, PriceBreakdown};
use skylock_domain::error::ReservationError;
use skylock_domain::flight::{Flight, NewFlight};
use skylock_domain::ledger::{InventoryLedger, LockStore};
use skylock_domain::lock::{expiry_from_ttl, AcquireOutcome};

/// In-memory lock store with the same atomicity contract as the Redis one:
/// every multi-key operation happens under a single mutex acquisition, and
/// entries expire lazily by deadline. Backs the engine's unit tests and local
/// runs without a Redis.
#[derive(Default)]
pub struct MemoryLockStore {
    locks: Mutex<HashMap<(Uuid, String), LockEntry>>,
}

struct LockEntry {
    holder: String,
    expires_at: Instant,
}

impl LockEntry {
    fn live(&self) -> bool {
        self.expires_at > Instant::now()
    }
}

impl MemoryLockStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LockStore for MemoryLockStore {
    async fn get(
        &self,
        flight_id: Uuid,
        seat_number: &str,
    ) -> Result<Option<String>, ReservationError> {
        let locks = self.locks.lock().unwrap();
        Ok(locks
            .get(&(flight_id, seat_number.to_string()))
            .filter(|e| e.live())
            .map(|e| e.holder.clone()))
    }

    async fn acquire_all(
        &self,
        flight_id: Uuid,
        seat_numbers: &[String],
        holder: &str,
        ttl: Duration,
    ) -> Result<AcquireOutcome, ReservationError> {
        let mut locks = self.locks.lock().unwrap();

        for seat in seat_numbers {
            if let Some(entry) = locks.get(&(flight_id, seat.clone())) {
                if entry.live() && entry.holder != holder {
                    return Ok(AcquireOutcome::Conflict { seat: seat.clone() });
                }
            }
        }

        let deadline = Instant::now() + ttl;
        for seat in seat_numbers {
            locks.insert(
                (flight_id, seat.clone()),
                LockEntry {
                    holder: holder.to_string(),
                    expires_at: deadline,
                },
            );
        }

        Ok(AcquireOutcome::Acquired {
            expires_at: expiry_from_ttl(ttl),
        })
    }

    async fn release_all(
        &self,
        flight_id: Uuid,
        seat_numbers: &[String],
        holder: &str,
    ) -> Result<u64, ReservationError> {
        let mut locks = self.locks.lock().unwrap();
        let mut released = 0;
        for seat in seat_numbers {
            let key = (flight_id, seat.clone());
            if locks.get(&key).is_some_and(|e| e.holder == holder && e.live()) {
                locks.remove(&key);
                released += 1;
            }
        }
        Ok(released)
    }

    async fn current_locks(&self, flight_id: Uuid) -> Result<Vec<String>, ReservationError> {
        let locks = self.locks.lock().unwrap();
        let mut seats: Vec<String> = locks
            .iter()
            .filter(|((f, _), entry)| *f == flight_id && entry.live())
            .map(|((_, seat), _)| seat.clone())
            .collect();
        seats.sort();
        Ok(seats)
    }
}

/// In-memory ledger with the conditional-update semantics of the Postgres
/// implementation: the counter guard and the status transition are checked
/// and applied under one mutex acquisition.
#[derive(Default)]
pub struct MemoryLedger {
    inner: Mutex<LedgerInner>,
}

#[derive(Default)]
struct LedgerInner {
    flights: HashMap<Uuid, Flight>,
    bookings: HashMap<Uuid, Booking>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InventoryLedger for MemoryLedger {
    async fn create_flight(&self, flight: NewFlight) -> Result<Flight, ReservationError> {
        if flight.total_seats < 1 {
            return Err(ReservationError::InvalidRequest(
                "total_seats must be at least 1".into(),
            ));
        }

        let record = Flight {
            id: Uuid::new_v4(),
            flight_number: flight.flight_number,
            airline: flight.airline,
            origin: flight.origin,
            destination: flight.destination,
            departure_time: flight.departure_time,
            arrival_time: flight.arrival_time,
            price_per_seat: flight.price_per_seat,
            total_seats: flight.total_seats,
            available_seats: flight.total_seats,
            created_at: Utc::now(),
        };

        let mut inner = self.inner.lock().unwrap();
        inner.flights.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_flight(&self, flight_id: Uuid) -> Result<Flight, ReservationError> {
        let inner = self.inner.lock().unwrap();
        inner
            .flights
            .get(&flight_id)
            .cloned()
            .ok_or(ReservationError::FlightNotFound(flight_id))
    }

    async fn commit_booking(
        &self,
        flight_id: Uuid,
        seat_numbers: &[String],
        booker_id: &str,
        price: PriceBreakdown,
        payment_ref: &str,
    ) -> Result<Booking, ReservationError> {
        let requested = seat_numbers.len() as i32;
        let mut inner = self.inner.lock().unwrap();

        let flight = inner
            .flights
            .get_mut(&flight_id)
            .ok_or(ReservationError::FlightNotFound(flight_id))?;

        if flight.available_seats < requested {
            return Err(ReservationError::InsufficientInventory {
                requested,
                available: flight.available_seats,
            });
        }
        flight.available_seats -= requested;

        let now = Utc::now();
        let booking = Booking {
            id: Uuid::new_v4(),
            flight_id,
            booker_id: booker_id.to_string(),
            seat_numbers: seat_numbers.to_vec(),
            status: BookingStatus::Booked,
            base_amount: price.base_amount,
            seat_fees: price.seat_fees,
            tax: price.tax,
            total_amount: price.total_amount,
            payment_ref: payment_ref.to_string(),
            created_at: now,
            updated_at: now,
        };
        inner.bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    async fn cancel_booking(
        &self,
        booking_id: Uuid,
        requester: &str,
        privileged: bool,
    ) -> Result<Booking, ReservationError> {
        let mut inner = self.inner.lock().unwrap();

        let (flight_id, seat_count) = {
            let booking = inner
                .bookings
                .get(&booking_id)
                .ok_or(ReservationError::BookingNotFound(booking_id))?;

            if booking.booker_id != requester && !privileged {
                return Err(ReservationError::NotAuthorized);
            }
            if booking.status != BookingStatus::Booked {
                return Err(ReservationError::AlreadyCancelled);
            }
            (booking.flight_id, booking.seat_count())
        };

        if let Some(flight) = inner.flights.get_mut(&flight_id) {
            flight.available_seats = (flight.available_seats + seat_count).min(flight.total_seats);
        }

        let booking = inner
            .bookings
            .get_mut(&booking_id)
            .expect("booking checked above");
        booking.status = BookingStatus::Cancelled;
        booking.updated_at = Utc::now();
        Ok(booking.clone())
    }

    async fn get_booking(&self, booking_id: Uuid) -> Result<Booking, ReservationError> {
        let inner = self.inner.lock().unwrap();
        inner
            .bookings
            .get(&booking_id)
            .cloned()
            .ok_or(ReservationError::BookingNotFound(booking_id))
    }

    async fn occupied_seats(&self, flight_id: Uuid) -> Result<Vec<String>, ReservationError> {
        let inner = self.inner.lock().unwrap();
        let mut seats: Vec<String> = inner
            .bookings
            .values()
            .filter(|b| b.flight_id == flight_id && b.status == BookingStatus::Booked)
            .flat_map(|b| b.seat_numbers.iter().cloned())
            .collect();
        seats.sort();
        Ok(seats)
    }

    async fn bookings_for_user(&self, booker_id: &str) -> Result<Vec<Booking>, ReservationError> {
        let inner = self.inner.lock().unwrap();
        let mut bookings: Vec<Booking> = inner
            .bookings
            .values()
            .filter(|b| b.booker_id == booker_id)
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }
}
