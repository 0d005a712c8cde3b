use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::Row;
use tracing::info;
use uuid::Uuid;

use skylock_domain::booking::{Booking, BookingStatus, PriceBreakdown};
use skylock_domain::error::ReservationError;
use skylock_domain::flight::{Flight, NewFlight};
use skylock_domain::ledger::InventoryLedger;

use crate::database::DbClient;

/// Postgres-backed inventory ledger. The seat counter only ever moves through
/// conditional UPDATEs guarded by the requested quantity, so concurrent
/// commits against the same flight cannot oversell: the guard either applies
/// the whole decrement or affects zero rows.
#[derive(Clone)]
pub struct PostgresLedger {
    db: DbClient,
}

impl PostgresLedger {
    pub fn new(db: DbClient) -> Self {
        Self { db }
    }
}

fn store_err(e: sqlx::Error) -> ReservationError {
    ReservationError::StoreUnavailable(e.to_string())
}

fn booking_from_row(row: &PgRow) -> Result<Booking, ReservationError> {
    let status: String = row.try_get("status").map_err(store_err)?;
    let status = status
        .parse::<BookingStatus>()
        .map_err(ReservationError::StoreUnavailable)?;

    Ok(Booking {
        id: row.try_get("id").map_err(store_err)?,
        flight_id: row.try_get("flight_id").map_err(store_err)?,
        booker_id: row.try_get("booker_id").map_err(store_err)?,
        seat_numbers: row.try_get("seat_numbers").map_err(store_err)?,
        status,
        base_amount: row.try_get("base_amount").map_err(store_err)?,
        seat_fees: row.try_get("seat_fees").map_err(store_err)?,
        tax: row.try_get("tax").map_err(store_err)?,
        total_amount: row.try_get("total_amount").map_err(store_err)?,
        payment_ref: row.try_get("payment_ref").map_err(store_err)?,
        created_at: row.try_get("created_at").map_err(store_err)?,
        updated_at: row.try_get("updated_at").map_err(store_err)?,
    })
}

fn flight_from_row(row: &PgRow) -> Result<Flight, ReservationError> {
    Ok(Flight {
        id: row.try_get("id").map_err(store_err)?,
        flight_number: row.try_get("flight_number").map_err(store_err)?,
        airline: row.try_get("airline").map_err(store_err)?,
        origin: row.try_get("origin").map_err(store_err)?,
        destination: row.try_get("destination").map_err(store_err)?,
        departure_time: row.try_get("departure_time").map_err(store_err)?,
        arrival_time: row.try_get("arrival_time").map_err(store_err)?,
        price_per_seat: row.try_get("price_per_seat").map_err(store_err)?,
        total_seats: row.try_get("total_seats").map_err(store_err)?,
        available_seats: row.try_get("available_seats").map_err(store_err)?,
        created_at: row.try_get("created_at").map_err(store_err)?,
    })
}

#[async_trait]
impl InventoryLedger for PostgresLedger {
    async fn create_flight(&self, flight: NewFlight) -> Result<Flight, ReservationError> {
        if flight.total_seats < 1 {
            return Err(ReservationError::InvalidRequest(
                "total_seats must be at least 1".into(),
            ));
        }

        let row = sqlx::query(
            r#"
            INSERT INTO flights
                (id, flight_number, airline, origin, destination,
                 departure_time, arrival_time, price_per_seat,
                 total_seats, available_seats, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9, $10)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&flight.flight_number)
        .bind(&flight.airline)
        .bind(&flight.origin)
        .bind(&flight.destination)
        .bind(flight.departure_time)
        .bind(flight.arrival_time)
        .bind(flight.price_per_seat)
        .bind(flight.total_seats)
        .bind(Utc::now())
        .fetch_one(&self.db.pool)
        .await
        .map_err(store_err)?;

        flight_from_row(&row)
    }

    async fn get_flight(&self, flight_id: Uuid) -> Result<Flight, ReservationError> {
        let row = sqlx::query("SELECT * FROM flights WHERE id = $1")
            .bind(flight_id)
            .fetch_optional(&self.db.pool)
            .await
            .map_err(store_err)?
            .ok_or(ReservationError::FlightNotFound(flight_id))?;

        flight_from_row(&row)
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
        let mut tx = self.db.pool.begin().await.map_err(store_err)?;

        // Conditional decrement: zero rows affected means the guard failed and
        // nothing below runs. Never read-then-write the counter.
        let decremented = sqlx::query(
            r#"
            UPDATE flights
            SET available_seats = available_seats - $2
            WHERE id = $1 AND available_seats >= $2
            "#,
        )
        .bind(flight_id)
        .bind(requested)
        .execute(&mut *tx)
        .await
        .map_err(store_err)?;

        if decremented.rows_affected() == 0 {
            let available: Option<i32> =
                sqlx::query_scalar("SELECT available_seats FROM flights WHERE id = $1")
                    .bind(flight_id)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(store_err)?;

            return Err(match available {
                Some(available) => ReservationError::InsufficientInventory {
                    requested,
                    available,
                },
                None => ReservationError::FlightNotFound(flight_id),
            });
        }

        let now = Utc::now();
        let row = sqlx::query(
            r#"
            INSERT INTO bookings
                (id, flight_id, booker_id, seat_numbers, status,
                 base_amount, seat_fees, tax, total_amount, payment_ref,
                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, 'booked', $5, $6, $7, $8, $9, $10, $10)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(flight_id)
        .bind(booker_id)
        .bind(seat_numbers)
        .bind(price.base_amount)
        .bind(price.seat_fees)
        .bind(price.tax)
        .bind(price.total_amount)
        .bind(payment_ref)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(store_err)?;

        let booking = booking_from_row(&row)?;
        tx.commit().await.map_err(store_err)?;

        info!(booking_id = %booking.id, %flight_id, seats = requested, "booking committed");
        Ok(booking)
    }

    async fn cancel_booking(
        &self,
        booking_id: Uuid,
        requester: &str,
        privileged: bool,
    ) -> Result<Booking, ReservationError> {
        let mut tx = self.db.pool.begin().await.map_err(store_err)?;

        let row = sqlx::query("SELECT * FROM bookings WHERE id = $1")
            .bind(booking_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(store_err)?
            .ok_or(ReservationError::BookingNotFound(booking_id))?;
        let booking = booking_from_row(&row)?;

        if booking.booker_id != requester && !privileged {
            return Err(ReservationError::NotAuthorized);
        }

        // Conditional status transition serializes concurrent cancels of the
        // same booking: exactly one caller flips it and restores the seats.
        let now = Utc::now();
        let cancelled = sqlx::query(
            r#"
            UPDATE bookings
            SET status = 'cancelled', updated_at = $2
            WHERE id = $1 AND status = 'booked'
            "#,
        )
        .bind(booking_id)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(store_err)?;

        if cancelled.rows_affected() == 0 {
            return Err(ReservationError::AlreadyCancelled);
        }

        sqlx::query("UPDATE flights SET available_seats = available_seats + $2 WHERE id = $1")
            .bind(booking.flight_id)
            .bind(booking.seat_count())
            .execute(&mut *tx)
            .await
            .map_err(store_err)?;

        tx.commit().await.map_err(store_err)?;

        info!(%booking_id, flight_id = %booking.flight_id, "booking cancelled");
        Ok(Booking {
            status: BookingStatus::Cancelled,
            updated_at: now,
            ..booking
        })
    }

    async fn get_booking(&self, booking_id: Uuid) -> Result<Booking, ReservationError> {
        let row = sqlx::query("SELECT * FROM bookings WHERE id = $1")
            .bind(booking_id)
            .fetch_optional(&self.db.pool)
            .await
            .map_err(store_err)?
            .ok_or(ReservationError::BookingNotFound(booking_id))?;

        booking_from_row(&row)
    }

    async fn occupied_seats(&self, flight_id: Uuid) -> Result<Vec<String>, ReservationError> {
        let rows = sqlx::query(
            "SELECT seat_numbers FROM bookings WHERE flight_id = $1 AND status = 'booked'",
        )
        .bind(flight_id)
        .fetch_all(&self.db.pool)
        .await
        .map_err(store_err)?;

        let mut seats = Vec::new();
        for row in rows {
            let mut batch: Vec<String> = row.try_get("seat_numbers").map_err(store_err)?;
            seats.append(&mut batch);
        }
        seats.sort();
        Ok(seats)
    }

    async fn bookings_for_user(&self, booker_id: &str) -> Result<Vec<Booking>, ReservationError> {
        let rows =
            sqlx::query("SELECT * FROM bookings WHERE booker_id = $1 ORDER BY created_at DESC")
                .bind(booker_id)
                .fetch_all(&self.db.pool)
                .await
                .map_err(store_err)?;

        rows.iter().map(booking_from_row).collect()
    }
}
