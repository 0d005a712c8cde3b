use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::Claims;
use crate::error::ApiError;
use crate::state::AppState;
use skylock_domain::booking::{Booking, PriceBreakdown};
use skylock_domain::ReservationError;

#[derive(Debug, Deserialize)]
struct CommitBookingRequest {
    flight_id: Uuid,
    seat_numbers: Vec<String>,
    /// Computed by the pricing collaborator; recorded, not validated.
    price: PriceBreakdown,
    /// Opaque confirmation reference from the payment collaborator.
    payment_ref: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", post(commit_booking).get(my_bookings))
        .route("/v1/bookings/{booking_id}", get(get_booking))
        .route("/v1/bookings/{booking_id}/cancel", post(cancel_booking))
}

async fn commit_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CommitBookingRequest>,
) -> Result<(StatusCode, Json<Booking>), ApiError> {
    let booking = state
        .orchestrator
        .commit_booking(
            req.flight_id,
            &req.seat_numbers,
            &claims.sub,
            req.price,
            &req.payment_ref,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(booking)))
}

async fn cancel_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Booking>, ApiError> {
    let booking = state
        .orchestrator
        .cancel_booking(booking_id, &claims.sub, claims.is_admin())
        .await?;

    Ok(Json(booking))
}

async fn get_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Booking>, ApiError> {
    let booking = state.orchestrator.get_booking(booking_id).await?;

    if booking.booker_id != claims.sub && !claims.is_admin() {
        return Err(ReservationError::NotAuthorized.into());
    }

    Ok(Json(booking))
}

async fn my_bookings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Booking>>, ApiError> {
    Ok(Json(
        state.orchestrator.bookings_for_user(&claims.sub).await?,
    ))
}
