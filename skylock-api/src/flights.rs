use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use uuid::Uuid;

use crate::auth::Claims;
use crate::error::ApiError;
use crate::state::AppState;
use skylock_domain::flight::{Flight, NewFlight};
use skylock_domain::ReservationError;

/// Seed/admin path; full flight CRUD belongs to the catalog collaborator.
pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/flights", post(create_flight))
}

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/v1/flights/{flight_id}", get(get_flight))
        .route("/v1/flights/{flight_id}/occupied", get(occupied_seats))
}

async fn create_flight(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<NewFlight>,
) -> Result<(StatusCode, Json<Flight>), ApiError> {
    if !claims.is_admin() {
        return Err(ReservationError::NotAuthorized.into());
    }

    let flight = state.orchestrator.ledger().create_flight(req).await?;
    Ok((StatusCode::CREATED, Json(flight)))
}

async fn get_flight(
    State(state): State<AppState>,
    Path(flight_id): Path<Uuid>,
) -> Result<Json<Flight>, ApiError> {
    Ok(Json(state.orchestrator.get_flight(flight_id).await?))
}

/// Seats of booked (not merely held) bookings; the seat map's durable layer.
async fn occupied_seats(
    State(state): State<AppState>,
    Path(flight_id): Path<Uuid>,
) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.orchestrator.occupied_seats(flight_id).await?))
}
