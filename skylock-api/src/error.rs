use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use skylock_domain::ReservationError;

/// API-edge error: the domain taxonomy mapped to HTTP, plus an anyhow
/// catch-all for infrastructure surprises.
#[derive(Debug)]
pub enum ApiError {
    Reservation(ReservationError),
    Internal(anyhow::Error),
}

impl From<ReservationError> for ApiError {
    fn from(err: ReservationError) -> Self {
        ApiError::Reservation(err)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Reservation(err) => {
                let status = match &err {
                    ReservationError::SeatConflict(_)
                    | ReservationError::InsufficientInventory { .. }
                    | ReservationError::AlreadyCancelled => StatusCode::CONFLICT,
                    ReservationError::HoldExpired => StatusCode::GONE,
                    ReservationError::NotAuthorized => StatusCode::FORBIDDEN,
                    ReservationError::FlightNotFound(_) | ReservationError::BookingNotFound(_) => {
                        StatusCode::NOT_FOUND
                    }
                    ReservationError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                    ReservationError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                };

                let mut body = json!({ "error": err.to_string() });
                // Enough detail to drive a UI retry.
                if let ReservationError::SeatConflict(seat) = &err {
                    body["conflict_seat"] = json!(seat);
                }
                if err.is_retryable() {
                    body["retryable"] = json!(true);
                }

                (status, Json(body)).into_response()
            }
            ApiError::Internal(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal Server Error" })),
                )
                    .into_response()
            }
        }
    }
}
