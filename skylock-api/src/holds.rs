use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;

use crate::auth::Claims;
use crate::error::ApiError;
use crate::state::AppState;
use skylock_engine::orchestrator::AttemptState;

#[derive(Debug, Deserialize)]
struct HoldRequest {
    flight_id: Uuid,
    seat_numbers: Vec<String>,
    /// Optional override, clamped server-side.
    ttl_seconds: Option<u64>,
}

#[derive(Debug, Serialize)]
struct HoldResponse {
    status: String,
    flight_id: Uuid,
    seat_numbers: Vec<String>,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct ReleaseRequest {
    flight_id: Uuid,
    seat_numbers: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ReleaseResponse {
    status: String,
}

/// Routes that require a verified caller identity.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/holds", post(create_hold).delete(release_hold))
        .route("/v1/flights/{flight_id}/stream", get(stream_flight_events))
}

/// Public pull queries for seat-map reconciliation.
pub fn public_routes() -> Router<AppState> {
    Router::new().route("/v1/flights/{flight_id}/locks", get(current_locks))
}

async fn create_hold(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<HoldRequest>,
) -> Result<Json<HoldResponse>, ApiError> {
    let grant = state
        .orchestrator
        .hold_seats(
            req.flight_id,
            &req.seat_numbers,
            &claims.sub,
            req.ttl_seconds,
        )
        .await?;

    Ok(Json(HoldResponse {
        status: AttemptState::Held.as_str().to_string(),
        flight_id: grant.flight_id,
        seat_numbers: grant.seat_numbers,
        expires_at: grant.expires_at,
    }))
}

async fn release_hold(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ReleaseRequest>,
) -> Result<Json<ReleaseResponse>, ApiError> {
    state
        .orchestrator
        .release_seats(req.flight_id, &req.seat_numbers, &claims.sub)
        .await?;

    Ok(Json(ReleaseResponse {
        status: AttemptState::Released.as_str().to_string(),
    }))
}

async fn current_locks(
    State(state): State<AppState>,
    Path(flight_id): Path<Uuid>,
) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.orchestrator.current_locks(flight_id).await?))
}

/// Live seat-state transitions for one flight. Best-effort: a client that
/// lags or reconnects re-reads the locks/occupied queries.
async fn stream_flight_events(
    State(state): State<AppState>,
    Path(flight_id): Path<Uuid>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.orchestrator.subscribe(flight_id);

    let stream = BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(event) => serde_json::to_string(&event)
                .ok()
                .map(|data| Ok::<_, Infallible>(Event::default().event(event.kind_str()).data(data))),
            // Lagged receiver: skip, client reconciles by pulling.
            Err(_) => None,
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
