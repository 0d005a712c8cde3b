use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::Utc;
use serde_json::{json, Value};
use tower::util::ServiceExt;
use uuid::Uuid;

use skylock_api::{app, auth, AppState};
use skylock_domain::flight::NewFlight;
use skylock_engine::{Notifier, ReservationOrchestrator};
use skylock_store::app_config::{AuthConfig, BusinessRules};
use skylock_store::{MemoryLedger, MemoryLockStore};

const SECRET: &str = "test-secret";

fn test_app() -> (Router, Arc<ReservationOrchestrator>) {
    let rules = BusinessRules::default();
    let orchestrator = Arc::new(ReservationOrchestrator::new(
        Arc::new(MemoryLockStore::new()),
        Arc::new(MemoryLedger::new()),
        Arc::new(Notifier::new(rules.event_channel_capacity)),
        None,
        rules.clone(),
    ));

    let state = AppState {
        orchestrator: Arc::clone(&orchestrator),
        auth: AuthConfig {
            jwt_secret: SECRET.into(),
            jwt_expiration_seconds: 3600,
        },
        business_rules: rules,
    };

    (app(state), orchestrator)
}

async fn seed_flight(orchestrator: &ReservationOrchestrator, seats: i32) -> Uuid {
    orchestrator
        .ledger()
        .create_flight(NewFlight {
            flight_number: "SL900".into(),
            airline: "Skylock Air".into(),
            origin: "BOM".into(),
            destination: "DEL".into(),
            departure_time: Utc::now(),
            arrival_time: Utc::now(),
            price_per_seat: 500_000,
            total_seats: seats,
        })
        .await
        .unwrap()
        .id
}

fn token(sub: &str, role: &str) -> String {
    auth::issue_token(SECRET, sub, role, 3600).unwrap()
}

fn request(method: &str, uri: &str, bearer: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = bearer {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let body = match body {
        Some(json) => Body::from(json.to_string()),
        None => Body::empty(),
    };
    builder.body(body).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn hold_body(flight_id: Uuid, seats: &[&str]) -> Value {
    json!({ "flight_id": flight_id, "seat_numbers": seats })
}

fn commit_body(flight_id: Uuid, seats: &[&str]) -> Value {
    json!({
        "flight_id": flight_id,
        "seat_numbers": seats,
        "price": {
            "base_amount": 500_000,
            "seat_fees": 15_000,
            "tax": 25_000,
            "total_amount": 540_000
        },
        "payment_ref": "pi_test_1"
    })
}

#[tokio::test]
async fn health_is_public() {
    let (app, _) = test_app();
    let response = app
        .oneshot(request("GET", "/v1/health", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn holds_require_a_bearer_token() {
    let (app, orc) = test_app();
    let flight_id = seed_flight(&orc, 5).await;

    let response = app
        .oneshot(request(
            "POST",
            "/v1/holds",
            None,
            Some(hold_body(flight_id, &["1A"])),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn contested_hold_returns_conflict_with_the_seat() {
    let (app, orc) = test_app();
    let flight_id = seed_flight(&orc, 5).await;

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/v1/holds",
            Some(&token("alice", "CUSTOMER")),
            Some(hold_body(flight_id, &["1A", "1B"])),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "HELD");

    let response = app
        .oneshot(request(
            "POST",
            "/v1/holds",
            Some(&token("bob", "CUSTOMER")),
            Some(hold_body(flight_id, &["1B", "1C"])),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["conflict_seat"], "1B");
}

#[tokio::test]
async fn lock_and_occupied_queries_are_public() {
    let (app, orc) = test_app();
    let flight_id = seed_flight(&orc, 5).await;

    orc.hold_seats(flight_id, &["2A".to_string()], "alice", None)
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/v1/flights/{}/locks", flight_id),
            None,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!(["2A"]));

    let response = app
        .oneshot(request(
            "GET",
            &format!("/v1/flights/{}/occupied", flight_id),
            None,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!([]));
}

#[tokio::test]
async fn commit_and_cancel_round_trip() {
    let (app, orc) = test_app();
    let flight_id = seed_flight(&orc, 2).await;

    orc.hold_seats(flight_id, &["1A".to_string()], "alice", None)
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/v1/bookings",
            Some(&token("alice", "CUSTOMER")),
            Some(commit_body(flight_id, &["1A"])),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let booking = body_json(response).await;
    assert_eq!(booking["status"], "booked");
    let booking_id = booking["id"].as_str().unwrap().to_string();

    // A stranger may not cancel it.
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/v1/bookings/{}/cancel", booking_id),
            Some(&token("mallory", "CUSTOMER")),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // An admin may.
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/v1/bookings/{}/cancel", booking_id),
            Some(&token("ops-1", "ADMIN")),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "cancelled");

    // Cancelling twice is a conflict, not a silent success.
    let response = app
        .oneshot(request(
            "POST",
            &format!("/v1/bookings/{}/cancel", booking_id),
            Some(&token("ops-1", "ADMIN")),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn commit_without_a_hold_is_gone() {
    let (app, orc) = test_app();
    let flight_id = seed_flight(&orc, 2).await;

    let response = app
        .oneshot(request(
            "POST",
            "/v1/bookings",
            Some(&token("alice", "CUSTOMER")),
            Some(commit_body(flight_id, &["1A"])),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::GONE);
}

#[tokio::test]
async fn empty_seat_set_is_a_bad_request() {
    let (app, orc) = test_app();
    let flight_id = seed_flight(&orc, 2).await;

    let response = app
        .oneshot(request(
            "POST",
            "/v1/holds",
            Some(&token("alice", "CUSTOMER")),
            Some(hold_body(flight_id, &[])),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn flight_creation_is_admin_only() {
    let (app, _) = test_app();
    let body = json!({
        "flight_number": "SL901",
        "airline": "Skylock Air",
        "origin": "DEL",
        "destination": "CCU",
        "departure_time": Utc::now(),
        "arrival_time": Utc::now(),
        "price_per_seat": 420_000,
        "total_seats": 120
    });

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/v1/flights",
            Some(&token("alice", "CUSTOMER")),
            Some(body.clone()),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .oneshot(request(
            "POST",
            "/v1/flights",
            Some(&token("ops-1", "ADMIN")),
            Some(body),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let flight = body_json(response).await;
    assert_eq!(flight["available_seats"], 120);
}
