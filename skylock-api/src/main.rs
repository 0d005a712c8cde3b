use std::net::SocketAddr;
use std::sync::Arc;

use skylock_api::{app, AppState};
use skylock_engine::{Notifier, ReservationOrchestrator};
use skylock_store::{DbClient, EventProducer, PostgresLedger, RedisLockStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "skylock=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = skylock_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting Skylock API on port {}", config.server.port);

    let db = DbClient::new(&config.database.url)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");

    let lock_store =
        RedisLockStore::new(&config.redis.url).expect("Failed to create Redis client");

    let telemetry =
        EventProducer::new(&config.kafka.brokers).expect("Failed to create Kafka producer");

    let notifier = Arc::new(Notifier::new(config.business_rules.event_channel_capacity));

    let orchestrator = Arc::new(ReservationOrchestrator::new(
        Arc::new(lock_store),
        Arc::new(PostgresLedger::new(db)),
        notifier,
        Some(Arc::new(telemetry)),
        config.business_rules.clone(),
    ));

    let app_state = AppState {
        orchestrator,
        auth: config.auth.clone(),
        business_rules: config.business_rules.clone(),
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
