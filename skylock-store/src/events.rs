use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use std::time::Duration;
use tracing::{debug, error};

use skylock_domain::events::SeatEvent;

pub const TOPIC_HOLDS: &str = "holds.created";
pub const TOPIC_COMMITTED: &str = "bookings.committed";
pub const TOPIC_CANCELLED: &str = "bookings.cancelled";

/// Fire-and-forget Kafka telemetry. Never on the correctness path: callers
/// ignore publish failures, clients reconcile via the pull queries.
#[derive(Clone)]
pub struct EventProducer {
    producer: FutureProducer,
}

impl EventProducer {
    pub fn new(brokers: &str) -> Result<Self, rdkafka::error::KafkaError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000")
            .create()?;

        Ok(Self { producer })
    }

    pub async fn publish(
        &self,
        topic: &str,
        key: &str,
        payload: &str,
    ) -> Result<(), rdkafka::error::KafkaError> {
        let record = FutureRecord::to(topic).key(key).payload(payload);

        match self
            .producer
            .send(record, Timeout::After(Duration::from_secs(0)))
            .await
        {
            Ok(delivery) => {
                debug!(
                    topic,
                    key,
                    partition = delivery.partition,
                    offset = delivery.offset,
                    "event published"
                );
                Ok(())
            }
            Err((e, _msg)) => {
                error!(topic, "failed to publish event: {}", e);
                Err(e)
            }
        }
    }

    /// Serialize and publish a seat lifecycle event, keyed by flight so all
    /// events of one flight land on the same partition.
    pub async fn publish_seat_event(&self, topic: &str, event: &SeatEvent) {
        let payload = match serde_json::to_string(event) {
            Ok(p) => p,
            Err(e) => {
                error!("failed to serialize seat event: {}", e);
                return;
            }
        };
        let _ = self
            .publish(topic, &event.flight_id.to_string(), &payload)
            .await;
    }
}
