use std::collections::HashMap;
use std::sync::RwLock;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use skylock_domain::events::SeatEvent;

/// Per-flight publish/subscribe fan-out for seat-state transitions.
///
/// One broadcast channel per flight, created on demand and pruned once the
/// last subscriber is gone. Lagging subscribers drop events (broadcast
/// semantics); that is acceptable because every client can reconcile via the
/// pull queries.
pub struct Notifier {
    capacity: usize,
    channels: RwLock<HashMap<Uuid, broadcast::Sender<SeatEvent>>>,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// Join the update channel of one flight. Also sweeps senders whose
    /// receivers are all gone, so flights that were watched once and never
    /// published to do not accumulate in the map.
    pub fn subscribe(&self, flight_id: Uuid) -> broadcast::Receiver<SeatEvent> {
        let mut channels = self.channels.write().unwrap();
        channels.retain(|_, tx| tx.receiver_count() > 0);
        channels
            .entry(flight_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Best-effort delivery to everyone watching the event's flight. A flight
    /// nobody watches has no channel; nothing to do.
    pub fn publish(&self, event: SeatEvent) {
        let flight_id = event.flight_id;
        let dropped = {
            let channels = self.channels.read().unwrap();
            match channels.get(&flight_id) {
                Some(tx) => tx.send(event).is_err(),
                None => false,
            }
        };

        // send() fails only when every receiver is gone; drop the channel so
        // the map does not grow with dead flights.
        if dropped {
            let mut channels = self.channels.write().unwrap();
            if channels
                .get(&flight_id)
                .is_some_and(|tx| tx.receiver_count() == 0)
            {
                channels.remove(&flight_id);
                debug!(%flight_id, "pruned idle event channel");
            }
        }
    }

    #[cfg(test)]
    fn channel_count(&self) -> usize {
        self.channels.read().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skylock_domain::events::SeatEventKind;

    #[tokio::test]
    async fn subscribers_only_see_their_flight() {
        let notifier = Notifier::new(16);
        let watched = Uuid::new_v4();
        let other = Uuid::new_v4();

        let mut rx = notifier.subscribe(watched);
        let mut other_rx = notifier.subscribe(other);

        notifier.publish(SeatEvent::new(
            SeatEventKind::SeatsLocked,
            watched,
            vec!["1A".into()],
        ));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.flight_id, watched);
        assert_eq!(event.kind, SeatEventKind::SeatsLocked);

        assert!(matches!(
            other_rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn dead_channels_are_pruned() {
        let notifier = Notifier::new(16);
        let flight = Uuid::new_v4();

        let rx = notifier.subscribe(flight);
        drop(rx);
        assert_eq!(notifier.channel_count(), 1);

        notifier.publish(SeatEvent::new(
            SeatEventKind::SeatsReleased,
            flight,
            vec!["1A".into()],
        ));
        assert_eq!(notifier.channel_count(), 0);
    }

    #[tokio::test]
    async fn abandoned_channels_are_swept_on_subscribe() {
        let notifier = Notifier::new(16);
        let watched_once = Uuid::new_v4();

        // Watcher leaves and the flight is never published to again.
        let rx = notifier.subscribe(watched_once);
        drop(rx);
        assert_eq!(notifier.channel_count(), 1);

        let _rx = notifier.subscribe(Uuid::new_v4());
        assert_eq!(notifier.channel_count(), 1);
    }

    #[tokio::test]
    async fn publish_without_watchers_is_a_no_op() {
        let notifier = Notifier::new(16);
        notifier.publish(SeatEvent::new(
            SeatEventKind::SeatsBooked,
            Uuid::new_v4(),
            vec!["2B".into()],
        ));
        assert_eq!(notifier.channel_count(), 0);
    }
}
