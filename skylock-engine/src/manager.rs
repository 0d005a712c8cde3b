use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use skylock_domain::error::ReservationError;
use skylock_domain::ledger::LockStore;
use skylock_domain::lock::AcquireOutcome;
use skylock_store::app_config::BusinessRules;

/// Holder identity assigned to blank callers when anonymous holds are
/// enabled. Off by default; see `BusinessRules::allow_anonymous_holds`.
const ANONYMOUS_HOLDER: &str = "anonymous";

/// Use-case wrapper over the lock store: input validation, holder policy and
/// TTL resolution live here, atomicity lives in the store.
pub struct LockManager {
    store: Arc<dyn LockStore>,
    rules: BusinessRules,
}

impl LockManager {
    pub fn new(store: Arc<dyn LockStore>, rules: BusinessRules) -> Self {
        Self { store, rules }
    }

    /// Acquire all seats or none. A conflict is a business outcome reported
    /// verbatim, never retried or waited on here.
    pub async fn try_hold(
        &self,
        flight_id: Uuid,
        seat_numbers: &[String],
        holder: &str,
        ttl_seconds: Option<u64>,
    ) -> Result<AcquireOutcome, ReservationError> {
        let seats = normalize_seats(seat_numbers)?;
        let holder = self.resolve_holder(holder)?;
        let ttl = self.resolve_ttl(ttl_seconds);

        debug!(%flight_id, holder, seats = seats.len(), ?ttl, "try_hold");
        self.store
            .acquire_all(flight_id, &seats, &holder, ttl)
            .await
    }

    /// Release the caller's own locks; foreign or expired entries are left
    /// alone without complaint. Returns the number of locks actually removed.
    pub async fn release(
        &self,
        flight_id: Uuid,
        seat_numbers: &[String],
        holder: &str,
    ) -> Result<u64, ReservationError> {
        let seats = normalize_seats(seat_numbers)?;
        let holder = self.resolve_holder(holder)?;
        self.store.release_all(flight_id, &seats, &holder).await
    }

    /// True only when every seat is currently locked by `holder`.
    pub async fn holds_all(
        &self,
        flight_id: Uuid,
        seat_numbers: &[String],
        holder: &str,
    ) -> Result<(), ReservationError> {
        for seat in seat_numbers {
            match self.store.get(flight_id, seat).await? {
                Some(current) if current == holder => {}
                Some(_) => return Err(ReservationError::SeatConflict(seat.clone())),
                None => return Err(ReservationError::HoldExpired),
            }
        }
        Ok(())
    }

    pub async fn current_locks(&self, flight_id: Uuid) -> Result<Vec<String>, ReservationError> {
        self.store.current_locks(flight_id).await
    }

    fn resolve_holder(&self, holder: &str) -> Result<String, ReservationError> {
        let holder = holder.trim();
        if !holder.is_empty() {
            return Ok(holder.to_string());
        }
        if self.rules.allow_anonymous_holds {
            Ok(ANONYMOUS_HOLDER.to_string())
        } else {
            Err(ReservationError::InvalidRequest(
                "a holder identity is required".into(),
            ))
        }
    }

    fn resolve_ttl(&self, ttl_seconds: Option<u64>) -> Duration {
        let seconds = ttl_seconds
            .unwrap_or(self.rules.seat_hold_seconds)
            .clamp(self.rules.min_hold_seconds, self.rules.max_hold_seconds);
        Duration::from_secs(seconds)
    }
}

pub(crate) fn normalize_seats(seat_numbers: &[String]) -> Result<Vec<String>, ReservationError> {
    if seat_numbers.is_empty() {
        return Err(ReservationError::InvalidRequest(
            "at least one seat is required".into(),
        ));
    }
    let mut seats: Vec<String> = seat_numbers
        .iter()
        .map(|s| s.trim().to_uppercase())
        .collect();
    if seats.iter().any(|s| s.is_empty()) {
        return Err(ReservationError::InvalidRequest(
            "seat numbers must not be blank".into(),
        ));
    }
    seats.sort();
    seats.dedup();
    Ok(seats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use skylock_store::MemoryLockStore;

    fn manager(rules: BusinessRules) -> LockManager {
        LockManager::new(Arc::new(MemoryLockStore::new()), rules)
    }

    #[tokio::test]
    async fn rejects_empty_seat_set() {
        let m = manager(BusinessRules::default());
        let err = m
            .try_hold(Uuid::new_v4(), &[], "alice", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn anonymous_holds_are_a_config_switch() {
        let strict = manager(BusinessRules::default());
        let err = strict
            .try_hold(Uuid::new_v4(), &["1A".to_string()], "  ", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::InvalidRequest(_)));

        let lenient = manager(BusinessRules {
            allow_anonymous_holds: true,
            ..BusinessRules::default()
        });
        let outcome = lenient
            .try_hold(Uuid::new_v4(), &["1A".to_string()], "", None)
            .await
            .unwrap();
        assert!(matches!(outcome, AcquireOutcome::Acquired { .. }));
    }

    #[tokio::test]
    async fn seat_numbers_are_normalized_and_deduped() {
        let m = manager(BusinessRules::default());
        let flight = Uuid::new_v4();
        m.try_hold(
            flight,
            &[" 1a ".to_string(), "1A".to_string()],
            "alice",
            None,
        )
        .await
        .unwrap();

        assert_eq!(m.current_locks(flight).await.unwrap(), vec!["1A"]);
    }

    #[tokio::test]
    async fn holds_all_distinguishes_expiry_from_conflict() {
        let m = manager(BusinessRules::default());
        let flight = Uuid::new_v4();
        let seats = vec!["1A".to_string(), "1B".to_string()];
        m.try_hold(flight, &seats, "alice", None).await.unwrap();

        assert!(m.holds_all(flight, &seats, "alice").await.is_ok());

        let err = m.holds_all(flight, &seats, "bob").await.unwrap_err();
        assert!(matches!(err, ReservationError::SeatConflict(_)));

        let err = m
            .holds_all(flight, &["9F".to_string()], "alice")
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::HoldExpired));
    }
}
