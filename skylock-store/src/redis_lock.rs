use async_trait::async_trait;
use redis::AsyncCommands;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use skylock_domain::error::ReservationError;
use skylock_domain::ledger::LockStore;
use skylock_domain::lock::{expiry_from_ttl, AcquireOutcome};

/// Checks every key before touching any, then writes them all in the same
/// script evaluation. Redis runs scripts single-threaded, which is what makes
/// the multi-seat acquire indivisible with respect to concurrent acquires and
/// releases on overlapping seat sets. Returns 0 on success or the 1-based
/// index of the first conflicting key.
const ACQUIRE_SCRIPT: &str = r#"
for i, key in ipairs(KEYS) do
    local cur = redis.call("GET", key)
    if cur and cur ~= ARGV[1] then
        return i
    end
end
for i, key in ipairs(KEYS) do
    redis.call("SET", key, ARGV[1], "PX", tonumber(ARGV[2]))
end
return 0
"#;

/// Deletes only the keys currently owned by the caller. Ownership mismatch is
/// a no-op per key, never an error.
const RELEASE_SCRIPT: &str = r#"
local released = 0
for i, key in ipairs(KEYS) do
    if redis.call("GET", key) == ARGV[1] then
        redis.call("DEL", key)
        released = released + 1
    end
end
return released
"#;

#[derive(Clone)]
pub struct RedisLockStore {
    client: redis::Client,
}

impl RedisLockStore {
    pub fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    fn seat_key(flight_id: Uuid, seat_number: &str) -> String {
        format!("seat:{}:{}", flight_id, seat_number)
    }

    async fn conn(&self) -> Result<redis::aio::MultiplexedConnection, ReservationError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(store_err)
    }
}

fn store_err(e: redis::RedisError) -> ReservationError {
    ReservationError::StoreUnavailable(e.to_string())
}

#[async_trait]
impl LockStore for RedisLockStore {
    async fn get(
        &self,
        flight_id: Uuid,
        seat_number: &str,
    ) -> Result<Option<String>, ReservationError> {
        let mut conn = self.conn().await?;
        let holder: Option<String> = conn
            .get(Self::seat_key(flight_id, seat_number))
            .await
            .map_err(store_err)?;
        Ok(holder)
    }

    async fn acquire_all(
        &self,
        flight_id: Uuid,
        seat_numbers: &[String],
        holder: &str,
        ttl: Duration,
    ) -> Result<AcquireOutcome, ReservationError> {
        let mut conn = self.conn().await?;

        let script = redis::Script::new(ACQUIRE_SCRIPT);
        let mut invocation = script.prepare_invoke();
        for seat in seat_numbers {
            invocation.key(Self::seat_key(flight_id, seat));
        }
        invocation.arg(holder).arg(ttl.as_millis().max(1) as u64);

        let conflict_index: i64 = invocation.invoke_async(&mut conn).await.map_err(store_err)?;

        if conflict_index == 0 {
            debug!(%flight_id, holder, seats = seat_numbers.len(), "seat locks acquired");
            Ok(AcquireOutcome::Acquired {
                expires_at: expiry_from_ttl(ttl),
            })
        } else {
            let seat = seat_numbers[(conflict_index - 1) as usize].clone();
            Ok(AcquireOutcome::Conflict { seat })
        }
    }

    async fn release_all(
        &self,
        flight_id: Uuid,
        seat_numbers: &[String],
        holder: &str,
    ) -> Result<u64, ReservationError> {
        if seat_numbers.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn().await?;

        let script = redis::Script::new(RELEASE_SCRIPT);
        let mut invocation = script.prepare_invoke();
        for seat in seat_numbers {
            invocation.key(Self::seat_key(flight_id, seat));
        }
        invocation.arg(holder);

        let released: i64 = invocation.invoke_async(&mut conn).await.map_err(store_err)?;
        debug!(%flight_id, holder, released, "seat locks released");
        Ok(released.max(0) as u64)
    }

    async fn current_locks(&self, flight_id: Uuid) -> Result<Vec<String>, ReservationError> {
        let mut conn = self.conn().await?;
        let pattern = format!("seat:{}:*", flight_id);
        let prefix = format!("seat:{}:", flight_id);

        let mut seats = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await
                .map_err(store_err)?;

            for key in keys {
                if let Some(seat) = key.strip_prefix(&prefix) {
                    seats.push(seat.to_string());
                }
            }

            cursor = next;
            if cursor == 0 {
                break;
            }
        }

        seats.sort();
        Ok(seats)
    }
}
