use chrono::{DateTime, Utc};
use std::time::Duration;

/// Result of an all-or-nothing multi-seat acquire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// Every requested seat is now (or was already) held by the requester,
    /// with the TTL refreshed.
    Acquired { expires_at: DateTime<Utc> },
    /// At least one seat is held by someone else; nothing was changed.
    Conflict { seat: String },
}

pub fn expiry_from_ttl(ttl: Duration) -> DateTime<Utc> {
    Utc::now() + chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::seconds(600))
}
