//! Row types for the three tables of `spec.md` §6:
//! `sessions`, `cafe_requests`, `nonces`.

use chrono::{DateTime, Utc};

use cafe_types::{CafeId, RequestId, RequestKind, RequestStatus, TargetId};

/// `sessions(cafeId PK, access, refresh, expiry)` (`spec.md` §3 `Session`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub cafe_id: CafeId,
    pub access: String,
    pub refresh: String,
    pub expiry: DateTime<Utc>,
}

impl Session {
    /// Whether the access token must be refreshed before the next
    /// authenticated call (`spec.md` §3 invariants, with `skew` applied per
    /// `spec.md` §4.2 `EnsureFresh`).
    pub fn needs_refresh(&self, now: DateTime<Utc>, skew: chrono::Duration) -> bool {
        now + skew >= self.expiry
    }
}

/// `cafe_requests(id PK, targetId, cafeId, type, date, attempts, status)`
/// (`spec.md` §3 `Request`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub id: RequestId,
    pub target_id: TargetId,
    pub cafe_id: CafeId,
    pub kind: RequestKind,
    /// Set at insert; re-anchored to "now" on every failed-attempt revert
    /// (see [`crate::Datastore::revert_to_pending`]). This is the backoff
    /// anchor `spec.md` §4.3's "createdAt + min(cap, base * 2^attempts)"
    /// measures from, kept durable so a crash can't lose the schedule.
    pub created_at: DateTime<Utc>,
    pub attempts: u32,
    pub status: RequestStatus,
}

/// `nonces(value PK, address, date)` (`spec.md` §3 `Nonce`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nonce {
    pub value: String,
    pub address: String,
    pub created_at: DateTime<Utc>,
}

impl Nonce {
    pub fn is_expired(&self, now: DateTime<Utc>, max_age: chrono::Duration) -> bool {
        now - self.created_at > max_age
    }
}
