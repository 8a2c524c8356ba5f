//! The `Datastore` seam (`spec.md` §6). `cafe-sqlite` (this crate's
//! [`sqlite::SqliteStore`](crate::sqlite::SqliteStore)) is the production
//! implementation; `cafe-test-support` provides an in-memory one for fast
//! unit tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use cafe_types::{CafeId, RequestId, RequestKind, TargetId};

use crate::error::StoreError;
use crate::model::{Nonce, Request, Session};

/// Durable storage for the three tables the cafe client subsystem owns.
/// The request queue exclusively owns request-row mutations; the session
/// table is read by the cafe client but only written by the session-refresh
/// code path (`spec.md` §3 "Ownership").
#[async_trait]
pub trait Datastore: Send + Sync {
    async fn get_session(&self, cafe_id: &CafeId) -> Result<Option<Session>, StoreError>;
    async fn put_session(&self, session: Session) -> Result<(), StoreError>;
    async fn delete_session(&self, cafe_id: &CafeId) -> Result<(), StoreError>;
    async fn list_sessions(&self) -> Result<Vec<Session>, StoreError>;

    /// Insert a new request row. Callers (the request queue) are
    /// responsible for checking [`Self::find_pending_request`] and applying
    /// opposite-cancellation before calling this, per `spec.md` §3
    /// invariants.
    async fn insert_request(&self, request: Request) -> Result<(), StoreError>;
    async fn get_request(&self, id: RequestId) -> Result<Option<Request>, StoreError>;
    async fn delete_request(&self, id: RequestId) -> Result<(), StoreError>;
    async fn find_pending_request(
        &self,
        target_id: &TargetId,
        cafe_id: &CafeId,
        kind: RequestKind,
    ) -> Result<Option<Request>, StoreError>;
    async fn list_pending_requests(&self) -> Result<Vec<Request>, StoreError>;
    async fn list_failed_requests(&self) -> Result<Vec<Request>, StoreError>;
    async fn mark_in_flight(&self, id: RequestId) -> Result<(), StoreError>;
    /// Revert an in-flight row to `Pending` after a retryable failure,
    /// bumping `attempts` and resetting `created_at` to `touched_at` — the
    /// backoff anchor for the next attempt (`spec.md` §4.3 dispatch policy:
    /// "scheduled next-attempt time = createdAt + min(cap, base *
    /// 2^attempts)"; each failure re-anchors the clock so the interval
    /// between consecutive attempts actually doubles).
    async fn revert_to_pending(
        &self,
        id: RequestId,
        attempts: u32,
        touched_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
    async fn mark_failed(&self, id: RequestId) -> Result<(), StoreError>;
    /// Move every pending/in-flight row for `cafe_id` to `Failed`, used when
    /// a session is torn down after an unrecoverable `Unauthorized` error
    /// (`spec.md` §7).
    async fn fail_all_for_cafe(&self, cafe_id: &CafeId) -> Result<(), StoreError>;
    /// Reset a `Failed` row back to `Pending` with `attempts` cleared — the
    /// operator-visible manual retry path (`spec.md` §9 Open Questions,
    /// resolved in `DESIGN.md`).
    async fn retry_failed(&self, id: RequestId) -> Result<(), StoreError>;

    async fn put_nonce(&self, nonce: Nonce) -> Result<(), StoreError>;
    /// Consume a nonce: return it and delete it atomically
    /// (`spec.md` §3 `Nonce` lifecycle: "deleted when consumed").
    async fn take_nonce(&self, value: &str) -> Result<Option<Nonce>, StoreError>;
    async fn purge_expired_nonces(&self, older_than: DateTime<Utc>) -> Result<(), StoreError>;
}
