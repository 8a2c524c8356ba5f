//! Builders for the two durable row types, used to seed a [`Datastore`]
//! double without repeating every field at each call site
//! (`spec.md` §8 Scenarios, e.g. "Seed one active session `c1`").

use chrono::{Duration, Utc};

use cafe_store::{Request, Session};
use cafe_types::{CafeId, RequestId, RequestKind, RequestStatus, TargetId};

/// An active session for `cafe_id`, expiring one hour from now.
pub fn active_session(cafe_id: &str) -> Session {
    Session {
        cafe_id: CafeId::from(cafe_id),
        access: format!("access-{cafe_id}"),
        refresh: format!("refresh-{cafe_id}"),
        expiry: Utc::now() + Duration::hours(1),
    }
}

/// A session whose access token is already expired, to exercise
/// `spec.md` §4.2 `EnsureFresh`/refresh-on-401.
pub fn expired_session(cafe_id: &str) -> Session {
    Session {
        cafe_id: CafeId::from(cafe_id),
        access: format!("stale-access-{cafe_id}"),
        refresh: format!("refresh-{cafe_id}"),
        expiry: Utc::now() - Duration::minutes(1),
    }
}

/// A fresh `Pending` request row, `attempts = 0`, `created_at = now`.
pub fn pending_request(id: RequestId, target_id: &str, cafe_id: &str, kind: RequestKind) -> Request {
    Request {
        id,
        target_id: TargetId::from(target_id),
        cafe_id: CafeId::from(cafe_id),
        kind,
        created_at: Utc::now(),
        attempts: 0,
        status: RequestStatus::Pending,
    }
}
