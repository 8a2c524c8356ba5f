//! A fast, in-memory [`Datastore`] for unit tests that don't need sqlite.
//! Behaves identically to `cafe_store::SqliteStore` with respect to the
//! invariants of `spec.md` §3, just without durability across a process
//! restart (restart-durability is exercised against `SqliteStore` directly).

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use cafe_store::{Datastore, Nonce, Request, Session, StoreError};
use cafe_types::{CafeId, RequestId, RequestKind, RequestStatus, TargetId};

#[derive(Default)]
pub struct MemoryStore {
    sessions: Mutex<HashMap<CafeId, Session>>,
    requests: Mutex<HashMap<RequestId, Request>>,
    nonces: Mutex<HashMap<String, Nonce>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Datastore for MemoryStore {
    async fn get_session(&self, cafe_id: &CafeId) -> Result<Option<Session>, StoreError> {
        Ok(self.sessions.lock().get(cafe_id).cloned())
    }

    async fn put_session(&self, session: Session) -> Result<(), StoreError> {
        self.sessions.lock().insert(session.cafe_id.clone(), session);
        Ok(())
    }

    async fn delete_session(&self, cafe_id: &CafeId) -> Result<(), StoreError> {
        self.sessions.lock().remove(cafe_id);
        Ok(())
    }

    async fn list_sessions(&self) -> Result<Vec<Session>, StoreError> {
        Ok(self.sessions.lock().values().cloned().collect())
    }

    async fn insert_request(&self, request: Request) -> Result<(), StoreError> {
        self.requests.lock().insert(request.id, request);
        Ok(())
    }

    async fn get_request(&self, id: RequestId) -> Result<Option<Request>, StoreError> {
        Ok(self.requests.lock().get(&id).cloned())
    }

    async fn delete_request(&self, id: RequestId) -> Result<(), StoreError> {
        self.requests.lock().remove(&id);
        Ok(())
    }

    async fn find_pending_request(
        &self,
        target_id: &TargetId,
        cafe_id: &CafeId,
        kind: RequestKind,
    ) -> Result<Option<Request>, StoreError> {
        Ok(self
            .requests
            .lock()
            .values()
            .find(|r| {
                &r.target_id == target_id && &r.cafe_id == cafe_id && r.kind == kind && r.status == RequestStatus::Pending
            })
            .cloned())
    }

    async fn list_pending_requests(&self) -> Result<Vec<Request>, StoreError> {
        Ok(self.requests.lock().values().filter(|r| r.status == RequestStatus::Pending).cloned().collect())
    }

    async fn list_failed_requests(&self) -> Result<Vec<Request>, StoreError> {
        Ok(self.requests.lock().values().filter(|r| r.status == RequestStatus::Failed).cloned().collect())
    }

    async fn mark_in_flight(&self, id: RequestId) -> Result<(), StoreError> {
        if let Some(r) = self.requests.lock().get_mut(&id) {
            r.status = RequestStatus::InFlight;
        }
        Ok(())
    }

    async fn revert_to_pending(&self, id: RequestId, attempts: u32, touched_at: DateTime<Utc>) -> Result<(), StoreError> {
        if let Some(r) = self.requests.lock().get_mut(&id) {
            r.status = RequestStatus::Pending;
            r.attempts = attempts;
            r.created_at = touched_at;
        }
        Ok(())
    }

    async fn mark_failed(&self, id: RequestId) -> Result<(), StoreError> {
        if let Some(r) = self.requests.lock().get_mut(&id) {
            r.status = RequestStatus::Failed;
        }
        Ok(())
    }

    async fn fail_all_for_cafe(&self, cafe_id: &CafeId) -> Result<(), StoreError> {
        for r in self.requests.lock().values_mut() {
            if &r.cafe_id == cafe_id {
                r.status = RequestStatus::Failed;
            }
        }
        Ok(())
    }

    async fn retry_failed(&self, id: RequestId) -> Result<(), StoreError> {
        if let Some(r) = self.requests.lock().get_mut(&id) {
            r.status = RequestStatus::Pending;
            r.attempts = 0;
        }
        Ok(())
    }

    async fn put_nonce(&self, nonce: Nonce) -> Result<(), StoreError> {
        self.nonces.lock().insert(nonce.value.clone(), nonce);
        Ok(())
    }

    async fn take_nonce(&self, value: &str) -> Result<Option<Nonce>, StoreError> {
        Ok(self.nonces.lock().remove(value))
    }

    async fn purge_expired_nonces(&self, older_than: DateTime<Utc>) -> Result<(), StoreError> {
        self.nonces.lock().retain(|_, n| n.created_at >= older_than);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_then_find_round_trips() {
        let store = MemoryStore::new();
        let request = Request {
            id: RequestId(1, 0),
            target_id: TargetId::from("QmA"),
            cafe_id: CafeId::from("cafe1"),
            kind: RequestKind::Store,
            created_at: Utc::now(),
            attempts: 0,
            status: RequestStatus::Pending,
        };
        store.insert_request(request.clone()).await.unwrap();
        let found = store.find_pending_request(&request.target_id, &request.cafe_id, RequestKind::Store).await.unwrap();
        assert_eq!(found.unwrap().id, request.id);
    }
}
