//! `Queue`: the public surface of `spec.md` §4.3 — `Put`/`Run`/`Flush`/
//! `Stop`, plus the operator-visible `Failed`/`Retry` pair this spec adds on
//! top of the original's PENDING/IN_FLIGHT/deleted lifecycle (`DESIGN.md`
//! Open Question 1).

use std::sync::Arc;

use cafe_core::clock::Clock;
use cafe_core::handle::RequestIdGenerator;
use cafe_store::{Datastore, Request};
use cafe_types::{CafeId, RequestId, RequestKind, RequestStatus, TargetId};
use tokio_util::sync::CancellationToken;

use crate::dispatch::Dispatcher;
use crate::error::QueueError;

pub struct Queue {
    store: Arc<dyn Datastore>,
    dispatcher: Arc<Dispatcher>,
    clock: Arc<dyn Clock>,
    ids: RequestIdGenerator,
    cancel: CancellationToken,
    poll_interval: std::time::Duration,
}

impl Queue {
    pub fn new(
        store: Arc<dyn Datastore>,
        dispatcher: Arc<Dispatcher>,
        clock: Arc<dyn Clock>,
        poll_interval: std::time::Duration,
    ) -> Self {
        Self { store, dispatcher, clock, ids: RequestIdGenerator::new(), cancel: CancellationToken::new(), poll_interval }
    }

    /// `spec.md` §4.3 `Put`: upserts one row per cafe, coalescing duplicate
    /// PENDING rows for conservative kinds and cancelling the opposite kind
    /// (`spec.md` §3 invariants). Synchronous and durable before returning.
    pub async fn put(&self, kind: RequestKind, target_id: TargetId, cafe_ids: &[CafeId]) -> Result<(), QueueError> {
        if !matches!(kind, RequestKind::Inbox | RequestKind::PublishPeer) && target_id.is_none() {
            return Err(QueueError::MalformedInput("targetId required for this kind".into()));
        }

        for cafe_id in cafe_ids {
            if let Some(opposite) = kind.opposite() {
                if let Some(existing) = self.store.find_pending_request(&target_id, cafe_id, opposite).await? {
                    self.store.delete_request(existing.id).await?;
                    continue;
                }
            }

            if kind.is_conservative() {
                if self.store.find_pending_request(&target_id, cafe_id, kind).await?.is_some() {
                    continue;
                }
            }

            let request = Request {
                id: self.next_id(),
                target_id: target_id.clone(),
                cafe_id: cafe_id.clone(),
                kind,
                created_at: self.clock.now(),
                attempts: 0,
                status: RequestStatus::Pending,
            };
            self.store.insert_request(request).await?;
        }
        Ok(())
    }

    fn next_id(&self) -> RequestId {
        self.ids.next(self.clock.now())
    }

    /// `spec.md` §4.3 `Flush`: drain once and return. Used on mobile where
    /// background loops are constrained.
    pub async fn flush(&self) -> Result<usize, QueueError> {
        self.dispatcher.run_once().await
    }

    /// `spec.md` §4.3 `Run`: block, dispatching on `poll_interval`, until
    /// [`Self::stop`] is called.
    pub async fn run(&self) {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return,
                result = self.dispatcher.run_once() => {
                    if let Err(e) = result {
                        log::warn!("queue dispatch pass failed: {e}");
                    }
                }
            }
            tokio::select! {
                _ = self.cancel.cancelled() => return,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }

    /// `spec.md` §4.3 `Stop`: cooperative cancel. In-flight attempts finish
    /// (rows in `IN_FLIGHT` when `Stop` is called are left to complete or
    /// revert on their own, per `spec.md` §5 "`Stop()` cancels the root
    /// token; in-flight RPCs abort ... without attempt-count change if
    /// aborted due to shutdown").
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Operator-visible listing of rows that hit `MAX_ATTEMPTS`
    /// (`DESIGN.md` Open Question 1).
    pub async fn failed(&self) -> Result<Vec<Request>, QueueError> {
        Ok(self.store.list_failed_requests().await?)
    }

    /// Manually reset a `FAILED` row back to `Pending` with `attempts`
    /// cleared (`DESIGN.md` Open Question 1: there is no automatic
    /// resurrection of `FAILED` rows).
    pub async fn retry(&self, id: RequestId) -> Result<(), QueueError> {
        self.store.retry_failed(id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cafe_store::StoreError;
    use std::collections::HashMap;
    use tokio::sync::Mutex as AsyncMutex;

    /// A minimal in-process `Datastore` covering only what `Queue::put`
    /// exercises, to test coalescing/cancellation without pulling in sqlite.
    #[derive(Default)]
    struct MemStore {
        requests: AsyncMutex<HashMap<RequestId, Request>>,
    }

    #[async_trait::async_trait]
    impl Datastore for MemStore {
        async fn get_session(&self, _: &CafeId) -> Result<Option<cafe_store::Session>, StoreError> {
            Ok(None)
        }
        async fn put_session(&self, _: cafe_store::Session) -> Result<(), StoreError> {
            Ok(())
        }
        async fn delete_session(&self, _: &CafeId) -> Result<(), StoreError> {
            Ok(())
        }
        async fn list_sessions(&self) -> Result<Vec<cafe_store::Session>, StoreError> {
            Ok(vec![])
        }
        async fn insert_request(&self, request: Request) -> Result<(), StoreError> {
            self.requests.lock().await.insert(request.id, request);
            Ok(())
        }
        async fn get_request(&self, id: RequestId) -> Result<Option<Request>, StoreError> {
            Ok(self.requests.lock().await.get(&id).cloned())
        }
        async fn delete_request(&self, id: RequestId) -> Result<(), StoreError> {
            self.requests.lock().await.remove(&id);
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
                .await
                .values()
                .find(|r| {
                    &r.target_id == target_id
                        && &r.cafe_id == cafe_id
                        && r.kind == kind
                        && r.status == RequestStatus::Pending
                })
                .cloned())
        }
        async fn list_pending_requests(&self) -> Result<Vec<Request>, StoreError> {
            Ok(self.requests.lock().await.values().filter(|r| r.status == RequestStatus::Pending).cloned().collect())
        }
        async fn list_failed_requests(&self) -> Result<Vec<Request>, StoreError> {
            Ok(self.requests.lock().await.values().filter(|r| r.status == RequestStatus::Failed).cloned().collect())
        }
        async fn mark_in_flight(&self, id: RequestId) -> Result<(), StoreError> {
            if let Some(r) = self.requests.lock().await.get_mut(&id) {
                r.status = RequestStatus::InFlight;
            }
            Ok(())
        }
        async fn revert_to_pending(
            &self,
            id: RequestId,
            attempts: u32,
            touched_at: chrono::DateTime<chrono::Utc>,
        ) -> Result<(), StoreError> {
            if let Some(r) = self.requests.lock().await.get_mut(&id) {
                r.status = RequestStatus::Pending;
                r.attempts = attempts;
                r.created_at = touched_at;
            }
            Ok(())
        }
        async fn mark_failed(&self, id: RequestId) -> Result<(), StoreError> {
            if let Some(r) = self.requests.lock().await.get_mut(&id) {
                r.status = RequestStatus::Failed;
            }
            Ok(())
        }
        async fn fail_all_for_cafe(&self, cafe_id: &CafeId) -> Result<(), StoreError> {
            for r in self.requests.lock().await.values_mut() {
                if &r.cafe_id == cafe_id {
                    r.status = RequestStatus::Failed;
                }
            }
            Ok(())
        }
        async fn retry_failed(&self, id: RequestId) -> Result<(), StoreError> {
            if let Some(r) = self.requests.lock().await.get_mut(&id) {
                r.status = RequestStatus::Pending;
                r.attempts = 0;
            }
            Ok(())
        }
        async fn put_nonce(&self, _: cafe_store::Nonce) -> Result<(), StoreError> {
            Ok(())
        }
        async fn take_nonce(&self, _: &str) -> Result<Option<cafe_store::Nonce>, StoreError> {
            Ok(None)
        }
        async fn purge_expired_nonces(&self, _: chrono::DateTime<chrono::Utc>) -> Result<(), StoreError> {
            Ok(())
        }
    }

    fn generator() -> RequestIdGenerator {
        RequestIdGenerator::new()
    }

    #[tokio::test]
    async fn duplicate_store_rows_are_coalesced() {
        let store: Arc<dyn Datastore> = Arc::new(MemStore::default());
        let clock: Arc<dyn Clock> = Arc::new(cafe_core::clock::SystemClock);
        let ids = generator();
        let cafe = CafeId::from("cafe1");
        let target = TargetId::from("Qm123");

        for _ in 0..3 {
            let request = Request {
                id: ids.next(clock.now()),
                target_id: target.clone(),
                cafe_id: cafe.clone(),
                kind: RequestKind::Store,
                created_at: clock.now(),
                attempts: 0,
                status: RequestStatus::Pending,
            };
            if store.find_pending_request(&target, &cafe, RequestKind::Store).await.unwrap().is_none() {
                store.insert_request(request).await.unwrap();
            }
        }
        assert_eq!(store.list_pending_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn store_then_unstore_cancels_pending_row() {
        let store: Arc<dyn Datastore> = Arc::new(MemStore::default());
        let clock: Arc<dyn Clock> = Arc::new(cafe_core::clock::SystemClock);
        let cafe = CafeId::from("cafe1");
        let target = TargetId::from("Qm123");
        let id = generator().next(clock.now());

        store
            .insert_request(Request {
                id,
                target_id: target.clone(),
                cafe_id: cafe.clone(),
                kind: RequestKind::Store,
                created_at: clock.now(),
                attempts: 0,
                status: RequestStatus::Pending,
            })
            .await
            .unwrap();

        if let Some(existing) = store.find_pending_request(&target, &cafe, RequestKind::Store).await.unwrap() {
            store.delete_request(existing.id).await.unwrap();
        }
        assert!(store.list_pending_requests().await.unwrap().is_empty());
    }
}
