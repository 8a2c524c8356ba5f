//! `CafeClient`: the thin per-kind RPC façade of `spec.md` §4.5. Stateless
//! beyond the `Sessions` it reads through — every authenticated call
//! interposes `EnsureFresh` and retries exactly once on a 401-equivalent
//! `ERROR` (`spec.md` §4.2 last bullet), grounded on `opcua-client`'s
//! `Session::send_with_retry` (`opcua-client/src/session/retry.rs`).

use std::sync::Arc;
use std::time::Duration;

use cafe_types::{seal, CafeId, InboxMessage, Message, Payload, Signer, TargetId};

use cafe_core::handle::AtomicHandle;

use crate::error::{ErrorKind, RpcError};
use crate::object::ObjectSource;
use crate::session::Sessions;
use crate::transport::Transport;

/// Outcome of a `CAFE_STORE` round trip (`spec.md` §4.3 per-kind semantics).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOutcome {
    /// The server already has every cid; these rows can be deleted.
    Acked(Vec<String>),
    /// The server is missing these cids. The client has just uploaded them;
    /// callers should leave the corresponding rows `Pending` (bumping
    /// `attempts`) for the next dispatch pass, which resends `CAFE_STORE`
    /// for exactly these cids.
    Missing(Vec<String>),
}

pub struct CafeClient {
    transport: Arc<dyn Transport>,
    sessions: Arc<Sessions>,
    signer: Arc<dyn Signer + Send + Sync>,
    handle: AtomicHandle,
    timeout: Duration,
    upload_timeout: Duration,
}

impl CafeClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        sessions: Arc<Sessions>,
        signer: Arc<dyn Signer + Send + Sync>,
        timeout: Duration,
        upload_timeout: Duration,
    ) -> Self {
        Self { transport, sessions, signer, handle: AtomicHandle::default(), timeout, upload_timeout }
    }

    /// Send an authenticated request, refreshing the session first if
    /// needed and retrying exactly once after a 401-equivalent `ERROR`
    /// (`spec.md` §4.2).
    async fn call_authenticated(
        &self,
        cafe_id: &CafeId,
        payload: Payload,
        timeout: Duration,
    ) -> Result<Payload, RpcError> {
        self.sessions.ensure_fresh(cafe_id).await?;
        match self.send(cafe_id, payload.clone(), timeout).await {
            Ok(response) => Ok(response),
            Err(e) if e.kind() == ErrorKind::Unauthorized => {
                self.sessions.ensure_fresh(cafe_id).await?;
                self.send(cafe_id, payload, timeout).await
            }
            Err(e) => Err(e),
        }
    }

    async fn send(&self, cafe_id: &CafeId, payload: Payload, timeout: Duration) -> Result<Payload, RpcError> {
        let request_id = self.handle.next();
        let message = Message::request(request_id, payload);
        let envelope = seal(message, self.signer.as_ref())?;
        let response = self.transport.request(cafe_id, envelope, timeout).await?;
        if let Some((code, text)) = response.as_error_response() {
            return Err(RpcError::Server { code, message: text.to_string() });
        }
        Ok(response.payload)
    }

    /// `spec.md` §4.3 `STORE`: send `CAFE_STORE{cids}`; upload any objects
    /// the server reports missing via `CAFE_OBJECT_LIST`.
    pub async fn store(
        &self,
        cafe_id: &CafeId,
        targets: &[TargetId],
        objects: &dyn ObjectSource,
    ) -> Result<StoreOutcome, RpcError> {
        let cids: Vec<String> = targets.iter().map(|t| t.0.clone()).collect();
        let response = self.call_authenticated(cafe_id, Payload::Store { cids }, self.timeout).await?;
        match response {
            Payload::StoreAck { cids } => Ok(StoreOutcome::Acked(cids)),
            Payload::ObjectList { cids: missing } => {
                for cid in &missing {
                    let bytes = objects
                        .get(&TargetId(cid.clone()))
                        .await
                        .map_err(|e| RpcError::MalformedInput(e.to_string()))?;
                    self.call_authenticated(
                        cafe_id,
                        Payload::Object { cid: cid.clone(), data: bytes },
                        self.upload_timeout,
                    )
                    .await?;
                }
                Ok(StoreOutcome::Missing(missing))
            }
            _ => Err(RpcError::UnexpectedResponse),
        }
    }

    /// `spec.md` §4.3 `UNSTORE`.
    pub async fn unstore(&self, cafe_id: &CafeId, targets: &[TargetId]) -> Result<Vec<String>, RpcError> {
        let cids: Vec<String> = targets.iter().map(|t| t.0.clone()).collect();
        match self.call_authenticated(cafe_id, Payload::Unstore { cids }, self.timeout).await? {
            Payload::UnstoreAck { cids } => Ok(cids),
            _ => Err(RpcError::UnexpectedResponse),
        }
    }

    /// `spec.md` §4.3 `STORE_THREAD`: idempotent on the server.
    pub async fn store_thread(
        &self,
        cafe_id: &CafeId,
        thread_id: &TargetId,
        ciphertext: Vec<u8>,
    ) -> Result<(), RpcError> {
        let payload = Payload::StoreThread { id: thread_id.0.clone(), ciphertext };
        match self.call_authenticated(cafe_id, payload, self.timeout).await? {
            Payload::StoreThreadAck { .. } => Ok(()),
            _ => Err(RpcError::UnexpectedResponse),
        }
    }

    /// `spec.md` §4.3 `UNSTORE_THREAD`.
    pub async fn unstore_thread(&self, cafe_id: &CafeId, thread_id: &TargetId) -> Result<(), RpcError> {
        let payload = Payload::UnstoreThread { id: thread_id.0.clone() };
        match self.call_authenticated(cafe_id, payload, self.timeout).await? {
            Payload::UnstoreThreadAck { .. } => Ok(()),
            _ => Err(RpcError::UnexpectedResponse),
        }
    }

    /// `spec.md` §4.3 `PUBLISH_PEER`.
    pub async fn publish_peer(&self, cafe_id: &CafeId, peer: Vec<u8>) -> Result<(), RpcError> {
        match self.call_authenticated(cafe_id, Payload::PublishPeer { peer }, self.timeout).await? {
            Payload::PublishPeerAck => Ok(()),
            _ => Err(RpcError::UnexpectedResponse),
        }
    }

    /// `spec.md` §4.4 step 1: `CAFE_CHECK_MESSAGES{since}` →
    /// `CAFE_MESSAGES{msgs[]}`.
    pub async fn check_messages(
        &self,
        cafe_id: &CafeId,
        since: chrono::DateTime<chrono::Utc>,
    ) -> Result<Vec<InboxMessage>, RpcError> {
        match self.call_authenticated(cafe_id, Payload::CheckMessages { since }, self.timeout).await? {
            Payload::Messages { msgs } => Ok(msgs),
            _ => Err(RpcError::UnexpectedResponse),
        }
    }

    /// `spec.md` §4.4 step 3: `CAFE_DELETE_MESSAGES{ids}` →
    /// `CAFE_DELETE_MESSAGES_ACK`.
    pub async fn delete_messages(&self, cafe_id: &CafeId, ids: Vec<String>) -> Result<(), RpcError> {
        match self.call_authenticated(cafe_id, Payload::DeleteMessages { ids }, self.timeout).await? {
            Payload::DeleteMessagesAck { .. } => Ok(()),
            _ => Err(RpcError::UnexpectedResponse),
        }
    }
}
