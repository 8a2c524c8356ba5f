//! Session lifecycle: `Register`, `EnsureFresh`, `Deregister`
//! (`spec.md` §4.2), exposed to upstream callers as `Sessions::*`
//! (`spec.md` §6).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use cafe_types::{seal, CafeId, Message, Payload, Signer};

use cafe_core::clock::Clock;
use cafe_core::handle::AtomicHandle;
use cafe_core::sync::Mutex;
use cafe_store::{Datastore, Session};

use crate::error::RpcError;
use crate::macros::{cafe_debug, cafe_warn};
use crate::transport::Transport;

/// Deregistration is retried up to this many times before the session row
/// is deleted regardless of the network outcome (`spec.md` §4.2
/// `Deregister`: "deletion is performed even if the network call fails
/// after N attempts").
const DEREGISTER_ATTEMPTS: u32 = 3;

/// `Sessions::register`/`deregister`/`list` (`spec.md` §6), plus the
/// internal `ensure_fresh` the cafe client interposes on every authenticated
/// call.
pub struct Sessions {
    transport: Arc<dyn Transport>,
    store: Arc<dyn Datastore>,
    signer: Arc<dyn Signer + Send + Sync>,
    /// The account address `CAFE_CHALLENGE`/`CAFE_REGISTRATION` identify
    /// this node by. Algorithm-specific derivation (e.g. a hex-encoded
    /// Ed25519 public key) lives in `cafe-crypto::Identity::address`; this
    /// crate only needs the resulting string.
    address: String,
    clock: Arc<dyn Clock>,
    handle: AtomicHandle,
    refresh_locks: Mutex<HashMap<CafeId, Arc<tokio::sync::Mutex<()>>>>,
    refresh_skew: chrono::Duration,
    timeout: Duration,
}

impl Sessions {
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<dyn Datastore>,
        signer: Arc<dyn Signer + Send + Sync>,
        address: String,
        clock: Arc<dyn Clock>,
        refresh_skew: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            transport,
            store,
            signer,
            address,
            clock,
            handle: AtomicHandle::default(),
            refresh_locks: Mutex::new(HashMap::new()),
            refresh_skew: chrono::Duration::from_std(refresh_skew).unwrap_or(chrono::Duration::zero()),
            timeout,
        }
    }

    async fn call(&self, cafe_id: &CafeId, payload: Payload) -> Result<Payload, RpcError> {
        let request_id = self.handle.next();
        let message = Message::request(request_id, payload);
        let envelope = seal(message, self.signer.as_ref())?;
        let response = self.transport.request(cafe_id, envelope, self.timeout).await?;
        if let Some((code, text)) = response.as_error_response() {
            return Err(RpcError::Server { code, message: text.to_string() });
        }
        Ok(response.payload)
    }

    /// `spec.md` §4.2 `Register`: challenge/nonce/registration handshake,
    /// persisting the resulting session atomically.
    pub async fn register(&self, cafe_id: CafeId, token: String) -> Result<Session, RpcError> {
        let account_address = self.address.clone();
        let nonce = match self.call(&cafe_id, Payload::Challenge { account_address: account_address.clone() }).await? {
            Payload::Nonce { value } => value,
            _ => return Err(RpcError::UnexpectedResponse),
        };
        let sig = {
            let mut bytes = Vec::with_capacity(nonce.len() + account_address.len());
            bytes.extend_from_slice(nonce.as_bytes());
            bytes.extend_from_slice(account_address.as_bytes());
            self.signer.sign(&bytes)
        };
        let registration = Payload::Registration {
            address: account_address,
            nonce,
            sig,
            token,
        };
        let (access, refresh, expiry) = match self.call(&cafe_id, registration).await? {
            Payload::Session { access, refresh, expiry } => (access, refresh, expiry),
            _ => return Err(RpcError::UnexpectedResponse),
        };
        let session = Session { cafe_id, access, refresh, expiry };
        self.store.put_session(session.clone()).await?;
        Ok(session)
    }

    pub async fn get(&self, cafe_id: &CafeId) -> Result<Option<Session>, RpcError> {
        Ok(self.store.get_session(cafe_id).await?)
    }

    pub async fn list(&self) -> Result<Vec<Session>, RpcError> {
        Ok(self.store.list_sessions().await?)
    }

    /// `spec.md` §4.2 `EnsureFresh`: refresh is single-flight per cafe;
    /// concurrent callers block on the same per-cafe lock rather than each
    /// issuing their own `CAFE_REFRESH_SESSION` (Testable Property 5).
    pub async fn ensure_fresh(&self, cafe_id: &CafeId) -> Result<Session, RpcError> {
        let session = self.store.get_session(cafe_id).await?.ok_or(RpcError::NoSession)?;
        if !session.needs_refresh(self.clock.now(), self.refresh_skew) {
            return Ok(session);
        }

        let lock = self.refresh_lock_for(cafe_id);
        let _guard = lock.lock().await;

        // Re-check after acquiring the lock: another caller may have just
        // refreshed while we were waiting.
        let session = self.store.get_session(cafe_id).await?.ok_or(RpcError::NoSession)?;
        if !session.needs_refresh(self.clock.now(), self.refresh_skew) {
            return Ok(session);
        }

        cafe_debug!(cafe_id, "refreshing session");
        let refreshed = self
            .call(cafe_id, Payload::RefreshSession { access: session.access, refresh: session.refresh })
            .await;

        match refreshed {
            Ok(Payload::Session { access, refresh, expiry }) => {
                let session = Session { cafe_id: cafe_id.clone(), access, refresh, expiry };
                self.store.put_session(session.clone()).await?;
                Ok(session)
            }
            Ok(_) => Err(RpcError::UnexpectedResponse),
            Err(e) if e.kind() == crate::error::ErrorKind::Unauthorized => {
                cafe_warn!(cafe_id, "refresh failed as unauthorized, tearing down session");
                self.store.delete_session(cafe_id).await?;
                Err(RpcError::Unauthorized)
            }
            Err(e) => Err(e),
        }
    }

    /// `spec.md` §4.2 `Deregister`.
    pub async fn deregister(&self, cafe_id: &CafeId) -> Result<(), RpcError> {
        if let Some(session) = self.store.get_session(cafe_id).await? {
            let mut last_err = None;
            for attempt in 0..DEREGISTER_ATTEMPTS {
                match self.call(cafe_id, Payload::Deregistration { access: session.access.clone() }).await {
                    Ok(Payload::DeregistrationAck) => {
                        last_err = None;
                        break;
                    }
                    Ok(_) => {
                        last_err = Some(RpcError::UnexpectedResponse);
                        break;
                    }
                    Err(e) => {
                        cafe_warn!(cafe_id, "deregistration attempt {attempt} failed: {e}");
                        last_err = Some(e);
                    }
                }
            }
            // Deletion happens regardless of network outcome.
            self.store.delete_session(cafe_id).await?;
            if let Some(e) = last_err {
                cafe_warn!(cafe_id, "deregistered locally despite remote error: {e}");
            }
        }
        Ok(())
    }

    fn refresh_lock_for(&self, cafe_id: &CafeId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.refresh_locks.lock();
        locks.entry(cafe_id.clone()).or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))).clone()
    }
}
