//! `MockTransport`: a [`Transport`] scriptable with canned per-`MessageType`
//! responses or failures, queryable for call counts — grounds Testable
//! Properties 3-6 of `spec.md` §8 (refresh-on-401, opposite cancellation
//! isn't exercised here but backoff/quarantine scenarios are).
//!
//! Grounded on the example pack's test-double-as-its-own-crate shape
//! (`TaceoLabs-oprf-service`'s `oprf-test`/`oprf-test-utils`), adapted from
//! a script-then-replay transport rather than a full mock network stack
//! since this subsystem's seam is a single request/response call.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::broadcast;

use cafe_client::error::RpcError;
use cafe_client::transport::Transport;
use cafe_types::{CafeId, Envelope, Message, MessageType, Payload};

/// One canned outcome for a mocked RPC: either a server payload or a
/// transport-level/server-level error.
#[derive(Debug, Clone)]
pub enum MockOutcome {
    Payload(Payload),
    Error(MockError),
}

/// A `Clone`-able stand-in for [`RpcError`] (which isn't `Clone` since it
/// wraps `thiserror` sources); converted to the real type when dequeued.
#[derive(Debug, Clone)]
pub enum MockError {
    Timeout,
    Transport(String),
    Server { code: u32, message: String },
}

impl From<MockError> for RpcError {
    fn from(e: MockError) -> Self {
        match e {
            MockError::Timeout => RpcError::Timeout,
            MockError::Transport(s) => RpcError::Transport(s),
            MockError::Server { code, message } => RpcError::Server { code, message },
        }
    }
}

#[derive(Default)]
struct Inner {
    queued: HashMap<(CafeId, MessageType), VecDeque<MockOutcome>>,
    calls: Vec<(CafeId, MessageType)>,
}

/// An in-process [`Transport`] whose responses are scripted ahead of time by
/// test code, keyed by `(cafeId, requestMessageType)`. Responses are
/// consumed in FIFO order so a test can script a first-call-fails,
/// second-call-succeeds sequence (`spec.md` §8 Scenario 2, "Missing-object
/// handshake").
#[derive(Default)]
pub struct MockTransport {
    inner: Mutex<Inner>,
    mail_tx: broadcast::Sender<CafeId>,
}

impl MockTransport {
    pub fn new() -> Self {
        let (mail_tx, _) = broadcast::channel(16);
        Self { inner: Mutex::new(Inner::default()), mail_tx }
    }

    /// Queue `outcome` to be returned the next time a request of type
    /// `request_type` is sent to `cafe_id`.
    pub fn queue(&self, cafe_id: &CafeId, request_type: MessageType, outcome: MockOutcome) {
        self.inner.lock().queued.entry((cafe_id.clone(), request_type)).or_default().push_back(outcome);
    }

    pub fn queue_payload(&self, cafe_id: &CafeId, request_type: MessageType, payload: Payload) {
        self.queue(cafe_id, request_type, MockOutcome::Payload(payload));
    }

    pub fn queue_error(&self, cafe_id: &CafeId, request_type: MessageType, error: MockError) {
        self.queue(cafe_id, request_type, MockOutcome::Error(error));
    }

    /// Total number of requests of `request_type` sent to `cafe_id` so far
    /// (`spec.md` §8 Scenario 3: "exactly one refresh call").
    pub fn call_count(&self, cafe_id: &CafeId, request_type: MessageType) -> usize {
        self.inner.lock().calls.iter().filter(|(c, t)| c == cafe_id && *t == request_type).count()
    }

    pub fn total_calls(&self) -> usize {
        self.inner.lock().calls.len()
    }

    /// Simulate a cafe pushing `CAFE_YOU_HAVE_MAIL` (`spec.md` §4.4).
    pub fn push_you_have_mail(&self, cafe_id: CafeId) {
        let _ = self.mail_tx.send(cafe_id);
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn request(&self, cafe_id: &CafeId, envelope: Envelope, _timeout: Duration) -> Result<Message, RpcError> {
        let request_type = envelope.message.message_type();
        let request_id = envelope.message.request_id.unwrap_or(0);

        let outcome = {
            let mut inner = self.inner.lock();
            inner.calls.push((cafe_id.clone(), request_type));
            inner.queued.get_mut(&(cafe_id.clone(), request_type)).and_then(VecDeque::pop_front)
        };

        match outcome {
            Some(MockOutcome::Payload(payload)) => Ok(Message::response(request_id, payload)),
            Some(MockOutcome::Error(e)) => Err(e.into()),
            None => Err(RpcError::Transport(format!(
                "no mock response queued for cafe {cafe_id} request type {request_type:?}"
            ))),
        }
    }

    fn subscribe_you_have_mail(&self) -> broadcast::Receiver<CafeId> {
        self.mail_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cafe_types::CafeId;

    #[tokio::test]
    async fn queued_responses_are_consumed_in_order() {
        let transport = MockTransport::new();
        let cafe = CafeId::from("cafe1");
        transport.queue_payload(&cafe, MessageType::Store, Payload::ObjectList { cids: vec!["a".into()] });
        transport.queue_payload(&cafe, MessageType::Store, Payload::StoreAck { cids: vec!["a".into()] });

        let envelope = Envelope { message: Message::request(1, Payload::Store { cids: vec!["a".into()] }), sig: vec![] };
        let first = transport.request(&cafe, envelope.clone(), Duration::from_secs(1)).await.unwrap();
        assert!(matches!(first.payload, Payload::ObjectList { .. }));

        let second = transport.request(&cafe, envelope, Duration::from_secs(1)).await.unwrap();
        assert!(matches!(second.payload, Payload::StoreAck { .. }));
        assert_eq!(transport.call_count(&cafe, MessageType::Store), 2);
    }

    #[tokio::test]
    async fn unscripted_call_is_a_transport_error() {
        let transport = MockTransport::new();
        let cafe = CafeId::from("cafe1");
        let envelope = Envelope { message: Message::request(1, Payload::PublishPeerAck), sig: vec![] };
        let err = transport.request(&cafe, envelope, Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, RpcError::Transport(_)));
    }
}
