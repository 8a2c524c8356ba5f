//! The `Transport` seam (`spec.md` §6): `Transport.Request(ctx, cafeId,
//! envelope) → envelope, error` plus a subscription for pushed
//! `CAFE_YOU_HAVE_MAIL` notifications. Concrete wire transport is out of
//! scope for this subsystem (`spec.md` §1); `cafe-test-support::MockTransport`
//! is the implementation used in tests.
//!
//! A `Transport` implementation owns the out-of-band sender identity lookup
//! `spec.md` §4.1 "Open" refers to: it calls `cafe_types::open` against the
//! cafe's known public key before handing a [`Message`] back here, so this
//! crate never has to carry cafe public keys in its own state.

use std::time::Duration;

use async_trait::async_trait;
use cafe_types::{CafeId, Envelope, Message};
use tokio::sync::broadcast;

use crate::error::RpcError;

/// One authenticated or unauthenticated round trip to a cafe
/// (`spec.md` §4.5: "given a sealed envelope and a cafe identity, perform
/// one RPC").
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(
        &self,
        cafe_id: &CafeId,
        envelope: Envelope,
        timeout: Duration,
    ) -> Result<Message, RpcError>;

    /// A channel that receives a cafe id every time that cafe pushes a
    /// `CAFE_YOU_HAVE_MAIL` envelope (`spec.md` §6
    /// `Transport.Subscribe(type)`). Each call returns an independent
    /// receiver so the inbox poller and any other subscriber don't steal
    /// each other's notifications.
    fn subscribe_you_have_mail(&self) -> broadcast::Receiver<CafeId>;
}
