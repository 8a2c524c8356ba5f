//! The narrow seam the dispatcher uses to drive an `INBOX`-kind row
//! (`spec.md` §4.3 Grouping: "INBOX ... degenerate group of one"). The cafe
//! client subsystem's own inbox poller (`cafe-inbox`) implements this so
//! `Queue.Put(INBOX, "", [cafeId])` can ask for an out-of-cycle check without
//! `cafe-queue` depending on `cafe-inbox` directly (that dependency would run
//! the other way: `cafe-inbox` polls on its own schedule and doesn't need the
//! queue at all, but a caller that wants a one-shot manual check enqueues an
//! `INBOX` row and the dispatcher routes it here).

use async_trait::async_trait;

use cafe_types::CafeId;

#[async_trait]
pub trait InboxTrigger: Send + Sync {
    async fn check_now(&self, cafe_id: &CafeId) -> Result<(), cafe_client::error::RpcError>;
}
