//! Logging stand-ins for the `ObjectSource`/`ThreadSink` collaborators
//! (`spec.md` §9 design note): this subsystem's object store and thread
//! engine are out of scope, but `cafe-cli` still needs to run standalone, so
//! these log what would have happened instead of wiring in a real store.

use async_trait::async_trait;

use cafe_client::object::{ObjectSource, ObjectSourceError, ThreadSink, ThreadSinkError};
use cafe_types::{CafeId, InboxMessage, TargetId};

/// Reports every object as missing and every pin as a no-op success. Fine
/// for exercising the `STORE` handshake's `CAFE_OBJECT_LIST` branch against
/// a real cafe, but never returns bytes a cafe would actually accept.
pub struct LoggingObjectSource;

#[async_trait]
impl ObjectSource for LoggingObjectSource {
    async fn get(&self, target_id: &TargetId) -> Result<Vec<u8>, ObjectSourceError> {
        log::warn!("no object store wired in; cannot read {target_id}");
        Err(ObjectSourceError::NotFound(target_id.clone()))
    }

    async fn pin(&self, target_id: &TargetId) -> Result<(), ObjectSourceError> {
        log::info!("would pin {target_id} (no object store wired in)");
        Ok(())
    }
}

/// Logs inbound thread blocks/invites and outbound head encryption requests
/// instead of handing them to a real thread log engine.
pub struct LoggingThreadSink;

#[async_trait]
impl ThreadSink for LoggingThreadSink {
    async fn handle_block(&self, message: &InboxMessage) -> Result<(), ThreadSinkError> {
        log::info!("received block {} ({} bytes ciphertext)", message.id, message.ciphertext.len());
        Ok(())
    }

    async fn receive_invite(&self, message: &InboxMessage) -> Result<(), ThreadSinkError> {
        log::info!("received invite {} ({} bytes ciphertext)", message.id, message.ciphertext.len());
        Ok(())
    }

    async fn encrypt_head(&self, thread_id: &TargetId, cafe_id: &CafeId) -> Result<Vec<u8>, ThreadSinkError> {
        log::warn!("no thread engine wired in; cannot encrypt head for {thread_id} at cafe:{cafe_id}");
        Err(ThreadSinkError::UnknownThread(thread_id.clone()))
    }
}
