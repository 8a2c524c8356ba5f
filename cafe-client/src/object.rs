//! The `ObjectSource`/`ThreadSink` seams (`spec.md` §9 design notes):
//! breaking the original's closure-captured back-pointer into the node by
//! giving `cafe-queue`/`cafe-inbox` narrow constructor-injected interfaces
//! instead. `spec.md` §6 calls these `ObjectStore.Get`/`Pin` and
//! `Threads.HandleBlock`/`ReceiveInvite`/`EncryptHead`.

use async_trait::async_trait;

use cafe_types::{CafeId, InboxMessage, TargetId};

/// Read (and, after inbox delivery, pin) content-addressed object bytes.
/// Implemented by the node's object store; out of scope for this subsystem
/// (`spec.md` §1).
#[async_trait]
pub trait ObjectSource: Send + Sync {
    async fn get(&self, target_id: &TargetId) -> Result<Vec<u8>, ObjectSourceError>;
    async fn pin(&self, target_id: &TargetId) -> Result<(), ObjectSourceError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ObjectSourceError {
    #[error("object not found: {0}")]
    NotFound(TargetId),
    #[error("object store error: {0}")]
    Other(String),
}

/// Hand inbound thread state to the thread engine, and encrypt an outbound
/// thread head for a cafe. Implemented by the node's thread log engine; out
/// of scope for this subsystem (`spec.md` §1).
#[async_trait]
pub trait ThreadSink: Send + Sync {
    async fn handle_block(&self, message: &InboxMessage) -> Result<(), ThreadSinkError>;
    async fn receive_invite(&self, message: &InboxMessage) -> Result<(), ThreadSinkError>;
    async fn encrypt_head(&self, thread_id: &TargetId, cafe_id: &CafeId) -> Result<Vec<u8>, ThreadSinkError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ThreadSinkError {
    #[error("unknown thread: {0}")]
    UnknownThread(TargetId),
    #[error("thread engine error: {0}")]
    Other(String),
}
