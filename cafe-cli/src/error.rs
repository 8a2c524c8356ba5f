//! Maps every error this binary can produce to one of the three non-zero
//! exit codes `spec.md` §6 defines for the CLI: 1 local error, 2 network
//! error, 3 unauthorized.

use cafe_client::error::{ErrorKind, RpcError};

use crate::node::NodeError;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Node(#[from] NodeError),
    #[error(transparent)]
    Rpc(#[from] RpcError),
    #[error(transparent)]
    Queue(#[from] cafe_queue::QueueError),
    #[error(transparent)]
    Inbox(#[from] cafe_inbox::InboxError),
    #[error("no session for cafe {0}")]
    NoSuchCafe(String),
}

impl CliError {
    /// `0` is reserved for success; this is only called on the `Err` arm.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Rpc(e) => rpc_exit_code(e),
            CliError::Inbox(cafe_inbox::InboxError::Rpc(e)) => rpc_exit_code(e),
            CliError::Queue(cafe_queue::QueueError::Store(_)) => 1,
            CliError::Queue(cafe_queue::QueueError::MalformedInput(_)) => 1,
            CliError::Inbox(cafe_inbox::InboxError::ObjectSource(_)) => 1,
            CliError::Node(_) | CliError::NoSuchCafe(_) => 1,
        }
    }
}

fn rpc_exit_code(e: &RpcError) -> i32 {
    match e.kind() {
        ErrorKind::Unauthorized => 3,
        ErrorKind::Transient => 2,
        ErrorKind::MalformedInput | ErrorKind::Fatal => 1,
    }
}
