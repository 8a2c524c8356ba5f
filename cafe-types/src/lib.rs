//! Wire types and envelope codec shared by every crate in the cafe client
//! workspace: message numbering, request/target/cafe ids, request kind and
//! status, and the sign/verify seam used to seal and open envelopes.

pub mod envelope;
pub mod ids;
pub mod kind;
pub mod message;

#[cfg(test)]
mod tests;

pub use envelope::{decode_envelope, encode_envelope, open, seal, CodecError, Envelope, Message, Signer, Verifier};
pub use ids::{CafeId, ParseRequestIdError, RequestId, TargetId};
pub use kind::{RequestKind, RequestStatus};
pub use message::{InboxMessage, InboxMessageKind, MessageType, Payload};
