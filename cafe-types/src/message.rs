//! Message type numbering and payloads.
//!
//! Numbering is fixed by the wire protocol this subsystem talks and must be
//! preserved byte-exact: any renumbering breaks compatibility with every
//! cafe already running the old numbers.

use serde::{Deserialize, Serialize};

/// The wire-visible discriminant of a [`Payload`]. Values are load-bearing —
/// do not renumber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum MessageType {
    Challenge = 50,
    Nonce = 51,
    Registration = 52,
    Session = 53,
    RefreshSession = 54,
    Store = 55,
    Object = 56,
    ObjectList = 57,
    StoreThread = 58,
    StoreAck = 59,
    DeliverMessage = 60,
    CheckMessages = 61,
    Messages = 62,
    DeleteMessages = 63,
    DeleteMessagesAck = 64,
    YouHaveMail = 65,
    PublishPeer = 66,
    PublishPeerAck = 67,
    Deregistration = 72,
    DeregistrationAck = 73,
    Unstore = 74,
    UnstoreAck = 75,
    StoreThreadAck = 76,
    UnstoreThread = 77,
    UnstoreThreadAck = 78,
    Error = 500,
}

impl MessageType {
    /// Recover a [`MessageType`] from its wire discriminant, failing closed
    /// on anything this build doesn't know about.
    pub fn from_u32(v: u32) -> Option<Self> {
        Some(match v {
            50 => Self::Challenge,
            51 => Self::Nonce,
            52 => Self::Registration,
            53 => Self::Session,
            54 => Self::RefreshSession,
            55 => Self::Store,
            56 => Self::Object,
            57 => Self::ObjectList,
            58 => Self::StoreThread,
            59 => Self::StoreAck,
            60 => Self::DeliverMessage,
            61 => Self::CheckMessages,
            62 => Self::Messages,
            63 => Self::DeleteMessages,
            64 => Self::DeleteMessagesAck,
            65 => Self::YouHaveMail,
            66 => Self::PublishPeer,
            67 => Self::PublishPeerAck,
            72 => Self::Deregistration,
            73 => Self::DeregistrationAck,
            74 => Self::Unstore,
            75 => Self::UnstoreAck,
            76 => Self::StoreThreadAck,
            77 => Self::UnstoreThread,
            78 => Self::UnstoreThreadAck,
            500 => Self::Error,
            _ => return None,
        })
    }
}

/// A message ingested from `CAFE_MESSAGES`, destined for the thread engine.
/// `kind` mirrors the "outer envelope type" `spec.md` §4.4 uses to pick
/// between `Threads::receive_invite` and `Threads::handle_block`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboxMessage {
    pub id: String,
    pub kind: InboxMessageKind,
    pub ciphertext: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InboxMessageKind {
    Invite,
    Block,
}

/// The typed body of a [`Message`](crate::envelope::Message). One variant per
/// [`MessageType`]; the variant is always consistent with
/// [`Payload::message_type`] — there is no way to construct a payload whose
/// tag disagrees with its body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    Challenge { account_address: String },
    Nonce { value: String },
    Registration { address: String, nonce: String, sig: Vec<u8>, token: String },
    Session { access: String, refresh: String, expiry: chrono::DateTime<chrono::Utc> },
    RefreshSession { access: String, refresh: String },
    Store { cids: Vec<String> },
    Object { cid: String, data: Vec<u8> },
    ObjectList { cids: Vec<String> },
    StoreThread { id: String, ciphertext: Vec<u8> },
    StoreAck { cids: Vec<String> },
    DeliverMessage(InboxMessage),
    CheckMessages { since: chrono::DateTime<chrono::Utc> },
    Messages { msgs: Vec<InboxMessage> },
    DeleteMessages { ids: Vec<String> },
    DeleteMessagesAck { ids: Vec<String> },
    YouHaveMail,
    PublishPeer { peer: Vec<u8> },
    PublishPeerAck,
    Deregistration { access: String },
    DeregistrationAck,
    Unstore { cids: Vec<String> },
    UnstoreAck { cids: Vec<String> },
    StoreThreadAck { id: String },
    UnstoreThread { id: String },
    UnstoreThreadAck { id: String },
    Error { code: u32, message: String },
}

impl Payload {
    /// The wire type tag for this payload. Kept as a method rather than a
    /// stored field so the tag can never drift out of sync with the body.
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::Challenge { .. } => MessageType::Challenge,
            Self::Nonce { .. } => MessageType::Nonce,
            Self::Registration { .. } => MessageType::Registration,
            Self::Session { .. } => MessageType::Session,
            Self::RefreshSession { .. } => MessageType::RefreshSession,
            Self::Store { .. } => MessageType::Store,
            Self::Object { .. } => MessageType::Object,
            Self::ObjectList { .. } => MessageType::ObjectList,
            Self::StoreThread { .. } => MessageType::StoreThread,
            Self::StoreAck { .. } => MessageType::StoreAck,
            Self::DeliverMessage(_) => MessageType::DeliverMessage,
            Self::CheckMessages { .. } => MessageType::CheckMessages,
            Self::Messages { .. } => MessageType::Messages,
            Self::DeleteMessages { .. } => MessageType::DeleteMessages,
            Self::DeleteMessagesAck { .. } => MessageType::DeleteMessagesAck,
            Self::YouHaveMail => MessageType::YouHaveMail,
            Self::PublishPeer { .. } => MessageType::PublishPeer,
            Self::PublishPeerAck => MessageType::PublishPeerAck,
            Self::Deregistration { .. } => MessageType::Deregistration,
            Self::DeregistrationAck => MessageType::DeregistrationAck,
            Self::Unstore { .. } => MessageType::Unstore,
            Self::UnstoreAck { .. } => MessageType::UnstoreAck,
            Self::StoreThreadAck { .. } => MessageType::StoreThreadAck,
            Self::UnstoreThread { .. } => MessageType::UnstoreThread,
            Self::UnstoreThreadAck { .. } => MessageType::UnstoreThreadAck,
            Self::Error { .. } => MessageType::Error,
        }
    }

    /// Convenience constructor for an `ERROR` payload, per `spec.md` §4.1.
    pub fn error(code: u32, message: impl Into<String>) -> Self {
        Self::Error { code, message: message.into() }
    }

    pub fn as_error(&self) -> Option<(u32, &str)> {
        match self {
            Self::Error { code, message } => Some((*code, message.as_str())),
            _ => None,
        }
    }
}
