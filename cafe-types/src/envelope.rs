//! Envelope codec: signed, typed framing around every client/server message.
//!
//! This module is deliberately generic over the signer/verifier rather than
//! depending on a concrete crypto crate — `Identity` is an external
//! collaborator of this subsystem. `cafe-crypto` wires a concrete Ed25519
//! implementation into [`Signer`]/[`Verifier`].

use serde::{Deserialize, Serialize};

use crate::message::{MessageType, Payload};

/// One request/response message, prior to signing.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub payload: Payload,
    /// Monotonically increasing per connection, 31 bits so it never collides
    /// with a sign bit on the wire. `None` for unsolicited pushes such as
    /// `YOU_HAVE_MAIL`.
    pub request_id: Option<u32>,
    /// `true` when this message is a response echoing `request_id`.
    pub is_response: bool,
}

impl Message {
    pub fn request(request_id: u32, payload: Payload) -> Self {
        debug_assert!(request_id < (1 << 31), "request id must fit in 31 bits");
        Self { payload, request_id: Some(request_id), is_response: false }
    }

    pub fn response(request_id: u32, payload: Payload) -> Self {
        Self { payload, request_id: Some(request_id), is_response: true }
    }

    pub fn push(payload: Payload) -> Self {
        Self { payload, request_id: None, is_response: false }
    }

    pub fn message_type(&self) -> MessageType {
        self.payload.message_type()
    }

    /// If this message is a response carrying `ERROR`, return its code and
    /// text. Receivers must treat this as a failed response to the matching
    /// `request_id` (`spec.md` §4.1).
    pub fn as_error_response(&self) -> Option<(u32, &str)> {
        if !self.is_response {
            return None;
        }
        self.payload.as_error()
    }
}

#[derive(Serialize, Deserialize)]
struct WireMessage {
    r#type: u32,
    payload: Payload,
    request_id: Option<u32>,
    is_response: bool,
}

impl Serialize for Message {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        WireMessage {
            r#type: self.payload.message_type() as u32,
            payload: self.payload.clone(),
            request_id: self.request_id,
            is_response: self.is_response,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Message {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let wire = WireMessage::deserialize(deserializer)?;
        let declared = MessageType::from_u32(wire.r#type)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown message type {}", wire.r#type)))?;
        let actual = wire.payload.message_type();
        if declared as u32 != actual as u32 {
            return Err(serde::de::Error::custom(format!(
                "declared type {} does not match payload type {}",
                declared as u32, actual as u32
            )));
        }
        Ok(Message {
            payload: wire.payload,
            request_id: wire.request_id,
            is_response: wire.is_response,
        })
    }
}

/// Signed outer framing around a [`Message`]. Transient — never persisted,
/// only ever exchanged over [`Transport`](crate)-like collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub message: Message,
    pub sig: Vec<u8>,
}

/// Minimal signing seam. Implemented concretely by `cafe-crypto`'s Ed25519
/// identity; `spec.md` §6 calls this `Identity.Sign`.
pub trait Signer {
    fn sign(&self, bytes: &[u8]) -> Vec<u8>;
}

/// Minimal verification seam, keyed by whatever the transport handed us
/// out-of-band as the sender's declared public key.
pub trait Verifier {
    fn verify(&self, bytes: &[u8], sig: &[u8]) -> bool;
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("failed to encode message: {0}")]
    Encode(String),
    #[error("failed to decode message: {0}")]
    Decode(String),
    #[error("signature verification failed")]
    BadSignature,
}

/// Serialize `message`, sign the serialized bytes, and wrap both in an
/// [`Envelope`] (`spec.md` §4.1 "Seal").
pub fn seal<S: Signer + ?Sized>(message: Message, signer: &S) -> Result<Envelope, CodecError> {
    let bytes = encode_message(&message)?;
    let sig = signer.sign(&bytes);
    Ok(Envelope { message, sig })
}

/// Verify `envelope.sig` against the serialized `message` bytes using
/// `verifier` (the sender's identity, obtained out-of-band from the
/// transport session), then return the message (`spec.md` §4.1 "Open").
pub fn open<V: Verifier + ?Sized>(envelope: &Envelope, verifier: &V) -> Result<Message, CodecError> {
    let bytes = encode_message(&envelope.message)?;
    if !verifier.verify(&bytes, &envelope.sig) {
        return Err(CodecError::BadSignature);
    }
    Ok(envelope.message.clone())
}

fn encode_message(message: &Message) -> Result<Vec<u8>, CodecError> {
    let mut buf = Vec::new();
    ciborium::into_writer(message, &mut buf).map_err(|e| CodecError::Encode(e.to_string()))?;
    Ok(buf)
}

/// Decode raw bytes received from a transport into an [`Envelope`], without
/// verifying the signature (callers must still call [`open`] or verify
/// separately before trusting the contents).
pub fn decode_envelope(bytes: &[u8]) -> Result<Envelope, CodecError> {
    ciborium::from_reader(bytes).map_err(|e| CodecError::Decode(e.to_string()))
}

/// Encode an [`Envelope`] to bytes for handing to a transport.
pub fn encode_envelope(envelope: &Envelope) -> Result<Vec<u8>, CodecError> {
    let mut buf = Vec::new();
    ciborium::into_writer(envelope, &mut buf).map_err(|e| CodecError::Encode(e.to_string()))?;
    Ok(buf)
}
