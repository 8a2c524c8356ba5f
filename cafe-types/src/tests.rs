use crate::envelope::{open, seal, Message, Signer, Verifier};
use crate::message::Payload;

struct FakeIdentity;

impl Signer for FakeIdentity {
    fn sign(&self, bytes: &[u8]) -> Vec<u8> {
        // Not a real signature scheme — good enough to exercise bit-flip
        // detection in these tests without pulling in cafe-crypto.
        bytes.iter().fold(0u8, |acc, b| acc ^ b).to_be_bytes().to_vec()
    }
}

impl Verifier for FakeIdentity {
    fn verify(&self, bytes: &[u8], sig: &[u8]) -> bool {
        FakeIdentity.sign(bytes) == sig
    }
}

fn sample_message() -> Message {
    Message::request(7, Payload::Challenge { account_address: "addr1".into() })
}

#[test]
fn open_of_seal_roundtrips() {
    let identity = FakeIdentity;
    let envelope = seal(sample_message(), &identity).unwrap();
    let opened = open(&envelope, &identity).unwrap();
    assert_eq!(opened, sample_message());
}

#[test]
fn flipped_signature_bit_fails_to_open() {
    let identity = FakeIdentity;
    let mut envelope = seal(sample_message(), &identity).unwrap();
    envelope.sig[0] ^= 0x01;
    assert!(open(&envelope, &identity).is_err());
}

#[test]
fn flipped_message_bit_fails_to_open() {
    let identity = FakeIdentity;
    let envelope = seal(sample_message(), &identity).unwrap();
    let mut tampered = envelope.clone();
    tampered.message = Message::request(7, Payload::Challenge { account_address: "addr2".into() });
    assert!(open(&tampered, &identity).is_err());
}

#[test]
fn error_payload_is_detected_on_response() {
    let msg = Message::response(3, Payload::error(401, "unauthorized"));
    assert_eq!(msg.as_error_response(), Some((401, "unauthorized")));
}

#[test]
fn error_payload_on_request_is_not_treated_as_error_response() {
    // is_response=false: per spec.md 4.1, only responses carrying ERROR are
    // treated as a failed response to the matching requestId.
    let msg = Message::request(3, Payload::error(401, "unauthorized"));
    assert_eq!(msg.as_error_response(), None);
}

#[test]
fn decode_rejects_unknown_message_type() {
    // Hand-construct a CBOR map with an out-of-range type discriminant to
    // simulate a message from a newer protocol version.
    let mut buf = Vec::new();
    let bad = ciborium::value::Value::Map(vec![
        (ciborium::value::Value::Text("type".into()), ciborium::value::Value::Integer(9999.into())),
        (
            ciborium::value::Value::Text("payload".into()),
            ciborium::value::Value::Map(vec![(
                ciborium::value::Value::Text("YouHaveMail".into()),
                ciborium::value::Value::Null,
            )]),
        ),
        (ciborium::value::Value::Text("request_id".into()), ciborium::value::Value::Null),
        (ciborium::value::Value::Text("is_response".into()), ciborium::value::Value::Bool(false)),
    ]);
    ciborium::into_writer(&bad, &mut buf).unwrap();
    let result: Result<Message, _> = ciborium::from_reader(buf.as_slice());
    assert!(result.is_err());
}
