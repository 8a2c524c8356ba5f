//! Concrete `Identity` collaborator (`spec.md` §6): an Ed25519 keypair that
//! signs outgoing envelopes and exposes an account address derived from its
//! public key. `cafe-types` stays generic over [`cafe_types::Signer`]/
//! [`cafe_types::Verifier`] so this crate is the only one that knows the
//! concrete algorithm.

use std::fmt;

use ed25519_dalek::{Signer as _, SigningKey, Verifier as _, VerifyingKey};
use rand::rngs::OsRng;
use zeroize::ZeroizeOnDrop;

use cafe_types::{Signer, Verifier};

use crate::error::{CryptoError, CryptoResult};

/// An Ed25519 keypair. The signing key is zeroized on drop.
#[derive(ZeroizeOnDrop)]
pub struct Identity {
    #[zeroize(skip)]
    verifying_key: VerifyingKey,
    signing_key: SigningKey,
}

impl Identity {
    /// Generate a fresh random identity.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        let verifying_key = signing_key.verifying_key();
        Self { signing_key, verifying_key }
    }

    /// Reconstruct an identity from its 32-byte secret key.
    pub fn from_secret_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidKeyLength { expected: 32, actual: bytes.len() })?;
        let signing_key = SigningKey::from_bytes(&array);
        let verifying_key = signing_key.verifying_key();
        Ok(Self { signing_key, verifying_key })
    }

    pub fn secret_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.verifying_key)
    }

    /// The account address this identity registers under
    /// (`spec.md` §4.2 `CAFE_CHALLENGE{accountAddress}`): the hex-encoded
    /// public key.
    pub fn address(&self) -> String {
        self.public_key().to_hex()
    }

    /// Sign `nonce || address` as required by `spec.md` §4.2 registration:
    /// "sign nonce||accountAddress".
    pub fn sign_nonce(&self, nonce: &str) -> Vec<u8> {
        let address = self.address();
        let mut bytes = Vec::with_capacity(nonce.len() + address.len());
        bytes.extend_from_slice(nonce.as_bytes());
        bytes.extend_from_slice(address.as_bytes());
        self.sign(&bytes)
    }
}

impl Signer for Identity {
    fn sign(&self, bytes: &[u8]) -> Vec<u8> {
        self.signing_key.sign(bytes).to_bytes().to_vec()
    }
}

impl Verifier for Identity {
    fn verify(&self, bytes: &[u8], sig: &[u8]) -> bool {
        self.public_key().verify(bytes, sig)
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity").field("address", &self.address()).finish_non_exhaustive()
    }
}

/// A remote party's public key, obtained out-of-band from the transport
/// session (`spec.md` §4.1 "Open": verify against the declared sender
/// identity). Used to verify envelopes received from a cafe.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicKey(VerifyingKey);

impl PublicKey {
    pub fn from_bytes(bytes: [u8; 32]) -> CryptoResult<Self> {
        VerifyingKey::from_bytes(&bytes).map(Self).map_err(|_| CryptoError::InvalidKeyLength {
            expected: 32,
            actual: bytes.len(),
        })
    }

    pub fn from_hex(s: &str) -> CryptoResult<Self> {
        let bytes = decode_hex(s)?;
        let array: [u8; 32] =
            bytes.try_into().map_err(|v: Vec<u8>| CryptoError::InvalidKeyLength {
                expected: 32,
                actual: v.len(),
            })?;
        Self::from_bytes(array)
    }

    pub fn to_hex(self) -> String {
        encode_hex(self.0.as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }
}

impl Verifier for PublicKey {
    fn verify(&self, bytes: &[u8], sig: &[u8]) -> bool {
        let Ok(sig_bytes): Result<[u8; 64], _> = sig.try_into() else {
            return false;
        };
        let signature = ed25519_dalek::Signature::from_bytes(&sig_bytes);
        self.0.verify(bytes, &signature).is_ok()
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_hex())
    }
}

fn encode_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn decode_hex(s: &str) -> CryptoResult<Vec<u8>> {
    if s.len() % 2 != 0 {
        return Err(CryptoError::InvalidHex);
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).map_err(|_| CryptoError::InvalidHex))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_verify_round_trips() {
        let identity = Identity::generate();
        let sig = identity.sign(b"hello");
        assert!(identity.public_key().verify(b"hello", &sig));
    }

    #[test]
    fn tampered_message_fails_verification() {
        let identity = Identity::generate();
        let sig = identity.sign(b"hello");
        assert!(!identity.public_key().verify(b"goodbye", &sig));
    }

    #[test]
    fn from_secret_bytes_reconstructs_same_public_key() {
        let original = Identity::generate();
        let restored = Identity::from_secret_bytes(&original.secret_bytes()).unwrap();
        assert_eq!(original.public_key(), restored.public_key());
    }

    #[test]
    fn public_key_hex_round_trips() {
        let identity = Identity::generate();
        let hex = identity.public_key().to_hex();
        let restored = PublicKey::from_hex(&hex).unwrap();
        assert_eq!(identity.public_key(), restored);
    }

    #[test]
    fn sign_nonce_binds_address() {
        let identity = Identity::generate();
        let sig = identity.sign_nonce("nonce-value");
        let mut expected = Vec::new();
        expected.extend_from_slice(b"nonce-value");
        expected.extend_from_slice(identity.address().as_bytes());
        assert!(identity.public_key().verify(&expected, &sig));
    }
}
