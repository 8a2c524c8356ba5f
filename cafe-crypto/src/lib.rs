//! Concrete Ed25519 identity for the cafe client subsystem.

pub mod error;
pub mod identity;
pub mod nonce;

pub use error::{CryptoError, CryptoResult};
pub use identity::{Identity, PublicKey};
pub use nonce::generate_nonce;
