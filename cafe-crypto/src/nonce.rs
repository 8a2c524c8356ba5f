//! Registration challenge nonces (`spec.md` §3 `Nonce`, §4.2 `CAFE_NONCE`).
//!
//! Generation lives in `cafe-crypto` alongside the rest of the RNG-backed
//! material; persistence of the `(value, address, createdAt)` triple is
//! `cafe-store`'s job.

use rand::RngCore;

/// A fresh, high-entropy nonce value for a `CAFE_NONCE` challenge response.
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonces_are_not_trivially_repeated() {
        let a = generate_nonce();
        let b = generate_nonce();
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
    }
}
