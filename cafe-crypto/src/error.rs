#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },
    #[error("invalid hex encoding")]
    InvalidHex,
    #[error("key io error: {0}")]
    Io(String),
}

pub type CryptoResult<T> = Result<T, CryptoError>;
