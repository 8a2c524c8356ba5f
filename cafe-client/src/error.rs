//! The four error kinds of `spec.md` §7, carried as a `kind()` classifier so
//! callers (the queue, the poller) can dispatch on kind without matching
//! every concrete variant.

/// Coarse error classification `spec.md` §7 defines for propagation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Retryable: keeps the row `Pending`, bumps `attempts`.
    Transient,
    /// Refresh was tried and still failed; the session is torn down.
    Unauthorized,
    /// Bad input the server will never accept; the row is deleted.
    MalformedInput,
    /// Signature/envelope-open failure; treated as `Unauthorized` for that
    /// cafe (`spec.md` §7).
    Fatal,
}

#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("transport timeout")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("server error {code}: {message}")]
    Server { code: u32, message: String },
    #[error("session unauthorized for this cafe")]
    Unauthorized,
    #[error("no session for this cafe")]
    NoSession,
    #[error("malformed input: {0}")]
    MalformedInput(String),
    #[error("unexpected response type for this request")]
    UnexpectedResponse,
    #[error(transparent)]
    Codec(#[from] cafe_types::CodecError),
    #[error(transparent)]
    Store(#[from] cafe_store::StoreError),
}

impl RpcError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RpcError::Timeout | RpcError::Transport(_) => ErrorKind::Transient,
            RpcError::Server { code, .. } if *code == 401 => ErrorKind::Unauthorized,
            RpcError::Server { code, .. } if *code >= 500 => ErrorKind::Transient,
            RpcError::Server { .. } => ErrorKind::MalformedInput,
            RpcError::Unauthorized | RpcError::NoSession => ErrorKind::Unauthorized,
            RpcError::MalformedInput(_) => ErrorKind::MalformedInput,
            RpcError::UnexpectedResponse => ErrorKind::MalformedInput,
            RpcError::Codec(_) => ErrorKind::Fatal,
            RpcError::Store(_) => ErrorKind::Transient,
        }
    }
}
