use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identifies a cafe (a remote peer offering pinning/mailbox/relay service).
///
/// Cafes are addressed by their libp2p-style peer id string; this is a thin
/// newtype so the rest of the crate can't accidentally compare a cafe id to a
/// target id even though both are strings on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CafeId(pub String);

impl fmt::Display for CafeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for CafeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for CafeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Either a content address (for `Store`/`Unstore`) or a thread id (for
/// `StoreThread`/`UnstoreThread`). `Inbox` and `PublishPeer` requests carry
/// an empty target — there is nothing per-target to deduplicate against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetId(pub String);

impl TargetId {
    /// The degenerate target used by `Inbox` and `PublishPeer` rows.
    pub fn none() -> Self {
        Self(String::new())
    }

    pub fn is_none(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TargetId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for TargetId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A monotonic, sortable request id: a millisecond timestamp in the high 64
/// bits and a per-process atomic counter in the low 64 bits, so two ids
/// minted in the same millisecond still order correctly. See
/// `cafe_core::handle` for the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestId(pub u64, pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}{:016x}", self.0, self.1)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid request id: {0}")]
pub struct ParseRequestIdError(String);

impl FromStr for RequestId {
    type Err = ParseRequestIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 32 {
            return Err(ParseRequestIdError(s.to_string()));
        }
        let hi = u64::from_str_radix(&s[..16], 16).map_err(|_| ParseRequestIdError(s.to_string()))?;
        let lo = u64::from_str_radix(&s[16..], 16).map_err(|_| ParseRequestIdError(s.to_string()))?;
        Ok(RequestId(hi, lo))
    }
}
