use serde::{Deserialize, Serialize};

/// The kind of durable request a row in the request store represents.
/// `spec.md` §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestKind {
    Store,
    Unstore,
    StoreThread,
    UnstoreThread,
    Inbox,
    PublishPeer,
}

impl RequestKind {
    /// The opposite kind that cancels this one at `Put` time
    /// (`spec.md` §3 invariants: `Store`/`Unstore` and
    /// `StoreThread`/`UnstoreThread` cancel each other). `None` for kinds
    /// with no opposite.
    pub fn opposite(self) -> Option<Self> {
        match self {
            Self::Store => Some(Self::Unstore),
            Self::Unstore => Some(Self::Store),
            Self::StoreThread => Some(Self::UnstoreThread),
            Self::UnstoreThread => Some(Self::StoreThread),
            Self::Inbox | Self::PublishPeer => None,
        }
    }

    /// Whether duplicate `(targetId, cafeId, kind)` rows are coalesced into
    /// one PENDING row at `Put` time (`spec.md` §3 invariants call this a
    /// "conservative kind").
    pub fn is_conservative(self) -> bool {
        matches!(self, Self::Store | Self::Unstore | Self::StoreThread | Self::UnstoreThread)
    }

    /// Whether this kind batches multiple targets into a single RPC
    /// (`spec.md` §4.3 grouping: up to `MAX_BATCH` cids per `CAFE_STORE`/
    /// `CAFE_UNSTORE`).
    pub fn is_batchable(self) -> bool {
        matches!(self, Self::Store | Self::Unstore)
    }
}

/// Lifecycle state of a request row. There is deliberately no `Done` state:
/// success deletes the row, matching the original system's behavior
/// (`spec.md` §9 Open Questions — `Failed` is the one new terminal state
/// this spec adds on top of that).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    Pending,
    InFlight,
    Failed,
}
