//! Tunables fixed by `spec.md` §4.3/§4.4/§5. Kept as `const`s rather than
//! buried magic numbers so `CafeNodeConfig`'s defaults and the dispatcher's
//! backoff math stay traceable to one source.

use std::time::Duration;

/// Maximum distinct `targetId`s batched into one `CAFE_STORE`/`CAFE_UNSTORE`
/// RPC (`spec.md` §4.3 grouping).
pub const MAX_BATCH: usize = 50;

/// Global concurrency limit across all cafes (`spec.md` §4.3 dispatch
/// policy).
pub const MAX_INFLIGHT: usize = 5;

/// Per-cafe concurrency limit, preserving per-cafe ordering of dependent ops
/// (`spec.md` §4.3/§5).
pub const MAX_INFLIGHT_PER_CAFE: usize = 1;

/// Base of the exponential backoff schedule (`spec.md` §4.3).
pub const BACKOFF_BASE: Duration = Duration::from_secs(30);

/// Cap on the exponential backoff schedule (`spec.md` §4.3).
pub const BACKOFF_CAP: Duration = Duration::from_secs(60 * 60);

/// Jitter applied to each computed backoff, as a fraction of the computed
/// delay (`spec.md` §4.3: "plus ±20% jitter").
pub const BACKOFF_JITTER: f64 = 0.20;

/// Requests are moved to `Failed` after this many attempts without success
/// (`spec.md` §4.3).
pub const MAX_ATTEMPTS: u32 = 30;

/// Mailbox polling cadence (`spec.md` §4.4).
pub const POLL_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// A message that fails local ingestion this many times is quarantined
/// in-memory rather than retried forever (`spec.md` §4.4).
pub const MSG_MAX_ATTEMPTS: u32 = 3;

/// Default RPC deadline (`spec.md` §5).
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(30);

/// Deadline for a `STORE` object upload, longer than the default since
/// object bytes can be large (`spec.md` §5).
pub const STORE_UPLOAD_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Clock skew tolerance before a session is proactively refreshed
/// (`spec.md` §4.2 `EnsureFresh`).
pub const REFRESH_SKEW: Duration = Duration::from_secs(30);

/// A registration nonce older than this is no longer consumable
/// (`spec.md` §3 `Nonce` lifecycle).
pub const NONCE_MAX_AGE: Duration = Duration::from_secs(5 * 60);
