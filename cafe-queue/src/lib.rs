//! Durable, bounded-concurrency request queue (`spec.md` §4.3): `Put`/
//! `Flush`/`Run`/`Stop`, grouped dispatch with per-cafe/global concurrency
//! limits, and exponential backoff with jitter on failure.

pub mod backoff;
pub mod dispatch;
pub mod error;
pub mod group;
pub mod inbox_trigger;
pub mod queue;

pub use dispatch::{next_attempt_estimate, DispatchPolicy, Dispatcher};
pub use error::QueueError;
pub use group::{group_for_dispatch, DispatchGroup};
pub use inbox_trigger::InboxTrigger;
pub use queue::Queue;
