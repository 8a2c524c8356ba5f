//! Monotonic id generation.
//!
//! Referenced from `async-opcua-client`'s session module as
//! `opcua_core::handle::AtomicHandle` (an atomically-incrementing id source
//! shared behind an `Arc`); reimplemented here for [`RequestId`] (ULID-like:
//! time-ordered, crash-safe to regenerate after a restart since it never
//! needs to be globally unique across node restarts, only locally monotonic)
//! and for the 31-bit request ids the envelope codec needs per connection.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use chrono::{DateTime, Utc};

use cafe_types::RequestId;

/// A simple atomically-incrementing counter, used where the generated value
/// only needs to be unique per-process, not ordered against wall-clock time.
#[derive(Debug, Default)]
pub struct AtomicHandle(AtomicU32);

impl AtomicHandle {
    pub fn new(initial: u32) -> Self {
        Self(AtomicU32::new(initial))
    }

    /// Returns the next handle, wrapping at 31 bits so it never collides
    /// with the high bit some transports reserve on the wire
    /// (`spec.md` §4.1 requestId semantics).
    pub fn next(&self) -> u32 {
        self.0.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
            Some((v + 1) & 0x7fff_ffff)
        })
        .unwrap()
    }
}

/// Generates [`RequestId`]s that sort by creation order even across threads
/// and, absent clock skew, across process restarts.
pub struct RequestIdGenerator {
    counter: AtomicU64,
}

impl Default for RequestIdGenerator {
    fn default() -> Self {
        Self { counter: AtomicU64::new(0) }
    }
}

impl RequestIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self, now: DateTime<Utc>) -> RequestId {
        let millis = now.timestamp_millis().max(0) as u64;
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        RequestId(millis, seq)
    }
}
