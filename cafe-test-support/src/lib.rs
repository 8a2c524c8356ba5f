//! Test doubles shared across the cafe client workspace: a scriptable
//! `Transport`, an in-memory `Datastore`, and fixture builders. Kept as its
//! own crate (rather than `#[cfg(test)]` modules) since `cafe-queue`,
//! `cafe-inbox`, and `cafe-cli` integration tests all need the same doubles
//! (`SPEC_FULL.md` §4.9).

pub mod fixtures;
pub mod memory_store;
pub mod mock_transport;

pub use cafe_core::clock::ManualClock as VirtualClock;
pub use memory_store::MemoryStore;
pub use mock_transport::{MockError, MockOutcome, MockTransport};
