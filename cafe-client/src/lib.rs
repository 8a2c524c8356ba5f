//! Cafe RPC façade: session lifecycle, per-kind authenticated calls, and the
//! `Transport`/`ObjectSource`/`ThreadSink` seams the rest of the workspace
//! builds on (`spec.md` §4.5, §4.2, §9).

mod macros;

pub mod client;
pub mod error;
pub mod object;
pub mod session;
pub mod transport;

pub use client::{CafeClient, StoreOutcome};
pub use error::{ErrorKind, RpcError};
pub use object::{ObjectSource, ObjectSourceError, ThreadSink, ThreadSinkError};
pub use session::Sessions;
pub use transport::Transport;
