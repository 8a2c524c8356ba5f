//! Durable local tables for the cafe client subsystem: sessions, the
//! request queue's rows, and registration nonces (`spec.md` §6).

pub mod error;
pub mod model;
pub mod sqlite;
pub mod traits;

pub use error::StoreError;
pub use model::{Nonce, Request, Session};
pub use sqlite::SqliteStore;
pub use traits::Datastore;
