//! Re-exports of `parking_lot`'s lock types plus tracing helper macros.
//!
//! The rest of the workspace uses these instead of `std::sync` directly so
//! that deadlocks show up with a file/line trail when `log` is set to
//! `trace`, following `opcua-core`'s `trace_lock!` idiom.

pub use parking_lot::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Obtain a lock on a `Mutex`, logging the call site at trace level. Useful
/// for tracking down deadlocks without reaching for a debugger.
#[macro_export]
macro_rules! trace_lock {
    ($x:expr) => {{
        log::trace!("locking {} at {}:{}", stringify!($x), file!(), line!());
        let guard = $x.lock();
        log::trace!("locked {} at {}:{}", stringify!($x), file!(), line!());
        guard
    }};
}

/// Obtain a read lock on an `RwLock`, logging the call site at trace level.
#[macro_export]
macro_rules! trace_read_lock {
    ($x:expr) => {{
        log::trace!("read-locking {} at {}:{}", stringify!($x), file!(), line!());
        $x.read()
    }};
}

/// Obtain a write lock on an `RwLock`, logging the call site at trace level.
#[macro_export]
macro_rules! trace_write_lock {
    ($x:expr) => {{
        log::trace!("write-locking {} at {}:{}", stringify!($x), file!(), line!());
        $x.write()
    }};
}
