//! Per-cafe log line prefixing, mirroring `async-opcua-client`'s `session_debug!`
//! family (`async-opcua-client/src/session/mod.rs`).

#[allow(unused)]
macro_rules! cafe_debug {
    ($cafe_id:expr, $($arg:tt)*) => {
        log::debug!("cafe:{} {}", $cafe_id, format!($($arg)*));
    }
}
#[allow(unused)]
pub(crate) use cafe_debug;

#[allow(unused)]
macro_rules! cafe_warn {
    ($cafe_id:expr, $($arg:tt)*) => {
        log::warn!("cafe:{} {}", $cafe_id, format!($($arg)*));
    }
}
#[allow(unused)]
pub(crate) use cafe_warn;

#[allow(unused)]
macro_rules! cafe_error {
    ($cafe_id:expr, $($arg:tt)*) => {
        log::error!("cafe:{} {}", $cafe_id, format!($($arg)*));
    }
}
#[allow(unused)]
pub(crate) use cafe_error;
