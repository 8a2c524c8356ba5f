//! Exponential backoff with jitter (`spec.md` §4.3), grounded on the
//! teacher's `ExponentialBackoff` (referenced from
//! `async-opcua-client/src/session/{event_loop,mod}.rs`) but reparametrized
//! with this spec's `base`/`cap`/jitter instead of OPC-UA's fixed policy.
//!
//! A row's `created_at` is re-anchored to "now" every time it reverts to
//! `Pending` (see `cafe_store::Datastore::revert_to_pending`), so the
//! schedule below only ever needs `(created_at, attempts)` — durable,
//! crash-safe, and requiring no separate "last attempt" bookkeeping.

use std::time::Duration;

use rand::Rng;

/// The delay to wait, from `created_at`, before `attempts` is eligible for
/// its next dispatch. `attempts == 0` returns zero (new rows are eligible
/// immediately).
pub fn scheduled_delay(attempts: u32, base: Duration, cap: Duration) -> Duration {
    if attempts == 0 {
        return Duration::ZERO;
    }
    let exponent = attempts.saturating_sub(1).min(32);
    let scaled = base.checked_mul(1u32.checked_shl(exponent).unwrap_or(u32::MAX)).unwrap_or(cap);
    scaled.min(cap)
}

/// Apply `±jitter` (a fraction, e.g. `0.20` for ±20%) to `delay`.
pub fn with_jitter(delay: Duration, jitter: f64, rng: &mut impl Rng) -> Duration {
    if jitter <= 0.0 || delay.is_zero() {
        return delay;
    }
    let factor = 1.0 + rng.gen_range(-jitter..=jitter);
    Duration::from_secs_f64((delay.as_secs_f64() * factor).max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_attempts_is_immediate() {
        assert_eq!(scheduled_delay(0, Duration::from_secs(30), Duration::from_secs(3600)), Duration::ZERO);
    }

    #[test]
    fn delay_doubles_then_caps() {
        let base = Duration::from_secs(30);
        let cap = Duration::from_secs(3600);
        assert_eq!(scheduled_delay(1, base, cap), Duration::from_secs(30));
        assert_eq!(scheduled_delay(2, base, cap), Duration::from_secs(60));
        assert_eq!(scheduled_delay(3, base, cap), Duration::from_secs(120));
        assert_eq!(scheduled_delay(8, base, cap), Duration::from_secs(3600));
        assert_eq!(scheduled_delay(30, base, cap), Duration::from_secs(3600));
    }

    #[test]
    fn jitter_stays_within_bound() {
        let mut rng = rand::thread_rng();
        let delay = Duration::from_secs(100);
        for _ in 0..100 {
            let jittered = with_jitter(delay, 0.20, &mut rng);
            assert!(jittered.as_secs_f64() >= 80.0 && jittered.as_secs_f64() <= 120.0);
        }
    }
}
