//! In-memory per-message attempt tracking (`spec.md` §4.4 step 4): "a
//! per-message attempt counter is kept in memory so a stuck message is
//! eventually quarantined after `MSG_MAX_ATTEMPTS=3`". Deliberately not
//! persisted — a restart resets quarantine state and gives every held
//! message a fresh three attempts, which is acceptable since quarantine is
//! a liveness safeguard, not a correctness one (`spec.md` §7: propagation
//! policy only requires the poller to "log and retry silently ... after
//! the limit, it emits a quarantine event").

use std::collections::HashMap;

use cafe_core::sync::Mutex;

/// Tracks local ingestion failures per message id and decides when a message
/// should stop being retried this process's lifetime.
#[derive(Default)]
pub struct Quarantine {
    attempts: Mutex<HashMap<String, u32>>,
}

impl Quarantine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failed ingestion attempt for `message_id`, returning the new
    /// attempt count.
    pub fn record_failure(&self, message_id: &str) -> u32 {
        let mut attempts = self.attempts.lock();
        let count = attempts.entry(message_id.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    /// Whether `message_id` has exhausted its retry budget and should be
    /// left alone (not acked, not retried) until the process restarts.
    pub fn is_quarantined(&self, message_id: &str, max_attempts: u32) -> bool {
        self.attempts.lock().get(message_id).copied().unwrap_or(0) >= max_attempts
    }

    /// Clear the counter for a message that ingested successfully, so a
    /// future redelivery (unexpected but not impossible) starts fresh.
    pub fn clear(&self, message_id: &str) {
        self.attempts.lock().remove(message_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quarantines_after_max_attempts() {
        let q = Quarantine::new();
        assert!(!q.is_quarantined("m1", 3));
        q.record_failure("m1");
        q.record_failure("m1");
        assert!(!q.is_quarantined("m1", 3));
        q.record_failure("m1");
        assert!(q.is_quarantined("m1", 3));
    }

    #[test]
    fn clear_resets_counter() {
        let q = Quarantine::new();
        q.record_failure("m1");
        q.record_failure("m1");
        q.clear("m1");
        assert!(!q.is_quarantined("m1", 1));
    }
}
