//! Degraded-channel fallback (§4.3, §7): after N consecutive failures a
//! consumer stops calling out and falls back to its existing defaults/cache
//! until a success re-enables it. Shared shape used by C3's own callers and,
//! with its own state labels, by C4's goal controller (§4.4).

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

pub struct DegradedChannel {
    threshold: u32,
    consecutive_failures: AtomicU32,
    degraded: AtomicBool,
}

impl DegradedChannel {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            consecutive_failures: AtomicU32::new(0),
            degraded: AtomicBool::new(false),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }

    pub fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::Relaxed);
        self.degraded.store(false, Ordering::Relaxed);
    }

    /// Returns `true` if this failure just pushed the channel into degraded
    /// mode (useful for a one-shot log line).
    pub fn record_failure(&self) -> bool {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        if failures >= self.threshold {
            self.degraded.store(true, Ordering::Relaxed);
            true
        } else {
            false
        }
    }
}

impl Default for DegradedChannel {
    fn default() -> Self {
        Self::new(3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_scenario_5_degrades_after_three_consecutive_failures() {
        let channel = DegradedChannel::default();
        assert!(!channel.record_failure());
        assert!(!channel.is_degraded());
        assert!(!channel.record_failure());
        assert!(!channel.is_degraded());
        assert!(channel.record_failure());
        assert!(channel.is_degraded());

        // a fourth failure keeps it degraded.
        channel.record_failure();
        assert!(channel.is_degraded());
    }

    #[test]
    fn success_clears_degraded_state() {
        let channel = DegradedChannel::new(1);
        channel.record_failure();
        assert!(channel.is_degraded());
        channel.record_success();
        assert!(!channel.is_degraded());
    }
}
