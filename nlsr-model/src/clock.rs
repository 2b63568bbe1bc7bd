//! Time source for certificate validity
//!
//! Certificates are issued with a `[not_before, not_after]` window in
//! milliseconds since Unix epoch and checked against a `Clock` when they are
//! verified. `MockClock` lets tests issue and expire certificates at will.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;

    /// Window starting now and lasting `lifetime_ms`, saturating at `u64::MAX`.
    fn validity_window(&self, lifetime_ms: u64) -> (u64, u64) {
        let now = self.now_ms();
        (now, now.saturating_add(lifetime_ms))
    }

    /// Whether now lies inside `[not_before_ms, not_after_ms]`.
    fn is_within(&self, not_before_ms: u64, not_after_ms: u64) -> bool {
        let now = self.now_ms();
        not_before_ms <= now && now <= not_after_ms
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        // A clock before 1970 reads as 0, which fails every window but [0, ..]
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Settable clock. Clones share the same instant, so a test can keep one
/// handle and move time forward under a verifier that owns another.
#[derive(Debug, Clone, Default)]
pub struct MockClock {
    time_ms: Arc<AtomicU64>,
}

impl MockClock {
    pub fn new(time_ms: u64) -> Self {
        Self {
            time_ms: Arc::new(AtomicU64::new(time_ms)),
        }
    }

    pub fn set(&self, time_ms: u64) {
        self.time_ms.store(time_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, by_ms: u64) {
        self.time_ms.fetch_add(by_ms, Ordering::SeqCst);
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u64 {
        self.time_ms.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_is_after_2025() {
        assert!(SystemClock.now_ms() > 1_735_689_600_000);
    }

    #[test]
    fn test_mock_clock_clones_share_time() {
        let clock = MockClock::new(1_000);
        let handle = clock.clone();
        handle.advance(500);
        assert_eq!(clock.now_ms(), 1_500);
        handle.set(10);
        assert_eq!(clock.now_ms(), 10);
    }

    #[test]
    fn test_validity_window() {
        let clock = MockClock::new(1_000);
        assert_eq!(clock.validity_window(250), (1_000, 1_250));
        assert_eq!(clock.validity_window(u64::MAX), (1_000, u64::MAX));

        assert!(clock.is_within(1_000, 1_250));
        clock.advance(250);
        assert!(clock.is_within(1_000, 1_250));
        clock.advance(1);
        assert!(!clock.is_within(1_000, 1_250));
        assert!(!MockClock::new(999).is_within(1_000, 1_250));
    }
}
