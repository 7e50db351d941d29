//! Process-wide cooldown window honouring provider rate-limit signals.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Shared cooldown timestamp suppressing provider calls after an overload signal.
///
/// The window is a single atomically-updated value; the latest provider hint
/// always wins, even when it shortens an earlier window.
pub struct RateLimitGate {
    epoch: Instant,
    /// Milliseconds since `epoch` until which calls are suppressed. Zero means no window.
    cooldown_until_ms: AtomicU64,
}

impl Default for RateLimitGate {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimitGate {
    /// Create a gate with no active cooldown.
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
            cooldown_until_ms: AtomicU64::new(0),
        }
    }

    /// True while the cooldown window is still open.
    pub fn is_blocked(&self) -> bool {
        self.is_blocked_at(Instant::now())
    }

    /// Open (or move) the cooldown window after a provider overload signal.
    pub fn mark_limited(&self, retry_after_secs: u64) {
        self.mark_limited_at(Instant::now(), retry_after_secs);
    }

    fn is_blocked_at(&self, now: Instant) -> bool {
        let now_ms = now.saturating_duration_since(self.epoch).as_millis() as u64;
        now_ms < self.cooldown_until_ms.load(Ordering::Acquire)
    }

    fn mark_limited_at(&self, now: Instant, retry_after_secs: u64) {
        let wait = Duration::from_secs(retry_after_secs.max(1));
        let until = now.saturating_duration_since(self.epoch) + wait;
        // Last write wins: the newest hint is authoritative, not the longest.
        self.cooldown_until_ms
            .store(until.as_millis() as u64, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_gate_is_open() {
        let gate = RateLimitGate::new();
        assert!(!gate.is_blocked());
    }

    #[test]
    fn blocked_until_retry_window_elapses() {
        let gate = RateLimitGate::new();
        let now = Instant::now();

        gate.mark_limited_at(now, 5);
        assert!(gate.is_blocked_at(now));
        assert!(gate.is_blocked_at(now + Duration::from_secs(4)));
        assert!(!gate.is_blocked_at(now + Duration::from_secs(5)));
    }

    #[test]
    fn later_signal_overrides_earlier_one() {
        let gate = RateLimitGate::new();
        let now = Instant::now();

        gate.mark_limited_at(now, 30);
        gate.mark_limited_at(now, 1);
        assert!(gate.is_blocked_at(now));
        assert!(!gate.is_blocked_at(now + Duration::from_secs(2)));
    }

    #[test]
    fn zero_hint_still_waits_one_second() {
        let gate = RateLimitGate::new();
        let now = Instant::now();

        gate.mark_limited_at(now, 0);
        assert!(gate.is_blocked_at(now + Duration::from_millis(500)));
        assert!(!gate.is_blocked_at(now + Duration::from_secs(1)));
    }
}
