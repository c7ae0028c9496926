//! Exponential backoff with bounded jitter
//!
//! Delay doubles on every consecutive failure, capped at a configured
//! maximum, with a random additive jitter so that many partitions failing
//! together do not reconnect in lockstep. One fully successful batch commit
//! resets the sequence to the initial delay.

use rand::Rng;
use std::time::Duration;

/// Backoff state for one partition consumer.
#[derive(Debug)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    /// Fraction of the base delay added as random jitter, in `[0, 1]`.
    jitter: f64,
    attempts: u32,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration, jitter: f64) -> Self {
        Self {
            initial,
            max,
            jitter: jitter.clamp(0.0, 1.0),
            attempts: 0,
        }
    }

    /// Delay to wait before the next retry. Advances the attempt counter.
    ///
    /// The base delay is `initial * 2^n` capped at `max`; jitter only ever
    /// adds to the base, so the returned delay is never below `initial` and
    /// never above `max`.
    pub fn next_delay(&mut self) -> Duration {
        let base = self
            .initial
            .saturating_mul(1u32.checked_shl(self.attempts).unwrap_or(u32::MAX))
            .min(self.max);
        self.attempts = self.attempts.saturating_add(1);

        if self.jitter == 0.0 {
            return base;
        }
        let factor: f64 = rand::rng().random_range(0.0..=self.jitter);
        let jittered = base.mul_f64(1.0 + factor);
        jittered.min(self.max)
    }

    /// Reset after a fully successful batch commit.
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    /// Number of consecutive failures recorded so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delays_double_without_jitter() {
        let mut backoff = Backoff::new(
            Duration::from_millis(100),
            Duration::from_secs(10),
            0.0,
        );
        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
        assert_eq!(backoff.next_delay(), Duration::from_millis(200));
        assert_eq!(backoff.next_delay(), Duration::from_millis(400));
        assert_eq!(backoff.next_delay(), Duration::from_millis(800));
    }

    #[test]
    fn test_delay_is_capped_at_max() {
        let mut backoff = Backoff::new(
            Duration::from_millis(100),
            Duration::from_millis(250),
            0.0,
        );
        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
        assert_eq!(backoff.next_delay(), Duration::from_millis(200));
        assert_eq!(backoff.next_delay(), Duration::from_millis(250));
        // Stays at the cap no matter how many failures pile up
        for _ in 0..40 {
            assert_eq!(backoff.next_delay(), Duration::from_millis(250));
        }
    }

    #[test]
    fn test_reset_returns_to_initial() {
        let mut backoff = Backoff::new(
            Duration::from_millis(100),
            Duration::from_secs(10),
            0.0,
        );
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        assert_eq!(backoff.attempts(), 0);
        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let initial = Duration::from_millis(100);
        let max = Duration::from_secs(5);
        let mut backoff = Backoff::new(initial, max, 0.5);
        let mut previous_base = Duration::ZERO;
        for _ in 0..20 {
            let attempts_before = backoff.attempts();
            let delay = backoff.next_delay();
            let base = initial
                .saturating_mul(1u32.checked_shl(attempts_before).unwrap_or(u32::MAX))
                .min(max);
            assert!(delay >= base);
            assert!(delay <= max);
            assert!(base >= previous_base, "base delay must be non-decreasing");
            previous_base = base;
        }
    }

    #[test]
    fn test_jitter_clamped_to_unit_interval() {
        let mut backoff = Backoff::new(Duration::from_millis(50), Duration::from_secs(1), 7.5);
        let delay = backoff.next_delay();
        // With jitter clamped to 1.0 the first delay is at most double the initial
        assert!(delay <= Duration::from_millis(100));
    }
}
