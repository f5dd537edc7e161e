//! Exponential reconnect backoff with optional jitter.

use std::time::Duration;

use rand::Rng;

/// Configuration for the reconnect backoff.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffConfig {
    /// Delay drawn for the first consecutive failure. May be zero.
    pub min: Duration,
    /// Ceiling on the delay.
    pub max: Duration,
    /// Multiplier applied per consecutive failure.
    pub factor: f64,
    /// Draw each delay uniformly from `[min, base]` instead of using `base`.
    pub jitter: bool,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            min: Duration::from_millis(100),
            max: Duration::from_secs(5),
            factor: 2.0,
            jitter: true,
        }
    }
}

impl BackoffConfig {
    /// Delay before retrying after the `attempt`-th consecutive failure
    /// (1-based), without jitter: `min(min * factor^(attempt-1), max)`.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        if self.min.is_zero() {
            return Duration::ZERO;
        }
        if self.min >= self.max {
            return self.max;
        }
        if attempt <= 1 {
            return self.min;
        }
        let exp = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let scaled = self.min.as_secs_f64() * self.factor.powi(exp);
        let cap = self.max.as_secs_f64();
        if !scaled.is_finite() || scaled >= cap {
            self.max
        } else {
            Duration::from_secs_f64(scaled)
        }
    }
}

/// Stateful backoff counter owned by the reconnect loop.
#[derive(Debug, Clone)]
pub struct Backoff {
    config: BackoffConfig,
    attempt: u32,
}

impl Backoff {
    pub fn new(config: BackoffConfig) -> Self {
        Self { config, attempt: 0 }
    }

    /// Record one more consecutive failure and return the delay to wait.
    pub fn next_delay(&mut self) -> Duration {
        self.attempt = self.attempt.saturating_add(1);
        let base = self.config.base_delay(self.attempt);
        if !self.config.jitter || base <= self.config.min {
            return base;
        }
        let lo = self.config.min.as_nanos() as u64;
        let hi = base.as_nanos().min(u64::MAX as u128) as u64;
        Duration::from_nanos(rand::thread_rng().gen_range(lo..=hi))
    }

    /// Forget all failures; the next delay starts again from `min`.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Consecutive failures recorded since the last reset.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn config(&self) -> &BackoffConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(min_ms: u64, max_ms: u64, jitter: bool) -> BackoffConfig {
        BackoffConfig {
            min: Duration::from_millis(min_ms),
            max: Duration::from_millis(max_ms),
            factor: 2.0,
            jitter,
        }
    }

    #[test]
    fn doubles_until_capped() {
        let mut b = Backoff::new(cfg(100, 1_000, false));
        let delays: Vec<u128> = (0..6).map(|_| b.next_delay().as_millis()).collect();
        assert_eq!(delays, vec![100, 200, 400, 800, 1_000, 1_000]);
        assert_eq!(b.attempt(), 6);
    }

    #[test]
    fn base_delay_matches_formula() {
        let c = cfg(50, 60_000, false);
        for n in 1..=10u32 {
            let expected = (50u64 * 2u64.pow(n - 1)).min(60_000);
            assert_eq!(c.base_delay(n).as_millis() as u64, expected, "attempt {n}");
        }
    }

    #[test]
    fn reset_returns_to_min() {
        let mut b = Backoff::new(cfg(100, 5_000, false));
        b.next_delay();
        b.next_delay();
        b.next_delay();
        b.reset();
        assert_eq!(b.attempt(), 0);
        assert_eq!(b.next_delay(), Duration::from_millis(100));
    }

    #[test]
    fn zero_min_never_sleeps() {
        let mut b = Backoff::new(cfg(0, 5_000, true));
        for _ in 0..5 {
            assert_eq!(b.next_delay(), Duration::ZERO);
        }
    }

    #[test]
    fn huge_attempt_counts_stay_capped() {
        let c = cfg(100, 5_000, false);
        assert_eq!(c.base_delay(u32::MAX), Duration::from_secs(5));
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let mut b = Backoff::new(cfg(100, 5_000, true));
        for n in 1..=8u32 {
            let base = b.config().base_delay(n);
            let d = b.next_delay();
            assert!(d >= Duration::from_millis(100), "attempt {n}: {d:?} below min");
            assert!(d <= base, "attempt {n}: {d:?} above base {base:?}");
        }
    }
}
