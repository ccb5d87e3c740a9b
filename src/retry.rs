//! Bounded exponential back-off with jitter for polling an idempotent check.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_FACTOR: f64 = 1.5;
pub const DEFAULT_JITTER: f64 = 0.2;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Upper bound on the number of checks, including the first one.
    pub max_attempts: u32,
    /// Wait after the first failed check.
    pub initial_delay: Duration,
    /// Growth of the wait between consecutive checks.
    pub factor: f64,
    /// Fraction of the wait randomly added or removed (0.2 = ±20%).
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: DEFAULT_INITIAL_DELAY,
            factor: DEFAULT_FACTOR,
            jitter: DEFAULT_JITTER,
        }
    }
}

impl RetryPolicy {
    /// Wait after the `retry`-th failed check (0-based), before jitter.
    pub fn base_delay(&self, retry: u32) -> Duration {
        let secs = self.initial_delay.as_secs_f64() * self.factor.max(0.0).powi(retry as i32);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }

    /// `base_delay` with a random ±`jitter` share applied.
    pub fn delay(&self, retry: u32) -> Duration {
        let base = self.base_delay(retry);
        let jitter = self.jitter.clamp(0.0, 1.0);
        if jitter.is_nan() || jitter == 0.0 {
            return base;
        }
        let scale = 1.0 + rand::rng().random_range(-jitter..=jitter);
        Duration::try_from_secs_f64(base.as_secs_f64() * scale).unwrap_or(base)
    }

    /// Run `check` until it yields a value or `max_attempts` checks were made.
    /// Returns `None` when every attempt came back empty.
    pub async fn poll<T, F, Fut>(&self, mut check: F) -> Option<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Option<T>>,
    {
        let attempts = self.max_attempts.max(1);
        for attempt in 0..attempts {
            if let Some(value) = check().await {
                return Some(value);
            }
            if attempt + 1 < attempts {
                let wait = self.delay(attempt);
                debug!(attempt = attempt + 1, wait_ms = wait.as_millis() as u64, "not ready, backing off");
                tokio::time::sleep(wait).await;
            }
        }
        None
    }
}
