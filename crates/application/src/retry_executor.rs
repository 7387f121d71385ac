use std::future::Future;
use std::time::Duration;

use rand::Rng;
use rolebind_core::AppResult;
use tracing::warn;

use crate::CancellationToken;

/// Bounded exponential backoff settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub initial_delay: Duration,
    /// Growth factor applied after every failed attempt.
    pub multiplier: f64,
    /// Upper bound for the computed delay.
    pub max_delay: Duration,
    /// Scale each delay by a random factor in `0.5..=1.5`.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            multiplier: 1.5,
            max_delay: Duration::from_secs(30),
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Returns the un-jittered delay that follows failed attempt `attempt`
    /// (1-based).
    #[must_use]
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let factor = self.multiplier.max(1.0).powi(exponent);
        let seconds = (self.initial_delay.as_secs_f64() * factor).min(self.max_delay.as_secs_f64());

        Duration::from_secs_f64(seconds)
    }
}

/// Runs one remote call with classification-aware retries.
///
/// Only errors for which `AppError::is_retryable` holds are retried.
/// Cancellation interrupts both the call and the backoff sleep, and the last
/// observed error is returned unchanged once attempts run out.
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    /// Creates an executor for the given policy.
    #[must_use]
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy: RetryPolicy {
                max_attempts: policy.max_attempts.max(1),
                ..policy
            },
        }
    }

    /// Returns the effective policy.
    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Executes `operation` until it succeeds, fails terminally, runs out of
    /// attempts or the run is cancelled.
    pub async fn execute<T, F, Fut>(
        &self,
        operation_name: &str,
        cancellation: &CancellationToken,
        mut operation: F,
    ) -> AppResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let mut attempt = 0_u32;

        loop {
            attempt = attempt.saturating_add(1);

            let error = match cancellation.run(operation()).await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if !error.is_retryable() || attempt >= self.policy.max_attempts {
                return Err(error);
            }

            let delay = self.jittered_delay(attempt);
            warn!(
                operation = operation_name,
                attempt,
                max_attempts = self.policy.max_attempts,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %error,
                "remote call failed, retrying"
            );
            cancellation.sleep(delay).await?;
        }
    }

    fn jittered_delay(&self, attempt: u32) -> Duration {
        let delay = self.policy.base_delay(attempt);
        if !self.policy.jitter {
            return delay;
        }

        delay.mul_f64(rand::thread_rng().gen_range(0.5..=1.5))
    }
}
