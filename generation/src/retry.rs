//! Exponential backoff for transient provider failures.

use backoff::backoff::Backoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use config::RetryConfig;
use errors::{PortraitError, PortraitResult};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_interval: Duration,
    multiplier: f64,
    max_interval: Duration
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    /// `max_attempts` counts every provider call, the first one included.
    /// Zero is treated as one.
    pub fn new(max_attempts: u32, initial_interval: Duration, multiplier: f64, max_interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_interval,
            multiplier: if multiplier.is_finite() && multiplier >= 1.0 { multiplier } else { 1.0 },
            max_interval
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_retries,
            config.initial_delay(),
            config.multiplier,
            config.max_delay()
        )
    }

    /// A policy that never retries.
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO, 1.0, Duration::ZERO)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Deterministic exponential schedule: `initial * multiplier^n` clamped
    /// to the maximum interval, without jitter or an elapsed-time limit.
    fn schedule(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_interval)
            .with_multiplier(self.multiplier)
            .with_max_interval(self.max_interval)
            .with_randomization_factor(0.0)
            .with_max_elapsed_time(None)
            .build()
    }

    fn next_delay(&self, schedule: &mut ExponentialBackoff) -> Duration {
        schedule
            .next_backoff()
            .unwrap_or(self.max_interval)
            .min(self.max_interval)
    }

    /// Delay before retry number `retry` (0-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let mut schedule = self.schedule();
        let mut delay = self.next_delay(&mut schedule);
        for _ in 0..retry {
            let next = self.next_delay(&mut schedule);
            if next == delay {
                break;
            }
            delay = next;
        }
        whole_millis(delay)
    }

    /// Delay after `error`, honouring a provider `Retry-After` hint when it is
    /// longer than the computed backoff. Never exceeds the maximum interval.
    pub fn delay_for(&self, retry: u32, error: &PortraitError) -> Duration {
        self.throttled(self.backoff(retry), error)
    }

    fn throttled(&self, backoff: Duration, error: &PortraitError) -> Duration {
        match error.retry_after() {
            Some(seconds) => backoff
                .max(Duration::from_secs(seconds))
                .min(self.max_interval),
            None => backoff
        }
    }

    /// Run `operation` until it succeeds, fails permanently or exhausts the
    /// attempt budget. The closure receives the 1-based attempt number.
    pub async fn execute<T, F, Fut>(&self, cancel: &CancellationToken, operation: F) -> PortraitResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = PortraitResult<T>>
    {
        self.execute_observed(cancel, operation, |_, _, _| {}).await
    }

    /// Like [`execute`](Self::execute), calling `on_retry(attempt, error, delay)`
    /// before each backoff sleep.
    pub async fn execute_observed<T, F, Fut, R>(
        &self,
        cancel: &CancellationToken,
        mut operation: F,
        mut on_retry: R
    ) -> PortraitResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = PortraitResult<T>>,
        R: FnMut(u32, &PortraitError, Duration)
    {
        let mut schedule = self.schedule();
        let mut attempt = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(PortraitError::Cancelled);
            }
            attempt += 1;

            let error = match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) => error
            };

            if !error.is_transient() {
                debug!(attempt, error = %error, "Permanent failure, not retrying");
                return Err(error);
            }
            if attempt >= self.max_attempts {
                warn!(
                    attempts = attempt,
                    error = %error,
                    "Retry budget exhausted"
                );
                return Err(error);
            }

            let delay = self.throttled(whole_millis(self.next_delay(&mut schedule)), &error);
            warn!(
                attempt,
                max_attempts = self.max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Transient failure, retrying"
            );
            on_retry(attempt, &error, delay);

            tokio::select! {
                () = cancel.cancelled() => return Err(PortraitError::Cancelled),
                () = tokio::time::sleep(delay) => {}
            }
        }
    }
}

/// The schedule works in floating point nanoseconds.
fn whole_millis(delay: Duration) -> Duration {
    Duration::from_millis(u64::try_from(delay.as_millis()).unwrap_or(u64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn connection_error() -> PortraitError {
        PortraitError::ApiConnection {
            status: Some(503),
            reason: "unavailable".to_string()
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(1000), 2.0, Duration::from_secs(30))
    }

    #[test]
    fn test_backoff_sequence() {
        let policy = policy();
        assert_eq!(policy.backoff(0), Duration::from_millis(1000));
        assert_eq!(policy.backoff(1), Duration::from_millis(2000));
        assert_eq!(policy.backoff(2), Duration::from_millis(4000));
        assert_eq!(policy.backoff(10), Duration::from_secs(30));
        assert_eq!(policy.backoff(u32::MAX), Duration::from_secs(30));
    }

    #[test]
    fn test_backoff_is_deterministic() {
        let policy = RetryPolicy::new(5, Duration::from_millis(250), 1.5, Duration::from_secs(2));
        let first: Vec<_> = (0..8).map(|retry| policy.backoff(retry)).collect();
        let second: Vec<_> = (0..8).map(|retry| policy.backoff(retry)).collect();

        assert_eq!(first, second);
        assert_eq!(first[..3], [
            Duration::from_millis(250),
            Duration::from_millis(375),
            Duration::from_millis(562)
        ]);
        assert_eq!(first[5], Duration::from_millis(1898));
        assert_eq!(first[6..], [Duration::from_secs(2), Duration::from_secs(2)]);
    }

    #[test]
    fn test_zero_interval_never_waits() {
        let policy = RetryPolicy::new(3, Duration::ZERO, 2.0, Duration::from_secs(1));
        assert_eq!(policy.backoff(u32::MAX), Duration::ZERO);
    }

    #[test]
    fn test_zero_attempts_means_single_attempt() {
        let policy = RetryPolicy::new(0, Duration::from_millis(10), 2.0, Duration::from_secs(1));
        assert_eq!(policy.max_attempts(), 1);
    }

    #[test]
    fn test_retry_after_extends_but_is_capped() {
        let policy = policy();
        let throttled = |secs| PortraitError::ApiRateLimit {
            retry_after_secs: Some(secs)
        };

        assert_eq!(policy.delay_for(0, &throttled(5)), Duration::from_secs(5));
        assert_eq!(policy.delay_for(1, &throttled(1)), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(0, &throttled(120)), Duration::from_secs(30));
        assert_eq!(policy.delay_for(0, &connection_error()), Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_are_retried_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let started = Instant::now();

        let result = policy()
            .execute(&CancellationToken::new(), |_| {
                let counter = Arc::clone(&counter);
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(connection_error())
                    } else {
                        Ok("image")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "image");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(started.elapsed() >= Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_failure_is_not_retried() {
        let calls = AtomicU32::new(0);

        let result: PortraitResult<()> = policy()
            .execute(&CancellationToken::new(), |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(PortraitError::ApiAuthentication {
                        status: 401,
                        message: "invalid key".to_string()
                    })
                }
            })
            .await;

        assert!(matches!(result, Err(PortraitError::ApiAuthentication { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_exhaustion_returns_last_error() {
        let mut retries = Vec::new();

        let result: PortraitResult<()> = policy()
            .execute_observed(
                &CancellationToken::new(),
                |attempt| async move {
                    Err(PortraitError::ApiConnection {
                        status: None,
                        reason: format!("attempt {attempt}")
                    })
                },
                |attempt, _, delay| retries.push((attempt, delay))
            )
            .await;

        match result {
            Err(PortraitError::ApiConnection { reason, .. }) => assert_eq!(reason, "attempt 3"),
            other => panic!("unexpected result: {other:?}")
        }
        assert_eq!(retries, vec![
            (1, Duration::from_millis(1000)),
            (2, Duration::from_millis(2000))
        ]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_interrupts_backoff() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            trigger.cancel();
        });

        let result: PortraitResult<()> = policy()
            .execute(&cancel, |_| async { Err(connection_error()) })
            .await;

        assert!(matches!(result, Err(PortraitError::Cancelled)));
    }
}
