use std::time::Duration;

use domain::auditlog::error::ConsumerError;

/// Retry policy with exponential backoff, used by outbound consumer
/// adapters for transport-level hiccups. Back-pressure across sustained
/// failure is the circuit breaker's job, so the attempt count stays small.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: usize,
    /// Delay before the second attempt; doubles per attempt afterwards.
    pub initial_backoff: Duration,
    /// Upper bound on any single backoff delay.
    pub max_backoff: Duration,
    /// Timeout applied to each individual attempt.
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(5),
            attempt_timeout: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    fn backoff_for(&self, completed_attempts: u32) -> Duration {
        let scaled = self
            .initial_backoff
            .saturating_mul(2u32.saturating_pow(completed_attempts.saturating_sub(1)));
        scaled.min(self.max_backoff)
    }
}

/// Run `op` until it succeeds or the policy is exhausted.
///
/// Each attempt is wrapped in the per-attempt timeout; the final error is
/// the one from the last attempt.
pub async fn with_retries<F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<(), ConsumerError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<(), ConsumerError>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut last_error = ConsumerError("no attempts made".to_string());

    for attempt in 1..=attempts {
        match tokio::time::timeout(policy.attempt_timeout, op()).await {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(e)) => last_error = e,
            Err(_) => last_error = ConsumerError("attempt timed out".to_string()),
        }

        if attempt < attempts {
            tokio::time::sleep(policy.backoff_for(attempt as u32)).await;
        }
    }

    Err(last_error)
}
