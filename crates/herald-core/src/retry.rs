//! Bounded retry with linear backoff around any [`Fetcher`].

use std::time::Duration;

use crate::error::AppError;
use crate::traits::Fetcher;

/// Retry configuration with linear backoff.
///
/// Delay before retry `n` (1-indexed) is `base_delay * n`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// No retries at all, for fast test configurations.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

/// A [`Fetcher`] wrapper that retries failed requests.
///
/// Wrap a [`ThrottledFetcher`](crate::throttle::ThrottledFetcher) so every
/// attempt passes through the throttle. Only [`AppError::is_retryable`]
/// errors are retried. Once retries are exhausted the last error is
/// returned unchanged.
#[derive(Clone)]
pub struct RetryingFetcher<F> {
    inner: F,
    policy: RetryPolicy,
}

impl<F: Fetcher> RetryingFetcher<F> {
    pub fn new(inner: F, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

impl<F: Fetcher> Fetcher for RetryingFetcher<F> {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        let mut attempt = 0;
        loop {
            match self.inner.fetch(url).await {
                Ok(body) => return Ok(body),
                Err(e) if attempt < self.policy.max_retries && e.is_retryable() => {
                    attempt += 1;
                    let delay = self.policy.delay_for_attempt(attempt);
                    tracing::debug!(
                        %url,
                        attempt,
                        delay_ms = %delay.as_millis(),
                        error = %e,
                        "Fetch failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    if attempt > 0 {
                        tracing::warn!(%url, attempts = attempt + 1, error = %e, "Fetch retries exhausted");
                    }
                    return Err(e);
                }
            }
        }
    }
}
