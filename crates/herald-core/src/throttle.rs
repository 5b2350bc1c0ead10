//! Per-domain request throttling for polite fetching.
//!
//! [`DomainThrottler`] tracks the last request time per domain and makes
//! callers wait until the minimum interval has elapsed. [`ThrottledFetcher`]
//! wraps any [`Fetcher`] so every request goes through the throttler.
//! Requests to different domains never wait on each other.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use herald_core::throttle::{ThrottledFetcher, ThrottleConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! # use herald_core::traits::Fetcher;
//! # #[derive(Clone)] struct MyFetcher;
//! # impl Fetcher for MyFetcher {
//! #     async fn fetch(&self, _: &str) -> Result<String, herald_core::error::AppError> { todo!() }
//! # }
//! let config = ThrottleConfig::new(Duration::from_secs(1));
//! let fetcher = ThrottledFetcher::new(MyFetcher, config);
//! let body = fetcher.fetch("https://example.com/feed").await?;
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use url::Url;

use crate::error::AppError;
use crate::traits::Fetcher;

/// Configuration for the domain throttler.
#[derive(Debug, Clone)]
pub struct ThrottleConfig {
    /// Minimum interval between consecutive requests to the same domain.
    pub min_interval: Duration,

    /// Maximum random jitter added on top of `min_interval` (uniform [0, jitter]).
    /// `Duration::ZERO` disables it.
    pub jitter: Duration,
}

impl ThrottleConfig {
    /// Create a new config with the given per-domain interval and no jitter.
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            jitter: Duration::ZERO,
        }
    }

    /// Add random jitter (uniform [0, jitter]) on top of the interval.
    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    fn effective_interval(&self) -> Duration {
        if self.jitter.is_zero() {
            return self.min_interval;
        }
        let jitter_ms = rand_jitter_ms(self.jitter.as_millis() as u64);
        self.min_interval + Duration::from_millis(jitter_ms)
    }
}

impl Default for ThrottleConfig {
    /// One request per second per domain.
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

/// Shared last-request-time map keyed by domain.
///
/// Cloning is cheap and clones share the same map.
#[derive(Clone)]
pub struct DomainThrottler {
    config: ThrottleConfig,
    last_request: Arc<Mutex<HashMap<String, Instant>>>,
}

impl DomainThrottler {
    pub fn new(config: ThrottleConfig) -> Self {
        Self {
            config,
            last_request: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Suspend until a request to `domain` is allowed, then record it.
    pub async fn before_request(&self, domain: &str) {
        let mut map = self.last_request.lock().await;

        let wait = map.get(domain).and_then(|last| {
            let required = self.config.effective_interval();
            required.checked_sub(last.elapsed()).filter(|d| !d.is_zero())
        });

        if let Some(sleep_duration) = wait {
            // Drop the lock while sleeping so other domains aren't blocked.
            drop(map);
            tracing::debug!(
                domain = %domain,
                sleep_ms = %sleep_duration.as_millis(),
                "Throttling request"
            );
            tokio::time::sleep(sleep_duration).await;
            map = self.last_request.lock().await;
        }

        map.insert(domain.to_string(), Instant::now());
    }
}

/// A [`Fetcher`] wrapper that runs every request through a [`DomainThrottler`].
#[derive(Clone)]
pub struct ThrottledFetcher<F> {
    inner: F,
    throttler: DomainThrottler,
}

impl<F: Fetcher> ThrottledFetcher<F> {
    pub fn new(inner: F, config: ThrottleConfig) -> Self {
        Self::with_throttler(inner, DomainThrottler::new(config))
    }

    /// Wrap `inner` with an existing (possibly shared) throttler.
    pub fn with_throttler(inner: F, throttler: DomainThrottler) -> Self {
        Self { inner, throttler }
    }

    /// The throttling key for a URL: its lower-cased host.
    fn domain_key(url_str: &str) -> Option<String> {
        let url = Url::parse(url_str).ok()?;
        url.host_str().map(str::to_lowercase)
    }
}

impl<F: Fetcher> Fetcher for ThrottledFetcher<F> {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        if let Some(domain) = Self::domain_key(url) {
            self.throttler.before_request(&domain).await;
        }
        self.inner.fetch(url).await
    }
}

// Jitter from a xorshift seeded by the clock; not for anything security related.
fn rand_jitter_ms(max_ms: u64) -> u64 {
    if max_ms == 0 {
        return 0;
    }
    let mut x = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64;
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    x % max_ms
}
