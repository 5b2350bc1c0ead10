use herald_core::config::EngineConfig;
use herald_core::error::AppError;
use herald_core::retry::RetryingFetcher;
use herald_core::scrape::ScrapeService;
use herald_core::throttle::{DomainThrottler, ThrottledFetcher};

use crate::fetcher::ReqwestFetcher;

/// Page fetches: throttled per domain, retried on failure.
pub type PageFetcher = RetryingFetcher<ThrottledFetcher<ReqwestFetcher>>;

/// robots.txt fetches: throttled, never retried (fail-open instead).
pub type RobotsFetcher = ThrottledFetcher<ReqwestFetcher>;

pub type NewsEngine = ScrapeService<PageFetcher, RobotsFetcher>;

/// Wire the production engine. Page and robots fetches share one throttle
/// map, so robots lookups count against a domain's request budget.
pub fn build_engine(config: EngineConfig, allow_private_hosts: bool) -> Result<NewsEngine, AppError> {
    let mut http = ReqwestFetcher::from_config(&config)?;
    if allow_private_hosts {
        http = http.allow_private_hosts();
    }

    let throttler = DomainThrottler::new(config.throttle.clone());
    let pages = RetryingFetcher::new(
        ThrottledFetcher::with_throttler(http.clone(), throttler.clone()),
        config.retry.clone(),
    );
    let robots = ThrottledFetcher::with_throttler(http, throttler);

    tracing::debug!(
        user_agent = %config.user_agent,
        concurrency = config.concurrency,
        min_interval_ms = config.throttle.min_interval.as_millis() as u64,
        "Engine configured"
    );
    Ok(ScrapeService::new(pages, robots, config))
}
