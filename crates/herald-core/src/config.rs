use std::str::FromStr;
use std::time::Duration;

use crate::error::AppError;
use crate::retry::RetryPolicy;
use crate::scheduler::DEFAULT_CONCURRENCY;
use crate::throttle::ThrottleConfig;

pub const DEFAULT_USER_AGENT: &str = "HeraldBot/0.1 (+https://github.com/herald-news/herald)";

/// Well-known feed locations tried on every domain, in order.
pub const DEFAULT_FEED_PATHS: &[&str] = &["/feed", "/rss", "/rss.xml", "/feed.xml", "/atom.xml"];

/// Tunables for the discovery engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub throttle: ThrottleConfig,
    pub retry: RetryPolicy,
    /// Domains processed at once.
    pub concurrency: usize,
    /// Most items a single domain may contribute.
    pub per_domain_cap: usize,
    pub robots_ttl: Duration,
    /// Hard deadline for a single HTTP request.
    pub fetch_timeout: Duration,
    /// Optional deadline for a whole scrape.
    pub scrape_deadline: Option<Duration>,
    pub user_agent: String,
    pub feed_paths: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            throttle: ThrottleConfig::default(),
            retry: RetryPolicy::default(),
            concurrency: DEFAULT_CONCURRENCY,
            per_domain_cap: 40,
            robots_ttl: Duration::from_secs(3600),
            fetch_timeout: Duration::from_secs(15),
            scrape_deadline: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            feed_paths: DEFAULT_FEED_PATHS.iter().map(|p| p.to_string()).collect(),
        }
    }
}

impl EngineConfig {
    /// Near-zero throttle and no retries, for tests and CI.
    pub fn fast() -> Self {
        Self {
            throttle: ThrottleConfig::new(Duration::from_millis(1)),
            retry: RetryPolicy::none(),
            fetch_timeout: Duration::from_secs(5),
            ..Self::default()
        }
    }

    /// The product token robots.txt groups are matched against.
    pub fn robots_agent(&self) -> &str {
        self.user_agent
            .split(['/', ' '])
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or("HeraldBot")
    }

    /// Read configuration from environment variables, falling back to
    /// [`EngineConfig::default`] for anything unset.
    ///
    /// - `HERALD_MIN_INTERVAL_MS`, `HERALD_THROTTLE_JITTER_MS`
    /// - `HERALD_MAX_RETRIES`, `HERALD_RETRY_BASE_MS`
    /// - `HERALD_CONCURRENCY`, `HERALD_PER_DOMAIN_CAP` (at least 1)
    /// - `HERALD_ROBOTS_TTL_SECS`, `HERALD_FETCH_TIMEOUT_SECS`
    /// - `HERALD_SCRAPE_DEADLINE_SECS` (unset means no deadline)
    /// - `HERALD_USER_AGENT`
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(raw) = get("HERALD_MIN_INTERVAL_MS") {
            config.throttle.min_interval = Duration::from_millis(parse_num("HERALD_MIN_INTERVAL_MS", &raw)?);
        }
        if let Some(raw) = get("HERALD_THROTTLE_JITTER_MS") {
            config.throttle.jitter = Duration::from_millis(parse_num("HERALD_THROTTLE_JITTER_MS", &raw)?);
        }
        if let Some(raw) = get("HERALD_MAX_RETRIES") {
            config.retry.max_retries = parse_num("HERALD_MAX_RETRIES", &raw)?;
        }
        if let Some(raw) = get("HERALD_RETRY_BASE_MS") {
            config.retry.base_delay = Duration::from_millis(parse_num("HERALD_RETRY_BASE_MS", &raw)?);
        }
        if let Some(raw) = get("HERALD_CONCURRENCY") {
            config.concurrency = parse_positive("HERALD_CONCURRENCY", &raw)?;
        }
        if let Some(raw) = get("HERALD_PER_DOMAIN_CAP") {
            config.per_domain_cap = parse_positive("HERALD_PER_DOMAIN_CAP", &raw)?;
        }
        if let Some(raw) = get("HERALD_ROBOTS_TTL_SECS") {
            config.robots_ttl = Duration::from_secs(parse_num("HERALD_ROBOTS_TTL_SECS", &raw)?);
        }
        if let Some(raw) = get("HERALD_FETCH_TIMEOUT_SECS") {
            config.fetch_timeout =
                Duration::from_secs(parse_positive("HERALD_FETCH_TIMEOUT_SECS", &raw)?);
        }
        if let Some(raw) = get("HERALD_SCRAPE_DEADLINE_SECS") {
            config.scrape_deadline = Some(Duration::from_secs(parse_positive(
                "HERALD_SCRAPE_DEADLINE_SECS",
                &raw,
            )?));
        }
        if let Some(raw) = get("HERALD_USER_AGENT") {
            config.user_agent = raw.trim().to_string();
        }

        Ok(config)
    }
}

fn parse_num<T: FromStr>(key: &str, raw: &str) -> Result<T, AppError> {
    raw.trim().parse().map_err(|_| {
        AppError::ConfigError(format!("Invalid {key} '{raw}': must be a non-negative integer"))
    })
}

fn parse_positive<T: FromStr + Default + PartialEq + Copy>(key: &str, raw: &str) -> Result<T, AppError> {
    let parsed: T = parse_num(key, raw)?;
    if parsed == T::default() {
        return Err(AppError::ConfigError(format!("{key} must be at least 1")));
    }
    Ok(parsed)
}
