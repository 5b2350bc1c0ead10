pub mod anchors;
pub mod config;
pub mod cursor;
pub mod dedupe;
pub mod error;
pub mod feed;
pub mod models;
pub mod retry;
pub mod robots;
pub mod scheduler;
pub mod scrape;
pub mod throttle;
pub mod topics;
pub mod traits;

#[cfg(test)]
pub mod testutil;

pub use config::EngineConfig;
pub use cursor::Cursor;
pub use error::AppError;
pub use models::{Domain, GeoContext, NormalizedItem, RawCandidate, ScrapeRequest, TopicSlug};
pub use retry::{RetryPolicy, RetryingFetcher};
pub use robots::RobotsGate;
pub use scrape::ScrapeService;
pub use throttle::{DomainThrottler, ThrottleConfig, ThrottledFetcher};
pub use traits::{DomainAllowlist, Fetcher, Geocoder, LabelGeocoder, StaticAllowlist};
