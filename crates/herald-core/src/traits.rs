use std::future::Future;

use crate::error::AppError;
use crate::models::{Domain, GeoContext};

/// Fetches the body of a URL as text. Non-2xx responses are errors.
pub trait Fetcher: Send + Sync + Clone {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, AppError>> + Send;
}

/// Supplies the universe of domains a scrape may touch.
pub trait DomainAllowlist: Send + Sync + Clone {
    fn load_allowed_domains(&self) -> impl Future<Output = Result<Vec<Domain>, AppError>> + Send;
}

/// Resolves a free-text location before the engine is invoked.
///
/// `Ok(None)` means the location could not be resolved; callers treat
/// that as a validation failure.
pub trait Geocoder: Send + Sync + Clone {
    fn geocode(
        &self,
        location_query: &str,
    ) -> impl Future<Output = Result<Option<GeoContext>, AppError>> + Send;
}

/// Allowlist backed by a fixed, in-memory list.
#[derive(Debug, Clone, Default)]
pub struct StaticAllowlist {
    domains: Vec<Domain>,
}

impl StaticAllowlist {
    pub fn new(domains: Vec<Domain>) -> Self {
        Self { domains }
    }
}

impl DomainAllowlist for StaticAllowlist {
    async fn load_allowed_domains(&self) -> Result<Vec<Domain>, AppError> {
        Ok(self.domains.clone())
    }
}

/// A geocoder that does no lookup: any non-blank query becomes a
/// label-only [`GeoContext`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LabelGeocoder;

impl Geocoder for LabelGeocoder {
    async fn geocode(&self, location_query: &str) -> Result<Option<GeoContext>, AppError> {
        let label = location_query.trim();
        if label.is_empty() {
            return Ok(None);
        }
        Ok(Some(GeoContext::from_label(label)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn label_geocoder_rejects_blank() {
        assert!(LabelGeocoder.geocode("   ").await.unwrap().is_none());
        let geo = LabelGeocoder.geocode(" Duluth ").await.unwrap().unwrap();
        assert_eq!(geo.label, "Duluth");
    }

    #[tokio::test]
    async fn static_allowlist_returns_domains() {
        let list = StaticAllowlist::new(vec![Domain::parse("a.com").unwrap()]);
        assert_eq!(list.load_allowed_domains().await.unwrap().len(), 1);
    }
}
