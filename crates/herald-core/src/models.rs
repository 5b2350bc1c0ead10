use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::topics;

/// Short machine identifier for a content category, e.g. `weather-flood`.
pub type TopicSlug = String;

/// Smallest and largest number of items a single scrape may return.
pub const MIN_RESULT_LIMIT: i64 = 1;
pub const MAX_RESULT_LIMIT: i64 = 200;

/// A bare, normalized hostname. The unit of robots policy and throttling.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Domain(String);

impl Domain {
    /// Normalize a user- or config-supplied domain.
    ///
    /// Lower-cases, drops an `http://`/`https://` prefix and anything from
    /// the first `/`, and keeps only `[a-z0-9.-]`.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let lowered = raw.trim().to_lowercase();
        let without_scheme = lowered
            .strip_prefix("https://")
            .or_else(|| lowered.strip_prefix("http://"))
            .unwrap_or(&lowered);
        let host = without_scheme.split('/').next().unwrap_or_default();
        let cleaned: String = host
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '.' || *c == '-')
            .collect();
        let cleaned = cleaned.trim_matches('.').to_string();

        if cleaned.is_empty() {
            return Err(AppError::InvalidDomain(raw.to_string()));
        }
        Ok(Self(cleaned))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `https://{domain}`, the base every request for this domain resolves against.
    pub fn origin(&self) -> String {
        format!("https://{}", self.0)
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Domain {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Domain::parse(&value)
    }
}

impl From<Domain> for String {
    fn from(domain: Domain) -> Self {
        domain.0
    }
}

/// A resolved location, produced by a [`Geocoder`](crate::traits::Geocoder)
/// before the engine runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoContext {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl GeoContext {
    pub fn from_label(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            city: None,
            region: None,
            country: None,
            latitude: None,
            longitude: None,
        }
    }

    /// Place names worth looking for in article text, without blanks or repeats.
    pub fn place_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for name in [
            Some(self.label.as_str()),
            self.city.as_deref(),
            self.region.as_deref(),
        ]
        .into_iter()
        .flatten()
        {
            let name = name.trim();
            if !name.is_empty() && !names.iter().any(|n| n.eq_ignore_ascii_case(name)) {
                names.push(name);
            }
        }
        names
    }
}

/// An extracted, not-yet-classified article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCandidate {
    pub title: String,
    pub url: String,
    pub summary: String,
    /// Publish timestamp exactly as the source wrote it, if it wrote one.
    pub published_at_raw: Option<String>,
    pub image_url: Option<String>,
}

/// The externally visible unit of the engine's output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedItem {
    pub url: String,
    pub title: String,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub published_at: DateTime<Utc>,
    pub source_domain: String,
    pub categories: BTreeSet<TopicSlug>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_hints: Option<Vec<String>>,
}

/// Caller-supplied description of one scrape.
#[derive(Debug, Clone)]
pub struct ScrapeRequest {
    pub topic_filters: Vec<TopicSlug>,
    pub filter_query_clauses: Vec<String>,
    pub location_context: Option<GeoContext>,
    pub free_text_keywords: Vec<String>,
    pub domains: Vec<Domain>,
    pub since_timestamp: DateTime<Utc>,
    /// Requested limit; may be out of range, see [`ScrapeRequest::effective_limit`].
    pub result_limit: i64,
}

impl ScrapeRequest {
    /// Request over `domains` for everything published at or after `since`.
    pub fn new(domains: Vec<Domain>, since: DateTime<Utc>) -> Self {
        Self {
            topic_filters: Vec::new(),
            filter_query_clauses: Vec::new(),
            location_context: None,
            free_text_keywords: Vec::new(),
            domains,
            since_timestamp: since,
            result_limit: 50,
        }
    }

    /// Set topic filters, de-duplicating slugs and deriving one query clause per topic.
    pub fn with_topics<I, S>(mut self, slugs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut filters: Vec<TopicSlug> = Vec::new();
        for slug in slugs {
            let slug = slug.into().trim().to_lowercase();
            if !slug.is_empty() && !filters.contains(&slug) {
                filters.push(slug);
            }
        }
        self.filter_query_clauses = topics::filter_query_clauses(&filters);
        self.topic_filters = filters;
        self
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.free_text_keywords = keywords
            .into_iter()
            .map(Into::into)
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        self
    }

    pub fn with_location(mut self, location: GeoContext) -> Self {
        self.location_context = Some(location);
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.result_limit = limit;
        self
    }

    /// The result limit clamped into `[1, 200]`.
    pub fn effective_limit(&self) -> usize {
        clamp_limit(self.result_limit)
    }
}

/// Clamp a requested result limit into `[MIN_RESULT_LIMIT, MAX_RESULT_LIMIT]`.
pub fn clamp_limit(requested: i64) -> usize {
    requested.clamp(MIN_RESULT_LIMIT, MAX_RESULT_LIMIT) as usize
}
