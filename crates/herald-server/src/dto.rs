use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use herald_core::models::NormalizedItem;
use herald_core::topics::TopicDef;

// ---------------------------------------------------------------------------
// News
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NewsQuery {
    /// Comma-separated topic slugs, e.g. `weather-flood,power-outage`.
    pub topics: Option<String>,
    /// Free-text words; an article must contain at least one.
    pub q: Option<String>,
    /// Place name used to tag matching articles.
    pub location: Option<String>,
    /// RFC 3339 lower bound on publish time. Defaults to 48 hours ago.
    pub since: Option<String>,
    /// Page size, clamped to 1..=200. Defaults to 20.
    pub limit: Option<i64>,
    /// Opaque continuation token from a previous response. When present,
    /// all other parameters are ignored.
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    pub url: String,
    pub title: String,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub published_at: DateTime<Utc>,
    pub source_domain: String,
    /// Topic slugs, sorted.
    pub categories: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_hints: Option<Vec<String>>,
}

impl From<NormalizedItem> for NewsItem {
    fn from(item: NormalizedItem) -> Self {
        Self {
            url: item.url,
            title: item.title,
            summary: item.summary,
            image_url: item.image_url,
            published_at: item.published_at,
            source_domain: item.source_domain,
            categories: item.categories.into_iter().collect(),
            location_hints: item.location_hints,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewsResponse {
    pub items: Vec<NewsItem>,
    pub has_more: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

// ---------------------------------------------------------------------------
// Topics
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct TopicResponse {
    pub slug: &'static str,
    pub label: &'static str,
    pub keywords: Vec<&'static str>,
}

impl From<&TopicDef> for TopicResponse {
    fn from(topic: &TopicDef) -> Self {
        Self {
            slug: topic.slug,
            label: topic.label,
            keywords: topic.keywords.to_vec(),
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct TopicListResponse {
    pub topics: Vec<TopicResponse>,
}

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub allowlist: &'static str,
    pub domains: usize,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}
