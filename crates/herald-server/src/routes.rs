use std::sync::Arc;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use chrono::{DateTime, Duration, Utc};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use herald_core::cursor::{Cursor, has_more};
use herald_core::error::AppError;
use herald_core::models::{Domain, NormalizedItem, ScrapeRequest, TopicSlug, clamp_limit};
use herald_core::topics::{TOPICS, is_known_topic};
use herald_core::traits::{DomainAllowlist, Geocoder};

use crate::dto::{
    HealthResponse, NewsItem, NewsQuery, NewsResponse, TopicListResponse, TopicResponse,
};
use crate::error::ApiError;
use crate::openapi::ApiDoc;
use crate::state::AppState;

/// Page size when the caller gives none.
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Lookback window when the caller gives no `since`.
pub const DEFAULT_LOOKBACK_HOURS: i64 = 48;

/// Build the full router with all routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/news", get(news))
        .route("/v1/topics", get(topics))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// News
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/v1/news",
    params(NewsQuery),
    responses(
        (status = 200, description = "One page of recent articles", body = NewsResponse),
        (status = 400, description = "Unknown topic, bad location or malformed cursor", body = crate::dto::ErrorResponse),
    ),
    tag = "news"
)]
pub async fn news(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NewsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let cursor = match query.cursor.as_deref().filter(|c| !c.trim().is_empty()) {
        Some(token) => {
            let cursor = Cursor::decode(token)?;
            validate_topics(&cursor.topic_filters)?;
            cursor
        }
        None => first_page(&query, &state.geocoder, Utc::now()).await?,
    };

    let domains = state.allowlist.load_allowed_domains().await?;
    let request = scrape_request(&cursor, domains);

    tracing::info!(
        page = cursor.page_number,
        page_size = cursor.page_size,
        topics = ?cursor.topic_filters,
        "News request"
    );
    let items = state.engine.scrape(&request).await;

    Ok(axum::Json(build_page(items, &cursor)?))
}

/// Cursor for page 1 built from plain query parameters.
async fn first_page<G: Geocoder>(
    query: &NewsQuery,
    geocoder: &G,
    now: DateTime<Utc>,
) -> Result<Cursor, AppError> {
    let topic_filters = parse_topics(query.topics.as_deref())?;

    let since_timestamp = match query.since.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(raw) => DateTime::parse_from_rfc3339(raw.trim())
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| AppError::ValidationError(format!("Invalid since '{raw}': {e}")))?,
        None => now - Duration::hours(DEFAULT_LOOKBACK_HOURS),
    };

    let location_context = match query.location.as_deref() {
        Some(raw) => Some(geocoder.geocode(raw).await?.ok_or_else(|| {
            AppError::ValidationError(format!("Could not resolve location '{raw}'"))
        })?),
        None => None,
    };

    let free_text_query = query
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_string);

    Ok(Cursor {
        topic_filters,
        free_text_query,
        since_timestamp,
        page_size: clamp_limit(query.limit.unwrap_or(DEFAULT_PAGE_SIZE)),
        page_number: 1,
        location_context,
    })
}

/// Split a comma list of slugs, rejecting any outside the vocabulary.
fn parse_topics(raw: Option<&str>) -> Result<Vec<TopicSlug>, AppError> {
    let mut slugs: Vec<TopicSlug> = Vec::new();
    for slug in raw.unwrap_or_default().split(',') {
        let slug = slug.trim().to_lowercase();
        if !slug.is_empty() && !slugs.contains(&slug) {
            slugs.push(slug);
        }
    }
    validate_topics(&slugs)?;
    Ok(slugs)
}

fn validate_topics(slugs: &[TopicSlug]) -> Result<(), AppError> {
    match slugs.iter().find(|s| !is_known_topic(s)) {
        Some(unknown) => Err(AppError::ValidationError(format!("Unknown topic '{unknown}'"))),
        None => Ok(()),
    }
}

/// The engine request that covers every page up to the cursor's.
fn scrape_request(cursor: &Cursor, domains: Vec<Domain>) -> ScrapeRequest {
    let keywords: Vec<String> = cursor
        .free_text_query
        .as_deref()
        .map(|q| q.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default();

    let mut request = ScrapeRequest::new(domains, cursor.since_timestamp)
        .with_topics(cursor.topic_filters.iter().cloned())
        .with_keywords(keywords)
        .with_limit(cursor.effective_limit() as i64);
    if let Some(geo) = cursor.location_context.clone() {
        request = request.with_location(geo);
    }
    request
}

/// Slice the cursor's page out of the engine output and decide on a next cursor.
fn build_page(items: Vec<NormalizedItem>, cursor: &Cursor) -> Result<NewsResponse, AppError> {
    let more = has_more(cursor.effective_limit(), items.len());
    let range = cursor.page_range(items.len());
    let next_cursor = if more {
        Some(cursor.next().encode()?)
    } else {
        None
    };

    Ok(NewsResponse {
        items: items
            .into_iter()
            .skip(range.start)
            .take(range.len())
            .map(NewsItem::from)
            .collect(),
        has_more: more,
        next_cursor,
    })
}

// ---------------------------------------------------------------------------
// Topics
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/v1/topics",
    responses(
        (status = 200, description = "Topic vocabulary", body = TopicListResponse),
    ),
    tag = "news"
)]
pub async fn topics() -> impl IntoResponse {
    axum::Json(TopicListResponse {
        topics: TOPICS.iter().map(TopicResponse::from).collect(),
    })
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Domain allowlist cannot be loaded", body = HealthResponse),
    ),
    tag = "system"
)]
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (status, response) = match state.allowlist.load_allowed_domains().await {
        Ok(domains) => (
            StatusCode::OK,
            HealthResponse {
                status: "healthy",
                allowlist: "ok",
                domains: domains.len(),
            },
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Allowlist unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                HealthResponse {
                    status: "unhealthy",
                    allowlist: "error",
                    domains: 0,
                },
            )
        }
    };

    (status, axum::Json(response))
}

#[cfg(test)]
mod tests {
    use herald_core::traits::LabelGeocoder;

    use super::*;

    fn item(n: usize) -> NormalizedItem {
        NormalizedItem {
            url: format!("https://a.com/{n}"),
            title: format!("Story {n}"),
            summary: String::new(),
            image_url: None,
            published_at: Utc::now(),
            source_domain: "a.com".into(),
            categories: Default::default(),
            location_hints: None,
        }
    }

    fn cursor(page_size: usize, page_number: usize) -> Cursor {
        Cursor {
            topic_filters: vec![],
            free_text_query: None,
            since_timestamp: Utc::now(),
            page_size,
            page_number,
            location_context: None,
        }
    }

    #[test]
    fn topics_are_validated_and_deduplicated() {
        assert_eq!(
            parse_topics(Some("Wildfire, wildfire,,earthquake")).unwrap(),
            vec!["wildfire".to_string(), "earthquake".to_string()]
        );
        assert!(parse_topics(None).unwrap().is_empty());
        assert!(matches!(
            parse_topics(Some("wildfire,alien-invasion")),
            Err(AppError::ValidationError(msg)) if msg.contains("alien-invasion")
        ));
    }

    #[tokio::test]
    async fn first_page_defaults() {
        let now = Utc::now();
        let cursor = first_page(&NewsQuery::default(), &LabelGeocoder, now)
            .await
            .unwrap();
        assert_eq!(cursor.page_number, 1);
        assert_eq!(cursor.page_size, 20);
        assert_eq!(cursor.since_timestamp, now - Duration::hours(48));
        assert!(cursor.location_context.is_none());
    }

    #[tokio::test]
    async fn first_page_rejects_bad_input() {
        let bad_since = NewsQuery {
            since: Some("yesterday".into()),
            ..Default::default()
        };
        assert!(matches!(
            first_page(&bad_since, &LabelGeocoder, Utc::now()).await,
            Err(AppError::ValidationError(_))
        ));

        let blank_location = NewsQuery {
            location: Some("  ".into()),
            ..Default::default()
        };
        assert!(matches!(
            first_page(&blank_location, &LabelGeocoder, Utc::now()).await,
            Err(AppError::ValidationError(_))
        ));
    }

    #[test]
    fn scrape_request_covers_all_pages_so_far() {
        let mut c = cursor(5, 3);
        c.free_text_query = Some("river  road".into());
        c.topic_filters = vec!["weather-flood".into()];

        let request = scrape_request(&c, vec![]);
        assert_eq!(request.effective_limit(), 15);
        assert_eq!(request.free_text_keywords, vec!["river", "road"]);
        assert_eq!(request.filter_query_clauses.len(), 1);
    }

    #[test]
    fn first_page_with_full_supply_has_next_cursor() {
        let page = build_page((0..5).map(item).collect(), &cursor(5, 1)).unwrap();
        assert_eq!(page.items.len(), 5);
        assert!(page.has_more);

        let next = Cursor::decode(page.next_cursor.as_deref().unwrap()).unwrap();
        assert_eq!(next.page_number, 2);
    }

    #[test]
    fn second_page_slices_after_first() {
        let page = build_page((0..10).map(item).collect(), &cursor(5, 2)).unwrap();
        let urls: Vec<_> = page.items.iter().map(|i| i.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://a.com/5",
                "https://a.com/6",
                "https://a.com/7",
                "https://a.com/8",
                "https://a.com/9"
            ]
        );
    }

    #[test]
    fn short_supply_ends_pagination() {
        let page = build_page((0..7).map(item).collect(), &cursor(5, 2)).unwrap();
        assert_eq!(page.items.len(), 2);
        assert!(!page.has_more);
        assert!(page.next_cursor.is_none());
    }

    #[test]
    fn engine_maximum_ends_pagination() {
        let page = build_page((0..200).map(item).collect(), &cursor(100, 2)).unwrap();
        assert_eq!(page.items.len(), 100);
        assert!(!page.has_more);
    }
}
