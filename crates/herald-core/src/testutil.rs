//! Test utilities: mock implementations of the core traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::AppError;
use crate::models::NormalizedItem;
use crate::traits::Fetcher;

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// A canned response that can be produced any number of times.
#[derive(Debug, Clone)]
enum MockResponse {
    Body(String),
    Status(u16),
    Redirect(String),
}

impl MockResponse {
    fn produce(&self, url: &str) -> Result<String, AppError> {
        match self {
            MockResponse::Body(body) => Ok(body.clone()),
            MockResponse::Status(code) => Err(AppError::HttpStatus {
                status: *code,
                url: url.to_string(),
            }),
            MockResponse::Redirect(location) => Err(AppError::Redirect {
                status: 302,
                url: url.to_string(),
                location: location.clone(),
            }),
        }
    }
}

/// Mock fetcher with per-URL routes and a recorded call log.
///
/// Resolution order for each call: queued one-shot responses first, then an
/// exact URL route, then the default response. Without a default, unknown
/// URLs answer with HTTP 404.
#[derive(Clone)]
pub struct MockFetcher {
    queued: Arc<Mutex<VecDeque<Result<String, AppError>>>>,
    routes: Arc<Mutex<HashMap<String, MockResponse>>>,
    default: Option<MockResponse>,
    delays: Arc<Mutex<HashMap<String, Duration>>>,
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl MockFetcher {
    /// Every URL answers with `body`.
    pub fn new(body: &str) -> Self {
        Self {
            default: Some(MockResponse::Body(body.to_string())),
            ..Self::routed()
        }
    }

    /// No routes yet; every URL answers 404 until routes are added.
    pub fn routed() -> Self {
        Self {
            queued: Arc::new(Mutex::new(VecDeque::new())),
            routes: Arc::new(Mutex::new(HashMap::new())),
            default: None,
            delays: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// The first call fails with `error`; later calls answer 404.
    pub fn with_error(error: AppError) -> Self {
        Self::with_responses(vec![Err(error)])
    }

    /// Responses returned in order, regardless of URL.
    pub fn with_responses(responses: Vec<Result<String, AppError>>) -> Self {
        let fetcher = Self::routed();
        fetcher.queued.lock().unwrap().extend(responses);
        fetcher
    }

    pub fn route(self, url: &str, body: &str) -> Self {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), MockResponse::Body(body.to_string()));
        self
    }

    pub fn route_status(self, url: &str, status: u16) -> Self {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), MockResponse::Status(status));
        self
    }

    /// `url` answers 302 pointing at `location`.
    pub fn route_redirect(self, url: &str, location: &str) -> Self {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), MockResponse::Redirect(location.to_string()));
        self
    }

    /// Calls to `url` wait `delay` before answering.
    pub fn stall(self, url: &str, delay: Duration) -> Self {
        self.delays.lock().unwrap().insert(url.to_string(), delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn was_called(&self, url: &str) -> bool {
        self.calls.lock().unwrap().iter().any(|c| c == url)
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        self.calls.lock().unwrap().push(url.to_string());

        let delay = self.delays.lock().unwrap().get(url).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(queued) = self.queued.lock().unwrap().pop_front() {
            return queued;
        }
        if let Some(response) = self.routes.lock().unwrap().get(url) {
            return response.produce(url);
        }
        match &self.default {
            Some(response) => response.produce(url),
            None => MockResponse::Status(404).produce(url),
        }
    }
}

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

pub fn ts(rfc3339: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(rfc3339)
        .unwrap()
        .with_timezone(&Utc)
}

/// Minimal item for dedup/ordering tests.
pub fn make_item(url: &str, title: &str, published_at: &str) -> NormalizedItem {
    NormalizedItem {
        url: url.to_string(),
        title: title.to_string(),
        summary: String::new(),
        image_url: None,
        published_at: ts(published_at),
        source_domain: "example.com".to_string(),
        categories: Default::default(),
        location_hints: None,
    }
}

/// An RSS 2.0 document with one `<item>` per `(title, link, pubDate)`.
pub fn rss(items: &[(&str, &str, &str)]) -> String {
    let mut body = String::from(r#"<?xml version="1.0"?><rss version="2.0"><channel><title>Test</title>"#);
    for (title, link, date) in items {
        body.push_str(&format!(
            "<item><title>{title}</title><link>{link}</link>\
             <description>{title}</description><pubDate>{date}</pubDate></item>"
        ));
    }
    body.push_str("</channel></rss>");
    body
}
