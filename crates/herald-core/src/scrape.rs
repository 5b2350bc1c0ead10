use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::anchors::{AnchorScanner, derive_search_terms, search_paths};
use crate::config::EngineConfig;
use crate::dedupe::{canonical_url, dedupe};
use crate::error::AppError;
use crate::feed::{FeedExtractor, parse_published};
use crate::models::{Domain, GeoContext, NormalizedItem, RawCandidate, ScrapeRequest, TopicSlug};
use crate::robots::RobotsGate;
use crate::scheduler::run_bounded;
use crate::topics::classify;
use crate::traits::Fetcher;

/// Redirect hops followed for one feed or search path.
const MAX_REDIRECTS: usize = 5;

/// Orchestrates discovery across domains: feeds first, site search as a
/// fallback, then time filtering, ordering, deduplication and truncation.
///
/// Generic over the page fetcher `F` and the robots fetcher `R` so tests can
/// run without real HTTP. In production `F` retries and throttles while `R`
/// only throttles, sharing the same throttle map.
pub struct ScrapeService<F, R>
where
    F: Fetcher,
    R: Fetcher,
{
    fetcher: F,
    robots: RobotsGate<R>,
    feeds: FeedExtractor,
    anchors: AnchorScanner,
    config: EngineConfig,
}

impl<F, R> ScrapeService<F, R>
where
    F: Fetcher,
    R: Fetcher,
{
    pub fn new(fetcher: F, robots_fetcher: R, config: EngineConfig) -> Self {
        let robots = RobotsGate::new(robots_fetcher, config.robots_agent(), config.robots_ttl);
        Self {
            fetcher,
            robots,
            feeds: FeedExtractor,
            anchors: AnchorScanner,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Whether robots.txt currently lets this engine request `path` on `domain`.
    pub async fn is_path_allowed(&self, domain: &Domain, path: &str) -> bool {
        self.robots.is_path_allowed(domain, path).await
    }

    /// Run a scrape, honoring the configured overall deadline if any.
    ///
    /// Never fails: domains that error out contribute nothing.
    pub async fn scrape(&self, request: &ScrapeRequest) -> Vec<NormalizedItem> {
        self.scrape_with_cancel(request, CancellationToken::new())
            .await
    }

    /// Like [`scrape`](Self::scrape), but stops early when `cancel` fires.
    /// Items from domains that already finished are still returned.
    pub async fn scrape_with_cancel(
        &self,
        request: &ScrapeRequest,
        cancel: CancellationToken,
    ) -> Vec<NormalizedItem> {
        let mut seen = HashSet::new();
        let domains: Vec<Domain> = request
            .domains
            .iter()
            .filter(|d| seen.insert(d.as_str()))
            .cloned()
            .collect();
        if domains.is_empty() {
            tracing::debug!("No domains to scrape");
            return Vec::new();
        }

        let limit = request.effective_limit();
        let cap = self.config.per_domain_cap.min(limit);
        tracing::info!(
            domains = domains.len(),
            topics = ?request.topic_filters,
            keywords = ?request.free_text_keywords,
            limit,
            "Starting scrape"
        );

        let token = cancel.child_token();
        let _deadline_guard = self.config.scrape_deadline.map(|deadline| {
            let timer = token.clone();
            tokio::spawn(async move {
                tokio::select! {
                    () = tokio::time::sleep(deadline) => {
                        tracing::warn!(deadline_secs = deadline.as_secs(), "Scrape deadline reached");
                        timer.cancel();
                    }
                    () = timer.cancelled() => {}
                }
            });
            token.clone().drop_guard()
        });

        let per_domain = run_bounded(domains, self.config.concurrency, &token, |_, domain| async move {
            match self.run_domain(&domain, request, cap).await {
                Ok(items) => {
                    tracing::debug!(domain = %domain, count = items.len(), "Domain finished");
                    items
                }
                Err(e) => {
                    tracing::warn!(domain = %domain, error = %e, "Domain pipeline failed");
                    Vec::new()
                }
            }
        })
        .await;

        let items = assemble(
            per_domain.into_iter().flatten().collect(),
            request.since_timestamp,
            limit,
        );
        tracing::info!(count = items.len(), "Scrape complete");
        items
    }

    /// Per-domain pipeline: feeds, then search fallback if feeds kept nothing.
    async fn run_domain(
        &self,
        domain: &Domain,
        request: &ScrapeRequest,
        cap: usize,
    ) -> Result<Vec<NormalizedItem>, AppError> {
        let mut acc = Accumulator::new(domain, request, cap);
        let mut reached_any = false;
        let mut last_error = None;

        let mut kept_from_feeds = 0;
        for path in &self.config.feed_paths {
            if acc.is_full() {
                break;
            }
            match self.fetch_allowed(domain, path).await {
                Some(Ok(body)) => {
                    reached_any = true;
                    kept_from_feeds += acc.offer_all(self.feeds.extract(&body));
                }
                Some(Err(e)) => last_error = Some(e),
                None => {}
            }
        }

        if !acc.is_full() && kept_from_feeds == 0 {
            let terms =
                derive_search_terms(&request.filter_query_clauses, &request.free_text_keywords);
            for path in search_paths(&terms) {
                if acc.is_full() {
                    break;
                }
                match self.fetch_allowed(domain, &path).await {
                    Some(Ok(body)) => {
                        reached_any = true;
                        acc.offer_all(self.anchors.extract(&body, domain));
                    }
                    Some(Err(e)) => last_error = Some(e),
                    None => {}
                }
            }
        }

        match last_error {
            Some(e) if !reached_any => Err(e),
            _ => Ok(acc.into_items()),
        }
    }

    /// `None` when robots.txt disallows the path; no request is made.
    ///
    /// Redirects are followed here, one hop at a time, and only within the
    /// domain. Every hop goes through the robots check again.
    async fn fetch_allowed(
        &self,
        domain: &Domain,
        path: &str,
    ) -> Option<Result<String, AppError>> {
        let mut path = path.to_string();
        for _ in 0..=MAX_REDIRECTS {
            if !self.robots.is_path_allowed(domain, &path).await {
                return None;
            }
            let url = format!("{}{}", domain.origin(), path);
            match self.fetcher.fetch(&url).await {
                Err(AppError::Redirect { location, .. }) => {
                    match same_domain_path(domain, &location) {
                        Some(next) => {
                            tracing::debug!(%url, %location, "Following redirect");
                            path = next;
                        }
                        None => {
                            tracing::debug!(%url, %location, "Redirect leaves the domain, not followed");
                            return Some(Err(AppError::HttpError(format!(
                                "Redirect from {url} to another host: {location}"
                            ))));
                        }
                    }
                }
                result => {
                    if let Err(e) = &result {
                        tracing::debug!(%url, error = %e, "Fetch failed");
                    }
                    return Some(result);
                }
            }
        }
        Some(Err(AppError::HttpError(format!(
            "Too many redirects for {}{path}",
            domain.origin()
        ))))
    }
}

/// Path plus query of `location` when it stays on `domain`.
fn same_domain_path(domain: &Domain, location: &str) -> Option<String> {
    let base = Url::parse(&format!("{}/", domain.origin())).ok()?;
    let target = base.join(location).ok()?;
    if !matches!(target.scheme(), "http" | "https") || target.host_str() != Some(domain.as_str()) {
        return None;
    }
    Some(match target.query() {
        Some(query) => format!("{}?{query}", target.path()),
        None => target.path().to_string(),
    })
}

/// Final assembly over all domains' items: time window, newest first,
/// deduplicate, truncate.
pub fn assemble(
    items: Vec<NormalizedItem>,
    since: DateTime<Utc>,
    limit: usize,
) -> Vec<NormalizedItem> {
    let mut items: Vec<NormalizedItem> = items
        .into_iter()
        .filter(|item| item.published_at >= since)
        .collect();
    items.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    let mut items = dedupe(items);
    items.truncate(limit);
    items
}

/// Topic and keyword predicate. Empty filters and keywords keep everything;
/// otherwise each non-empty condition must hold.
pub fn should_keep(item: &NormalizedItem, filters: &[TopicSlug], keywords: &[String]) -> bool {
    if !filters.is_empty() && !filters.iter().any(|f| item.categories.contains(f)) {
        return false;
    }
    if !keywords.is_empty() {
        let haystack = format!("{} {}", item.title, item.summary).to_lowercase();
        if !keywords
            .iter()
            .any(|k| haystack.contains(&k.to_lowercase()))
        {
            return false;
        }
    }
    true
}

/// One domain's growing result set, capped and free of repeated URLs.
struct Accumulator<'a> {
    domain: &'a Domain,
    base: Option<Url>,
    request: &'a ScrapeRequest,
    cap: usize,
    seen: HashSet<String>,
    items: Vec<NormalizedItem>,
}

impl<'a> Accumulator<'a> {
    fn new(domain: &'a Domain, request: &'a ScrapeRequest, cap: usize) -> Self {
        Self {
            domain,
            base: Url::parse(&format!("{}/", domain.origin())).ok(),
            request,
            cap,
            seen: HashSet::new(),
            items: Vec::new(),
        }
    }

    fn is_full(&self) -> bool {
        self.items.len() >= self.cap
    }

    /// Offer a batch newest first, so the cap keeps the most recent items
    /// whatever order the source lists them in. Returns how many were kept.
    fn offer_all(&mut self, candidates: Vec<RawCandidate>) -> usize {
        let fetched_at = Utc::now();
        let mut batch: Vec<NormalizedItem> = candidates
            .into_iter()
            .filter_map(|candidate| self.normalize(candidate, fetched_at))
            .collect();
        batch.sort_by(|a, b| b.published_at.cmp(&a.published_at));

        let mut kept = 0;
        for item in batch {
            if self.is_full() {
                break;
            }
            if self.offer(item) {
                kept += 1;
            }
        }
        kept
    }

    fn offer(&mut self, item: NormalizedItem) -> bool {
        if item.published_at < self.request.since_timestamp
            || !should_keep(
                &item,
                &self.request.topic_filters,
                &self.request.free_text_keywords,
            )
        {
            return false;
        }
        if !self.seen.insert(canonical_url(&item.url)) {
            return false;
        }
        self.items.push(item);
        true
    }

    fn normalize(&self, candidate: RawCandidate, fetched_at: DateTime<Utc>) -> Option<NormalizedItem> {
        let url = self.absolutize(&candidate.url)?;
        let published_at = candidate
            .published_at_raw
            .as_deref()
            .and_then(parse_published)
            .unwrap_or(fetched_at);
        let text = format!("{} {}", candidate.title, candidate.summary);
        let categories = classify(&text, Some(&url));
        let location_hints = self
            .request
            .location_context
            .as_ref()
            .and_then(|geo| location_hints(geo, &text));

        Some(NormalizedItem {
            url,
            title: candidate.title,
            summary: candidate.summary,
            image_url: candidate.image_url.and_then(|u| self.absolutize(&u)),
            published_at,
            source_domain: self.domain.to_string(),
            categories,
            location_hints,
        })
    }

    fn absolutize(&self, raw: &str) -> Option<String> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        match Url::parse(raw) {
            Ok(url) => Some(url.into()),
            Err(_) => self.base.as_ref()?.join(raw).ok().map(String::from),
        }
    }

    fn into_items(self) -> Vec<NormalizedItem> {
        self.items
    }
}

fn location_hints(geo: &GeoContext, text: &str) -> Option<Vec<String>> {
    let haystack = text.to_lowercase();
    let hints: Vec<String> = geo
        .place_names()
        .into_iter()
        .filter(|name| haystack.contains(&name.to_lowercase()))
        .map(str::to_string)
        .collect();
    (!hints.is_empty()).then_some(hints)
}
