//! Fallback discovery through a site's own search pages.
//!
//! When a domain's feeds yield nothing, the engine builds search URLs from a
//! few derived terms and treats every headline-like anchor on the result
//! page as a candidate. Anchors carry no publish date.

use std::collections::HashSet;

use scraper::{Html, Selector};
use url::Url;

use crate::models::{Domain, RawCandidate};

/// Search path templates; `{q}` is replaced by the encoded query.
pub const SEARCH_TEMPLATES: &[&str] = &["/search?q={q}", "/?s={q}"];

/// Most terms folded into one search query.
pub const MAX_SEARCH_TERMS: usize = 3;

/// Anchors with shorter text are navigation, not headlines.
const MIN_TITLE_CHARS: usize = 15;

/// Up to [`MAX_SEARCH_TERMS`] lower-cased, de-duplicated terms.
///
/// Free-text keywords come first, then the phrases inside topic query
/// clauses with quotes, parentheses and `OR`/`AND` removed.
pub fn derive_search_terms(filter_query_clauses: &[String], keywords: &[String]) -> Vec<String> {
    let clause_terms = filter_query_clauses.iter().flat_map(|clause| {
        clause
            .replace(['(', ')', '"'], " ")
            .split(" OR ")
            .flat_map(|part| part.split(" AND "))
            .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
            .collect::<Vec<_>>()
    });

    let mut terms: Vec<String> = Vec::new();
    for term in keywords.iter().cloned().chain(clause_terms) {
        let term = term.trim().to_lowercase();
        if term.is_empty() || term == "or" || term == "and" || terms.contains(&term) {
            continue;
        }
        terms.push(term);
        if terms.len() == MAX_SEARCH_TERMS {
            break;
        }
    }
    terms
}

/// One path-and-query per template for `terms`; empty when there are no terms.
pub fn search_paths(terms: &[String]) -> Vec<String> {
    if terms.is_empty() {
        return Vec::new();
    }
    let query = urlencoding::encode(&terms.join(" ")).into_owned();
    SEARCH_TEMPLATES
        .iter()
        .map(|t| t.replace("{q}", &query))
        .collect()
}

/// Mines anchor elements on a search-result page.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnchorScanner;

impl AnchorScanner {
    /// Headline-like anchors pointing back into `domain`, resolved to
    /// absolute URLs, first occurrence per URL.
    pub fn extract(&self, html: &str, domain: &Domain) -> Vec<RawCandidate> {
        let Ok(base) = Url::parse(&format!("{}/", domain.origin())) else {
            return Vec::new();
        };
        let (Ok(anchor_selector), Ok(img_selector)) =
            (Selector::parse("a[href]"), Selector::parse("img[src]"))
        else {
            return Vec::new();
        };
        let document = Html::parse_document(html);
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();

        for anchor in document.select(&anchor_selector) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            let Some(url) = resolve(&base, href).filter(|u| same_site(u, domain)) else {
                continue;
            };

            let title = anchor
                .text()
                .collect::<String>()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");
            if title.chars().count() < MIN_TITLE_CHARS {
                continue;
            }
            if !seen.insert(url.to_string()) {
                continue;
            }

            let image_url = anchor
                .select(&img_selector)
                .next()
                .and_then(|img| img.value().attr("src"))
                .and_then(|src| resolve(&base, src))
                .map(String::from);

            candidates.push(RawCandidate {
                title,
                url: url.into(),
                summary: String::new(),
                published_at_raw: None,
                image_url,
            });
        }

        tracing::debug!(domain = %domain, count = candidates.len(), "Scanned anchors");
        candidates
    }
}

fn resolve(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let url = base.join(href).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}

fn same_site(url: &Url, domain: &Domain) -> bool {
    let Some(host) = url.host_str() else {
        return false;
    };
    let host = host.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    let own = domain.as_str().strip_prefix("www.").unwrap_or(domain.as_str());
    host == own || host.ends_with(&format!(".{own}"))
}
