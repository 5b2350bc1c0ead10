//! Exact and near-duplicate removal.
//!
//! Stage one drops repeats of a canonical URL. Stage two drops any item
//! whose title is too similar (term-frequency cosine) to an item already
//! accepted. Input order decides the survivor, so callers sort first.

use std::collections::{HashMap, HashSet};

use url::Url;

use crate::models::NormalizedItem;

/// Titles strictly more similar than this are duplicates.
pub const SIMILARITY_THRESHOLD: f64 = 0.8;

/// Drop the fragment and a single trailing slash from the path.
pub fn canonical_url(raw: &str) -> String {
    match Url::parse(raw.trim()) {
        Ok(mut url) => {
            url.set_fragment(None);
            let path = url.path().to_string();
            if path.len() > 1 {
                if let Some(stripped) = path.strip_suffix('/') {
                    url.set_path(stripped);
                }
            }
            url.to_string()
        }
        Err(_) => {
            let without_fragment = raw.trim().split('#').next().unwrap_or_default();
            without_fragment
                .strip_suffix('/')
                .unwrap_or(without_fragment)
                .to_string()
        }
    }
}

type TermVector = HashMap<String, f64>;

fn term_vector(title: &str) -> TermVector {
    let cleaned: String = title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    let mut tf = TermVector::new();
    for token in cleaned.split_whitespace() {
        *tf.entry(token.to_string()).or_insert(0.0) += 1.0;
    }
    tf
}

fn cosine(a: &TermVector, b: &TermVector) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let dot: f64 = a
        .iter()
        .filter_map(|(term, x)| b.get(term).map(|y| x * y))
        .sum();
    let norm = |v: &TermVector| v.values().map(|x| x * x).sum::<f64>().sqrt();
    dot / (norm(a) * norm(b))
}

/// Cosine similarity of two titles' term-frequency vectors, in `[0, 1]`.
pub fn title_similarity(a: &str, b: &str) -> f64 {
    cosine(&term_vector(a), &term_vector(b))
}

/// Remove exact (canonical URL) and near (title similarity) duplicates,
/// keeping the first of each cluster and preserving input order.
pub fn dedupe(items: Vec<NormalizedItem>) -> Vec<NormalizedItem> {
    let mut seen_urls = HashSet::new();
    let mut accepted: Vec<NormalizedItem> = Vec::with_capacity(items.len());
    let mut accepted_vectors: Vec<TermVector> = Vec::with_capacity(items.len());

    for item in items {
        if !seen_urls.insert(canonical_url(&item.url)) {
            continue;
        }

        let vector = term_vector(&item.title);
        let is_near_duplicate = accepted_vectors
            .iter()
            .any(|other| cosine(&vector, other) > SIMILARITY_THRESHOLD);
        if is_near_duplicate {
            tracing::debug!(title = %item.title, "Dropping near-duplicate title");
            continue;
        }

        accepted_vectors.push(vector);
        accepted.push(item);
    }

    accepted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::make_item;

    #[test]
    fn canonicalization() {
        assert_eq!(
            canonical_url("https://a.com/story/#top"),
            "https://a.com/story"
        );
        assert_eq!(canonical_url("https://a.com/story"), "https://a.com/story");
        assert_eq!(
            canonical_url("https://a.com/story/?id=1"),
            "https://a.com/story?id=1"
        );
        assert_eq!(canonical_url("https://a.com"), canonical_url("https://a.com/"));
        assert_eq!(canonical_url("not a url/#x"), "not a url");
    }

    #[test]
    fn similarity_basics() {
        assert_eq!(title_similarity("", "anything"), 0.0);
        assert!((title_similarity("Storm hits", "storm HITS!") - 1.0).abs() < 1e-9);
        assert_eq!(title_similarity("alpha beta", "gamma delta"), 0.0);
    }

    #[test]
    fn exactly_threshold_is_kept() {
        // {alpha:1} vs {alpha:4, beta:3}: 4 / (1 * 5) = 0.8
        let a = "alpha";
        let b = "alpha alpha alpha alpha beta beta beta";
        assert_eq!(title_similarity(a, b), 0.8);

        let items = vec![
            make_item("https://a.com/1", a, "2025-06-10T12:00:00Z"),
            make_item("https://a.com/2", b, "2025-06-10T11:00:00Z"),
        ];
        assert_eq!(dedupe(items).len(), 2);
    }

    #[test]
    fn above_threshold_is_dropped() {
        let a = "Storm causes power outage in city";
        let b = "Storm causes power outage";
        assert!(title_similarity(a, b) > 0.81);

        let items = vec![
            make_item("https://a.com/newer", a, "2025-06-10T12:00:00Z"),
            make_item("https://b.com/older", b, "2025-06-10T09:00:00Z"),
        ];
        let kept = dedupe(items);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].url, "https://a.com/newer");
    }

    #[test]
    fn exact_url_duplicates_keep_first() {
        let items = vec![
            make_item("https://a.com/x/", "First headline", "2025-06-10T12:00:00Z"),
            make_item("https://a.com/x#comments", "Totally different words", "2025-06-10T11:00:00Z"),
            make_item("https://a.com/y", "Unrelated other story", "2025-06-10T10:00:00Z"),
        ];
        let kept = dedupe(items);
        let urls: Vec<_> = kept.iter().map(|i| i.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a.com/x/", "https://a.com/y"]);
    }

    #[test]
    fn dedupe_is_idempotent() {
        let items = vec![
            make_item("https://a.com/1", "Flood closes river road", "2025-06-10T12:00:00Z"),
            make_item("https://a.com/1/", "Flood closes river road", "2025-06-10T11:00:00Z"),
            make_item("https://a.com/2", "Flood closes the river road", "2025-06-10T10:00:00Z"),
            make_item("https://a.com/3", "Quake felt across county", "2025-06-10T09:00:00Z"),
        ];
        let once = dedupe(items);
        let twice = dedupe(once.clone());
        assert_eq!(once, twice);
        assert_eq!(once.len(), 2);
    }
}
