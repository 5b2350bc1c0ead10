//! robots.txt interpretation and per-domain caching.
//!
//! Rules are fetched from `https://{domain}/robots.txt` on first use and
//! cached for a TTL. A missing or unreachable robots file allows everything.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;

use crate::error::AppError;
use crate::models::Domain;
use crate::traits::Fetcher;

/// Allow/disallow path prefixes that apply to this engine on one origin.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RobotsRules {
    pub allow: Vec<String>,
    pub disallow: Vec<String>,
}

#[derive(Default)]
struct Group {
    agents: Vec<String>,
    rules: RobotsRules,
    // Once a rule line is seen, the next User-agent starts a new group.
    has_rules: bool,
}

impl RobotsRules {
    /// Parse a robots.txt body, keeping the group for `agent` if present,
    /// otherwise the `*` group.
    pub fn parse(content: &str, agent: &str) -> Self {
        let agent = agent.to_lowercase();
        let mut groups: Vec<Group> = Vec::new();
        let mut current = Group::default();

        for line in content.lines() {
            let line = line.split('#').next().unwrap_or_default().trim();
            let Some((directive, value)) = line.split_once(':') else {
                continue;
            };
            let directive = directive.trim().to_lowercase();
            let value = value.trim();

            match directive.as_str() {
                "user-agent" => {
                    if current.has_rules {
                        groups.push(std::mem::take(&mut current));
                    }
                    current.agents.push(value.to_lowercase());
                }
                "allow" | "disallow" => {
                    current.has_rules = true;
                    let Some(prefix) = normalize_prefix(value) else {
                        continue;
                    };
                    if directive == "allow" {
                        current.rules.allow.push(prefix);
                    } else {
                        current.rules.disallow.push(prefix);
                    }
                }
                _ => {}
            }
        }
        if !current.agents.is_empty() {
            groups.push(current);
        }

        let named = groups
            .iter()
            .position(|g| {
                g.agents
                    .iter()
                    .any(|a| !a.is_empty() && a != "*" && agent.contains(a.as_str()))
            });
        let wildcard = groups.iter().position(|g| g.agents.iter().any(|a| a == "*"));

        named
            .or(wildcard)
            .map(|i| groups.swap_remove(i).rules)
            .unwrap_or_default()
    }

    /// Longest matching prefix wins; on equal length `Allow` wins.
    pub fn is_allowed(&self, path: &str) -> bool {
        let longest = |prefixes: &[String]| {
            prefixes
                .iter()
                .filter(|p| path.starts_with(p.as_str()))
                .map(String::len)
                .max()
        };

        match (longest(&self.allow), longest(&self.disallow)) {
            (_, None) => true,
            (None, Some(_)) => false,
            (Some(allow), Some(disallow)) => allow >= disallow,
        }
    }
}

/// Strip trailing `$` and `*` so a pattern becomes a plain prefix.
/// An empty value (`Disallow:`) means no restriction and yields `None`.
fn normalize_prefix(value: &str) -> Option<String> {
    let prefix = value.trim_end_matches(['$', '*']);
    if prefix.is_empty() {
        None
    } else {
        Some(prefix.to_string())
    }
}

/// Redirect hops followed when fetching robots.txt.
const MAX_ROBOTS_REDIRECTS: usize = 5;

/// Fetches, parses and caches robots rules per domain.
#[derive(Clone)]
pub struct RobotsGate<F> {
    fetcher: F,
    agent: String,
    cache: Cache<String, Arc<RobotsRules>>,
}

impl<F: Fetcher> RobotsGate<F> {
    /// `agent` is the product token matched against `User-agent` lines.
    pub fn new(fetcher: F, agent: impl Into<String>, ttl: Duration) -> Self {
        Self {
            fetcher,
            agent: agent.into(),
            cache: Cache::builder().time_to_live(ttl).build(),
        }
    }

    /// Whether `path` (path plus optional query) may be requested on `domain`.
    pub async fn is_path_allowed(&self, domain: &Domain, path: &str) -> bool {
        let rules = self.rules_for(domain).await;
        let allowed = rules.is_allowed(path);
        if !allowed {
            tracing::debug!(domain = %domain, %path, "Disallowed by robots.txt");
        }
        allowed
    }

    async fn rules_for(&self, domain: &Domain) -> Arc<RobotsRules> {
        self.cache
            .get_with(domain.as_str().to_string(), async {
                match self.fetch_robots(domain).await {
                    Ok(body) => Arc::new(RobotsRules::parse(&body, &self.agent)),
                    Err(e) => {
                        tracing::debug!(domain = %domain, error = %e, "No usable robots.txt, allowing all");
                        Arc::new(RobotsRules::default())
                    }
                }
            })
            .await
    }

    /// The robots.txt body, following up to [`MAX_ROBOTS_REDIRECTS`] hops.
    async fn fetch_robots(&self, domain: &Domain) -> Result<String, AppError> {
        let mut url = format!("{}/robots.txt", domain.origin());
        let mut hops = 0;
        loop {
            match self.fetcher.fetch(&url).await {
                Err(AppError::Redirect { location, .. }) if hops < MAX_ROBOTS_REDIRECTS => {
                    hops += 1;
                    url = location;
                }
                result => return result,
            }
        }
    }
}
