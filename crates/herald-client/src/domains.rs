use std::path::PathBuf;

use herald_core::error::AppError;
use herald_core::models::Domain;
use herald_core::traits::DomainAllowlist;

/// Where the set of scrapeable domains comes from.
#[derive(Debug, Clone)]
enum Source {
    Inline(Vec<Domain>),
    /// Re-read on every load so edits apply without a restart.
    File(PathBuf),
}

/// Allowlist configured from the environment: either an inline
/// comma-separated list or a file with one domain per line.
#[derive(Debug, Clone)]
pub struct ConfiguredAllowlist {
    source: Source,
}

impl ConfiguredAllowlist {
    /// `HERALD_DOMAINS_FILE` wins over `HERALD_DOMAINS`. With neither set the
    /// allowlist is empty and every scrape returns nothing.
    pub fn from_env() -> Self {
        if let Ok(path) = std::env::var("HERALD_DOMAINS_FILE") {
            if !path.trim().is_empty() {
                return Self::from_file(path.trim());
            }
        }
        Self::inline(&std::env::var("HERALD_DOMAINS").unwrap_or_default())
    }

    pub fn inline(list: &str) -> Self {
        Self {
            source: Source::Inline(parse_list(list.split(','))),
        }
    }

    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self {
            source: Source::File(path.into()),
        }
    }
}

impl DomainAllowlist for ConfiguredAllowlist {
    async fn load_allowed_domains(&self) -> Result<Vec<Domain>, AppError> {
        match &self.source {
            Source::Inline(domains) => Ok(domains.clone()),
            Source::File(path) => {
                let content = tokio::fs::read_to_string(path).await.map_err(|e| {
                    AppError::ConfigError(format!(
                        "Cannot read domain list {}: {e}",
                        path.display()
                    ))
                })?;
                Ok(parse_list(content.lines()))
            }
        }
    }
}

/// Normalize entries, skipping blanks, `#` comments, invalid names and repeats.
fn parse_list<'a>(entries: impl Iterator<Item = &'a str>) -> Vec<Domain> {
    let mut domains: Vec<Domain> = Vec::new();
    for entry in entries {
        let entry = entry.split('#').next().unwrap_or_default().trim();
        if entry.is_empty() {
            continue;
        }
        match Domain::parse(entry) {
            Ok(domain) if !domains.contains(&domain) => domains.push(domain),
            Ok(_) => {}
            Err(e) => tracing::warn!(entry, error = %e, "Skipping allowlist entry"),
        }
    }
    domains
}
