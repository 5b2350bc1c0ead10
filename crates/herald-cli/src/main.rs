use anyhow::{Context, Result, bail};
use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use herald_client::{ConfiguredAllowlist, build_engine};
use herald_core::config::EngineConfig;
use herald_core::models::{Domain, ScrapeRequest};
use herald_core::topics::{TOPICS, is_known_topic};
use herald_core::traits::{DomainAllowlist, Geocoder, LabelGeocoder};

#[derive(Parser)]
#[command(name = "herald", version, about = "Local news discovery and aggregation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover recent articles and print them as JSON
    Scrape {
        /// Domain to scrape; repeatable. Defaults to HERALD_DOMAINS / HERALD_DOMAINS_FILE
        #[arg(short, long = "domain")]
        domains: Vec<String>,

        /// Topic slug to filter by; repeatable (see `herald topics`)
        #[arg(short, long = "topic")]
        topics: Vec<String>,

        /// Free-text keyword that must appear in title or summary; repeatable
        #[arg(short, long = "keyword")]
        keywords: Vec<String>,

        /// Place name used to tag matching articles
        #[arg(long)]
        location: Option<String>,

        /// Only articles published within this many hours
        #[arg(long, env = "HERALD_SINCE_HOURS", default_value_t = 48)]
        since_hours: i64,

        /// Maximum number of articles (clamped to 1..=200)
        #[arg(short, long, default_value_t = 50)]
        limit: i64,

        /// Allow domains that resolve to private addresses
        #[arg(long, default_value_t = false)]
        allow_private: bool,
    },

    /// List the topic vocabulary
    Topics,

    /// Check whether robots.txt lets Herald fetch a path
    Robots {
        #[arg(short, long)]
        domain: String,

        #[arg(short, long, default_value = "/feed")]
        path: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("herald=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scrape {
            domains,
            topics,
            keywords,
            location,
            since_hours,
            limit,
            allow_private,
        } => {
            cmd_scrape(
                domains,
                topics,
                keywords,
                location,
                since_hours,
                limit,
                allow_private,
            )
            .await?;
        }
        Commands::Topics => cmd_topics(),
        Commands::Robots { domain, path } => cmd_robots(&domain, &path).await?,
    }

    Ok(())
}

async fn cmd_scrape(
    domains: Vec<String>,
    topics: Vec<String>,
    keywords: Vec<String>,
    location: Option<String>,
    since_hours: i64,
    limit: i64,
    allow_private: bool,
) -> Result<()> {
    if let Some(unknown) = topics.iter().find(|t| !is_known_topic(&t.trim().to_lowercase())) {
        bail!("Unknown topic '{unknown}'. Run `herald topics` for the list.");
    }
    let Some(since) = lookback(since_hours) else {
        bail!("--since-hours {since_hours} is out of range");
    };

    let domains = if domains.is_empty() {
        ConfiguredAllowlist::from_env()
            .load_allowed_domains()
            .await
            .map_err(|e| anyhow::anyhow!(e))?
    } else {
        domains
            .iter()
            .map(|d| Domain::parse(d))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!(e))?
    };
    if domains.is_empty() {
        tracing::warn!("No domains given and none configured; nothing to scrape");
    }

    let mut request = ScrapeRequest::new(domains, since)
        .with_topics(topics)
        .with_keywords(keywords)
        .with_limit(limit);
    if let Some(query) = location {
        let geo = LabelGeocoder
            .geocode(&query)
            .await
            .map_err(|e| anyhow::anyhow!(e))?
            .with_context(|| format!("Could not resolve location '{query}'"))?;
        request = request.with_location(geo);
    }

    let config = EngineConfig::from_env().map_err(|e| anyhow::anyhow!(e))?;
    let engine = build_engine(config, allow_private).map_err(|e| anyhow::anyhow!(e))?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted; returning what has been collected");
            on_interrupt.cancel();
        }
    });

    let items = engine.scrape_with_cancel(&request, cancel).await;
    tracing::info!(count = items.len(), "Done");

    println!("{}", serde_json::to_string_pretty(&items)?);
    Ok(())
}

/// `now - hours`, or `None` when `hours` is negative or too large.
fn lookback(hours: i64) -> Option<DateTime<Utc>> {
    if hours < 0 {
        return None;
    }
    Utc::now().checked_sub_signed(Duration::try_hours(hours)?)
}

fn cmd_topics() {
    for topic in TOPICS {
        println!("{:<16} {}", topic.slug, topic.label);
    }
}

async fn cmd_robots(domain: &str, path: &str) -> Result<()> {
    let domain = Domain::parse(domain).map_err(|e| anyhow::anyhow!(e))?;
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };

    let config = EngineConfig::from_env().map_err(|e| anyhow::anyhow!(e))?;
    let agent = config.robots_agent().to_string();
    let engine = build_engine(config, false).map_err(|e| anyhow::anyhow!(e))?;

    let verdict = if engine.is_path_allowed(&domain, &path).await {
        "allowed"
    } else {
        "disallowed"
    };
    println!("{}{path}: {verdict} for {agent}", domain.origin());
    Ok(())
}
