use herald_core::config::EngineConfig;
use herald_core::error::AppError;
use herald_core::traits::Fetcher;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, LOCATION};
use reqwest::{Client, redirect};

use crate::guard::check_public_url;

/// Feeds, JSON, HTML pages and robots files in one Accept header.
const ACCEPT_ANY_DOCUMENT: &str = "application/rss+xml, application/atom+xml, application/json, \
     application/xml;q=0.9, text/html;q=0.9, */*;q=0.8";

/// HTTP fetcher using reqwest.
///
/// Sends the configured User-Agent, enforces the per-request timeout and
/// refuses hosts that resolve to private or reserved addresses unless
/// [`allow_private_hosts`](Self::allow_private_hosts) was called.
///
/// Redirects are never followed. A 3xx comes back as
/// [`AppError::Redirect`] so the caller can vet each hop.
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: Client,
    timeout_secs: u64,
    guard_private: bool,
}

impl ReqwestFetcher {
    pub fn from_config(config: &EngineConfig) -> Result<Self, AppError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_ANY_DOCUMENT));

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .redirect(redirect::Policy::none())
            .timeout(config.fetch_timeout)
            .build()
            .map_err(|e| AppError::HttpError(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            timeout_secs: config.fetch_timeout.as_secs(),
            guard_private: true,
        })
    }

    /// Allow requests to private addresses, e.g. a newsroom's intranet
    /// mirror reached from the CLI.
    pub fn allow_private_hosts(mut self) -> Self {
        self.guard_private = false;
        self
    }
}

impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        if self.guard_private {
            check_public_url(url).await?;
        }

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout(self.timeout_secs)
            } else if e.is_connect() {
                AppError::NetworkError(format!("Connection failed for {url}: {e}"))
            } else {
                AppError::HttpError(e.to_string())
            }
        })?;

        let status = response.status();
        if status.is_redirection() {
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| response.url().join(value).ok());
            if let Some(location) = location {
                return Err(AppError::Redirect {
                    status: status.as_u16(),
                    url: url.to_string(),
                    location: location.into(),
                });
            }
        }
        if !status.is_success() {
            return Err(AppError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        response.text().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout(self.timeout_secs)
            } else {
                AppError::HttpError(format!("Failed to read body of {url}: {e}"))
            }
        })
    }
}
