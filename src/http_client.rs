//! Shared asynchronous HTTP connection pool for the scraper.
//!
//! `FetchClient` owns one lazily built `reqwest::Client`. `acquire()` builds
//! it on first use and hands out cheap clones afterwards; `close()` drops it so
//! the next `acquire()` starts a fresh pool. The client is passed explicitly to
//! the scraper rather than looked up globally.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::Client;
use tracing::debug;

use crate::config::ScraperConfig;
use crate::error::{EtlError, Result};

const ACCEPT_HTML: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,image/apng,*/*;q=0.8";

/// Source of page bodies for the scraper
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch `url` and return its body; non-success statuses are errors.
    async fn fetch_text(&self, url: &str) -> Result<String>;
}

/// Fixed headers and timeout applied to every request of the pool
#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// User-Agent header
    pub user_agent: String,
    /// Accept-Language header
    pub accept_language: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl From<&ScraperConfig> for ClientSettings {
    fn from(config: &ScraperConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            accept_language: config.accept_language.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

/// Reusable, closable HTTP connection pool
pub struct FetchClient {
    settings: ClientSettings,
    client: Mutex<Option<Client>>,
}

impl FetchClient {
    /// Create an unopened client; the pool is built on first `acquire()`.
    #[must_use]
    pub fn new(settings: ClientSettings) -> Self {
        Self {
            settings,
            client: Mutex::new(None),
        }
    }

    /// Return the live pool, building it if needed.
    pub fn acquire(&self) -> Result<Client> {
        let mut slot = self.client.lock();
        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }

        let client = self.build()?;
        debug!(timeout_secs = self.settings.timeout.as_secs(), "HTTP pool opened");
        *slot = Some(client.clone());
        Ok(client)
    }

    /// Drop the pool. A later `acquire()` rebuilds it.
    pub fn close(&self) {
        if self.client.lock().take().is_some() {
            debug!("HTTP pool closed");
        }
    }

    /// Whether a pool is currently open
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.client.lock().is_some()
    }

    fn build(&self) -> Result<Client> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_str(&self.settings.accept_language)
                .map_err(|e| EtlError::InvalidConfig(format!("accept_language: {e}")))?,
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&self.settings.user_agent)
                .map_err(|e| EtlError::InvalidConfig(format!("user_agent: {e}")))?,
        );

        Ok(Client::builder()
            .default_headers(headers)
            .timeout(self.settings.timeout)
            .gzip(true)
            .build()?)
    }
}

#[async_trait]
impl PageFetcher for FetchClient {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        let client = self.acquire()?;
        let response = client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }
}
