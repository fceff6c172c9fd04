//! Paginated review extraction from the review site's data API.
//!
//! Each source goes through discovery (the `buildId` embedded in the landing
//! page), a first page that tells how many pages exist, and a concurrent
//! fan-out over the remaining pages. Failures are scoped: a bad page only
//! loses its own reviews, a bad source yields an empty batch, and the run
//! carries on with the next source.

use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::config::ScraperConfig;
use crate::error::{EtlError, Result};
use crate::http_client::PageFetcher;
use crate::metrics::PipelineMetrics;
use crate::models::{null_as_default, EnterpriseInfo, RatingCounts, RawReview, SourceBatch};

#[derive(Debug, Deserialize)]
struct PageEnvelope {
    #[serde(rename = "pageProps")]
    page_props: PageProps,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PageProps {
    #[serde(deserialize_with = "null_as_default")]
    reviews: Vec<Value>,
    filters: Filters,
    #[serde(rename = "businessUnit")]
    business_unit: BusinessUnit,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Filters {
    pagination: Pagination,
    #[serde(rename = "reviewStatistics")]
    review_statistics: ReviewStatistics,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Pagination {
    #[serde(rename = "totalPages")]
    total_pages: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ReviewStatistics {
    ratings: RatingCounts,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BusinessUnit {
    #[serde(rename = "trustScore")]
    trust_score: Option<Value>,
    #[serde(rename = "numberOfReviews")]
    number_of_reviews: Option<Value>,
    #[serde(rename = "displayName")]
    display_name: Option<String>,
}

/// Decode the reviews of one page, dropping the ones that do not parse
fn decode_reviews(slug: &str, page: u32, values: Vec<Value>) -> Vec<RawReview> {
    values
        .into_iter()
        .enumerate()
        .filter_map(|(position, value)| match serde_json::from_value::<RawReview>(value) {
            Ok(review) => Some(review),
            Err(e) => {
                warn!(source = slug, page, position, error = %e, "Malformed review dropped");
                None
            }
        })
        .collect()
}

/// Review scraper for the configured sources
pub struct ReviewScraper {
    fetcher: Arc<dyn PageFetcher>,
    base_url: String,
    language: String,
    sources: Vec<String>,
    next_data_regex: Regex,
    metrics: PipelineMetrics,
}

impl ReviewScraper {
    /// Create a scraper fetching through `fetcher`
    pub fn new(fetcher: Arc<dyn PageFetcher>, config: &ScraperConfig) -> Result<Self> {
        let next_data_regex =
            Regex::new(r#"(?s)<script[^>]*\bid=["']__NEXT_DATA__["'][^>]*>(.*?)</script>"#)
                .map_err(|e| EtlError::InvalidConfig(format!("page metadata pattern: {e}")))?;

        Ok(Self {
            fetcher,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            language: config.language.clone(),
            sources: config.sources.clone(),
            next_data_regex,
            metrics: PipelineMetrics::default(),
        })
    }

    /// Landing page of a source
    #[must_use]
    pub fn landing_url(&self, slug: &str) -> String {
        format!("{}/review/{slug}", self.base_url)
    }

    /// Extract the `buildId` from a landing page body
    pub fn extract_build_id(&self, source_url: &str, html: &str) -> Result<String> {
        let discovery = |reason: String| EtlError::Discovery {
            source_url: source_url.to_string(),
            reason,
        };

        let raw = self
            .next_data_regex
            .captures(html)
            .and_then(|caps| caps.get(1))
            .ok_or_else(|| discovery("__NEXT_DATA__ not found".to_string()))?;

        let data: Value = serde_json::from_str(raw.as_str())
            .map_err(|e| discovery(format!("invalid __NEXT_DATA__ JSON: {e}")))?;

        data.get("buildId")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .ok_or_else(|| discovery("buildId missing".to_string()))
    }

    /// Resolve the data-API URL of a source's first page
    pub async fn discover_api_url(&self, slug: &str) -> Result<String> {
        let source_url = self.landing_url(slug);
        let html = self
            .fetcher
            .fetch_text(&source_url)
            .await
            .map_err(|e| EtlError::Discovery {
                source_url: source_url.clone(),
                reason: e.to_string(),
            })?;
        let build_id = self.extract_build_id(&source_url, &html)?;

        Ok(format!(
            "{}/_next/data/{build_id}/review/{slug}.json?sort=recency&businessUnit={slug}&languages={}",
            self.base_url, self.language
        ))
    }

    async fn fetch_page(&self, api_url: &str, page: u32) -> Result<PageProps> {
        let url = if page <= 1 {
            api_url.to_string()
        } else {
            format!("{api_url}&page={page}")
        };

        let body = self
            .fetcher
            .fetch_text(&url)
            .await
            .map_err(|e| EtlError::PageFetch {
                page,
                reason: e.to_string(),
            })?;

        serde_json::from_str::<PageEnvelope>(&body)
            .map(|envelope| envelope.page_props)
            .map_err(|e| EtlError::PageFetch {
                page,
                reason: format!("invalid page JSON: {e}"),
            })
    }

    /// Scrape up to `max_pages` pages of reviews for one source
    pub async fn scrape(&self, slug: &str, max_pages: u32) -> Result<Vec<RawReview>> {
        let api_url = self.discover_api_url(slug).await?;
        self.scrape_pages(slug, &api_url, max_pages).await
    }

    async fn scrape_pages(&self, slug: &str, api_url: &str, max_pages: u32) -> Result<Vec<RawReview>> {
        let first = self.fetch_page(api_url, 1).await?;
        self.metrics.record_page_fetched(slug);

        let total_pages = first.filters.pagination.total_pages.max(1).min(max_pages.max(1));
        info!(source = slug, total_pages, "Pages to scrape");

        let mut reviews = decode_reviews(slug, 1, first.reviews);

        // Reviews are appended in completion order, not page order
        let mut pending: FuturesUnordered<_> = (2..=total_pages)
            .map(|page| async move { (page, self.fetch_page(api_url, page).await) })
            .collect();

        while let Some((page, result)) = pending.next().await {
            match result {
                Ok(props) => {
                    self.metrics.record_page_fetched(slug);
                    let page_reviews = decode_reviews(slug, page, props.reviews);
                    info!(source = slug, page, count = page_reviews.len(), "Page scraped");
                    reviews.extend(page_reviews);
                }
                Err(e) => {
                    self.metrics.record_page_failure(slug);
                    error!(source = slug, page, error = %e, "Page dropped");
                }
            }
        }

        info!(source = slug, count = reviews.len(), "Extraction finished");
        Ok(reviews)
    }

    /// Fetch enterprise-level rating metadata for one source
    pub async fn fetch_enterprise_info(&self, slug: &str) -> Result<EnterpriseInfo> {
        let api_url = self.discover_api_url(slug).await?;
        self.enterprise_info_at(slug, &api_url).await
    }

    async fn enterprise_info_at(&self, slug: &str, api_url: &str) -> Result<EnterpriseInfo> {
        let props = self.fetch_page(api_url, 1).await?;
        let unit = props.business_unit;

        Ok(EnterpriseInfo {
            enterprise_rating: unit.trust_score,
            enterprise_review_number: unit.number_of_reviews,
            ratings: props.filters.review_statistics.ratings,
            name: unit
                .display_name
                .filter(|name| !name.trim().is_empty())
                .or_else(|| Some(slug.to_string())),
        })
    }

    /// Reviews and metadata for one source; an empty batch on any failure
    pub async fn fetch_source(&self, slug: &str, max_pages: u32) -> SourceBatch {
        let outcome = async {
            let api_url = self.discover_api_url(slug).await?;
            let reviews = self.scrape_pages(slug, &api_url, max_pages).await?;
            let enterprise = self.enterprise_info_at(slug, &api_url).await?;
            Ok::<_, EtlError>((reviews, enterprise))
        }
        .await;

        match outcome {
            Ok((reviews, enterprise)) => {
                self.metrics.record_reviews_extracted(slug, reviews.len());
                SourceBatch {
                    enterprise_url: slug.to_string(),
                    enterprise,
                    reviews,
                }
            }
            Err(e) => {
                error!(source = slug, error = %e, "Source extraction failed");
                SourceBatch::empty(slug)
            }
        }
    }

    /// Scrape every configured source sequentially, in configured order
    pub async fn fetch_all_sources(&self, max_pages: u32) -> Vec<SourceBatch> {
        if self.sources.is_empty() {
            warn!("No source configured");
            return Vec::new();
        }

        let mut batches = Vec::with_capacity(self.sources.len());
        for slug in &self.sources {
            if slug.trim().is_empty() {
                warn!("Skipping source without slug");
                continue;
            }
            batches.push(self.fetch_source(slug, max_pages).await);
        }
        batches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    struct NoFetch;

    #[async_trait::async_trait]
    impl PageFetcher for NoFetch {
        async fn fetch_text(&self, url: &str) -> Result<String> {
            Err(EtlError::Staging(format!("unexpected fetch of {url}")))
        }
    }

    fn scraper() -> ReviewScraper {
        ReviewScraper::new(Arc::new(NoFetch), &AppConfig::default().scraper)
            .expect("Failed to build scraper")
    }

    #[test]
    fn test_extract_build_id() {
        let html = r#"<html><script id="__NEXT_DATA__" type="application/json">{"buildId":"abc123","page":"/review"}</script></html>"#;
        assert_eq!(scraper().extract_build_id("u", html).unwrap(), "abc123");
    }

    #[test]
    fn test_missing_build_id_is_discovery_error() {
        let s = scraper();
        assert!(matches!(
            s.extract_build_id("u", "<html></html>"),
            Err(EtlError::Discovery { .. })
        ));
        let html = r#"<script id="__NEXT_DATA__">{"page":"/"}</script>"#;
        assert!(matches!(s.extract_build_id("u", html), Err(EtlError::Discovery { .. })));
    }

    #[test]
    fn test_landing_url() {
        assert_eq!(
            scraper().landing_url("www.example.com"),
            "https://www.trustpilot.com/review/www.example.com"
        );
    }
}
