//! Review ETL - customer review extraction and indexing
//!
//! A Rust library that scrapes customer reviews from a review site, masks
//! personal data, labels each review with a sentiment and bulk-upserts the
//! result into a search index.
//!
//! # Features
//!
//! - Paginated scraping with concurrent page fetches and per-page fault tolerance
//! - Text cleanup and PII anonymization
//! - Sentiment classification through a remote service or a local lexicon
//! - Idempotent bulk upsert with a strict index schema
//! - File-based staging between independently retryable stages

/// PII masking rules
pub mod anonymize;
/// Configuration management
pub mod config;
/// Error types
pub mod error;
/// Shared HTTP connection pool
pub mod http_client;
/// Bulk upsert loader and index client
pub mod index;
/// Logging setup and utilities
pub mod logging;
/// Metrics collection
pub mod metrics;
/// Data models and structures
pub mod models;
/// Text cleanup and value coercion
pub mod normalize;
/// Extract, transform and load stages
pub mod pipeline;
/// Index schema definition
pub mod schema;
/// Review scraper
pub mod scraper;
/// Sentiment classifiers
pub mod sentiment;
/// Staging files between stages
pub mod staging;
/// Raw reviews to index documents
pub mod transform;
/// Input validation and sanitization
pub mod validation;

// Re-export key components for easier access
pub use anonymize::Anonymizer;
pub use error::{EtlError, Result};
pub use http_client::{FetchClient, PageFetcher};
pub use index::{DocumentIndex, ElasticsearchIndex, LoadReport};
pub use models::{RawReview, ReviewDocument, Sentiment, SourceBatch};
pub use scraper::ReviewScraper;
pub use sentiment::{HttpSentimentClassifier, LexiconClassifier, SentimentClassifier};
pub use staging::StagingArea;
