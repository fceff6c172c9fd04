//! Error types for the review ETL pipeline.
//!
//! Source- and page-scoped failures are absorbed by the scraper, classifier
//! failures degrade to the sentinel sentiment, and stage-level emptiness or
//! index connectivity errors propagate to the caller so the scheduler can
//! retry or alert.

use thiserror::Error;

/// Errors that can occur while extracting, transforming or loading reviews.
#[derive(Error, Debug)]
pub enum EtlError {
    /// The landing page of a source did not expose its build token
    #[error("Discovery failed for {source_url}: {reason}")]
    Discovery {
        /// Landing page that was inspected
        source_url: String,
        /// What was missing or malformed
        reason: String,
    },

    /// A single page of reviews could not be fetched or parsed
    #[error("Page {page} fetch failed: {reason}")]
    PageFetch {
        /// One-based page number
        page: u32,
        /// Underlying cause
        reason: String,
    },

    /// The extract stage produced no source or no review at all
    #[error("Extract produced no data: {0}")]
    EmptyExtract(String),

    /// The transform stage produced no document
    #[error("Transform produced no document")]
    EmptyTransform,

    /// A stage found no usable staged input
    #[error("No input to process: {0}")]
    EmptyLoadInput(String),

    /// The document index is unreachable
    #[error("Document index unreachable: {0}")]
    Connection(String),

    /// The sentiment classifier failed for one review
    #[error("Classifier error: {0}")]
    Classifier(String),

    /// Some documents of a bulk submission were rejected
    #[error("{failed} of {submitted} documents rejected by the index")]
    BulkPartial {
        /// Number of rejected documents
        failed: usize,
        /// Number of submitted documents
        submitted: usize,
    },

    /// A document carries fields the strict schema does not declare
    #[error("Schema violation: {0}")]
    SchemaViolation(String),

    /// Staging area errors other than plain I/O
    #[error("Staging error: {0}")]
    Staging(String),

    /// Invalid configuration or input
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Transport-level HTTP errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience type alias for Result with `EtlError`
pub type Result<T> = std::result::Result<T, EtlError>;

impl From<anyhow::Error> for EtlError {
    fn from(err: anyhow::Error) -> Self {
        EtlError::InvalidConfig(err.to_string())
    }
}

impl EtlError {
    /// Whether the error must fail the whole stage.
    #[must_use]
    pub const fn is_stage_fatal(&self) -> bool {
        !matches!(
            self,
            Self::Discovery { .. } | Self::PageFetch { .. } | Self::Classifier(_) | Self::BulkPartial { .. }
        )
    }
}
