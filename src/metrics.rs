//! Pipeline counters and stage timings.
//!
//! Emitted through the `metrics` facade; without an installed recorder every
//! call is a no-op, so the library never installs one itself.

use metrics::{counter, histogram};
use std::time::Duration;

/// Metric names used by the pipeline
#[derive(Debug, Clone, Copy)]
pub struct PipelineMetrics {
    /// Review pages fetched, by source
    pub pages_fetched_total: &'static str,
    /// Review pages dropped, by source
    pub page_failures_total: &'static str,
    /// Reviews collected, by source
    pub reviews_extracted_total: &'static str,
    /// Documents produced by the transform stage
    pub documents_transformed_total: &'static str,
    /// Classifier calls that fell back to the sentinel
    pub classifier_failures_total: &'static str,
    /// Documents inserted or updated
    pub documents_upserted_total: &'static str,
    /// Documents rejected during a load
    pub documents_failed_total: &'static str,
    /// Stage wall-clock time, by stage
    pub stage_duration: &'static str,
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self {
            pages_fetched_total: "review_etl_pages_fetched_total",
            page_failures_total: "review_etl_page_failures_total",
            reviews_extracted_total: "review_etl_reviews_extracted_total",
            documents_transformed_total: "review_etl_documents_transformed_total",
            classifier_failures_total: "review_etl_classifier_failures_total",
            documents_upserted_total: "review_etl_documents_upserted_total",
            documents_failed_total: "review_etl_documents_failed_total",
            stage_duration: "review_etl_stage_duration_seconds",
        }
    }
}

impl PipelineMetrics {
    /// Record a successfully fetched review page
    pub fn record_page_fetched(&self, source: &str) {
        counter!(self.pages_fetched_total, "source" => source.to_string()).increment(1);
    }

    /// Record a page that failed and was dropped
    pub fn record_page_failure(&self, source: &str) {
        counter!(self.page_failures_total, "source" => source.to_string()).increment(1);
    }

    /// Record reviews collected for one source
    pub fn record_reviews_extracted(&self, source: &str, count: usize) {
        counter!(self.reviews_extracted_total, "source" => source.to_string())
            .increment(count as u64);
    }

    /// Record documents produced by the transform stage
    pub fn record_documents_transformed(&self, count: usize) {
        counter!(self.documents_transformed_total).increment(count as u64);
    }

    /// Record a classifier call that fell back to the sentinel label
    pub fn record_classifier_failure(&self) {
        counter!(self.classifier_failures_total).increment(1);
    }

    /// Record the outcome of a bulk load
    pub fn record_load(&self, succeeded: usize, failed: usize) {
        counter!(self.documents_upserted_total).increment(succeeded as u64);
        counter!(self.documents_failed_total).increment(failed as u64);
    }

    /// Record the wall-clock duration of a stage
    pub fn record_stage_duration(&self, stage: &'static str, duration: Duration) {
        histogram!(self.stage_duration, "stage" => stage).record(duration.as_secs_f64());
    }
}
