//! Extract, transform and load stages.
//!
//! Stages hand off through the staging area only. Each one returns the path
//! it wrote (or the load report) so a caller can pass it explicitly to the
//! next stage instead of relying on the newest file in the directory.

use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::anonymize::Anonymizer;
use crate::error::{EtlError, Result};
use crate::index::{load_documents, DocumentIndex, LoadReport};
use crate::logging::OperationTimer;
use crate::metrics::PipelineMetrics;
use crate::scraper::ReviewScraper;
use crate::sentiment::SentimentClassifier;
use crate::staging::StagingArea;
use crate::transform::transform;
use crate::validation::InputValidator;

fn finish_stage(stage: &'static str, timer: OperationTimer) {
    let duration = timer.finish();
    PipelineMetrics::default().record_stage_duration(stage, duration);
}

fn log_failure<T>(stage: &str, result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
        error!(stage, error = %e, "Stage failed");
    }
    result
}

/// Scrape every source and stage the raw extract
pub async fn run_extract(
    scraper: &ReviewScraper,
    staging: &StagingArea,
    max_pages: u32,
) -> Result<PathBuf> {
    let result: Result<PathBuf> = async {
        InputValidator::validate_max_pages(max_pages)?;
        info!(max_pages, "Extract started");
        let timer = OperationTimer::new("extract");

        let batches = scraper.fetch_all_sources(max_pages).await;
        if batches.is_empty() {
            return Err(EtlError::EmptyExtract("no source returned".to_string()));
        }

        let reviews: usize = batches.iter().map(|batch| batch.reviews.len()).sum();
        if reviews == 0 {
            return Err(EtlError::EmptyExtract(format!(
                "no review extracted from {} sources",
                batches.len()
            )));
        }

        let path = staging.stage_raw(&batches)?;
        info!(sources = batches.len(), reviews, "Extract finished");
        finish_stage("extract", timer);
        Ok(path)
    }
    .await;

    log_failure("extract", result)
}

/// Transform a raw extract, stage the documents, then delete all raw extracts
pub async fn run_transform(
    staging: &StagingArea,
    classifier: &dyn SentimentClassifier,
    anonymizer: &Anonymizer,
    input: Option<&Path>,
) -> Result<PathBuf> {
    let result: Result<PathBuf> = async {
        info!("Transform started");
        let timer = OperationTimer::new("transform");

        let (raw_path, batches) = staging.load_raw(input)?;
        let documents = transform(&batches, classifier, anonymizer).await;
        if documents.is_empty() {
            return Err(EtlError::EmptyTransform);
        }

        let path = staging.stage_documents(&documents)?;
        // Raw text carries personal data and must not outlive this stage
        let mut purged = staging.purge_raw()?;
        if StagingArea::discard_raw(&raw_path)? {
            purged += 1;
        }
        info!(
            input = %raw_path.display(),
            count = documents.len(),
            purged,
            "Transform finished"
        );
        finish_stage("transform", timer);
        Ok(path)
    }
    .await;

    log_failure("transform", result)
}

/// Load transformed documents into the index
pub async fn run_load(
    staging: &StagingArea,
    index: &dyn DocumentIndex,
    index_name: &str,
    input: Option<&Path>,
) -> Result<LoadReport> {
    let result: Result<LoadReport> = async {
        info!(index = index_name, "Load started");
        let timer = OperationTimer::new("load");

        let (path, documents) = staging.load_documents(input)?;
        let report = load_documents(index, index_name, &documents).await?;

        info!(
            input = %path.display(),
            succeeded = report.succeeded,
            failed = report.failed.len(),
            "Load finished"
        );
        finish_stage("load", timer);
        Ok(report)
    }
    .await;

    log_failure("load", result)
}

/// Everything the three stages need
pub struct Stages<'a> {
    /// Review scraper
    pub scraper: &'a ReviewScraper,
    /// Staging area
    pub staging: &'a StagingArea,
    /// Sentiment classifier
    pub classifier: &'a dyn SentimentClassifier,
    /// PII masking rules
    pub anonymizer: &'a Anonymizer,
    /// Target index
    pub index: &'a dyn DocumentIndex,
    /// Target index name
    pub index_name: &'a str,
}

/// Run extract, transform and load in sequence, passing each staged path on
pub async fn run_all(stages: &Stages<'_>, max_pages: u32) -> Result<LoadReport> {
    let raw = run_extract(stages.scraper, stages.staging, max_pages).await?;
    let documents =
        run_transform(stages.staging, stages.classifier, stages.anonymizer, Some(raw.as_path())).await?;
    run_load(stages.staging, stages.index, stages.index_name, Some(documents.as_path())).await
}
