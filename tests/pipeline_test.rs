//! Stage-level tests wiring fakes through the staging area

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use review_etl::anonymize::{Anonymizer, EMAIL_PLACEHOLDER};
use review_etl::config::AppConfig;
use review_etl::error::{EtlError, Result};
use review_etl::http_client::PageFetcher;
use review_etl::index::{BulkItemResult, DocumentIndex, UpsertAction};
use review_etl::models::{RawReview, Sentiment, SourceBatch};
use review_etl::pipeline::{run_all, run_extract, run_load, run_transform, Stages};
use review_etl::scraper::ReviewScraper;
use review_etl::sentiment::LexiconClassifier;
use review_etl::staging::StagingArea;
use serde_json::{json, Map, Value};
use tempfile::tempdir;

const BASE: &str = "https://reviews.test";
const SLUG: &str = "shop.test";

struct StaticFetcher {
    pages: HashMap<String, String>,
}

#[async_trait]
impl PageFetcher for StaticFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        self.pages.get(url).cloned().ok_or_else(|| EtlError::PageFetch {
            page: 0,
            reason: format!("404 for {url}"),
        })
    }
}

#[derive(Default)]
struct MemoryIndex {
    documents: Mutex<HashMap<String, Map<String, Value>>>,
}

#[async_trait]
impl DocumentIndex for MemoryIndex {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn ensure_index(&self, _name: &str, _mapping: &Value) -> Result<()> {
        Ok(())
    }

    async fn bulk_upsert(&self, _name: &str, actions: &[UpsertAction]) -> Result<Vec<BulkItemResult>> {
        let mut documents = self.documents.lock();
        Ok(actions
            .iter()
            .map(|action| {
                documents
                    .entry(action.id.clone())
                    .and_modify(|existing| existing.extend(action.doc.clone()))
                    .or_insert_with(|| action.upsert.clone());
                BulkItemResult {
                    id: Some(action.id.clone()),
                    status: 200,
                    error: None,
                }
            })
            .collect())
    }
}

fn scraper(reviews: Value) -> ReviewScraper {
    let landing = r#"<script id="__NEXT_DATA__" type="application/json">{"buildId":"b1"}</script>"#.to_string();
    let api = format!("{BASE}/_next/data/b1/review/{SLUG}.json?sort=recency&businessUnit={SLUG}&languages=fr");
    let page = json!({
        "pageProps": {
            "reviews": reviews,
            "filters": {
                "pagination": {"totalPages": 1},
                "reviewStatistics": {"ratings": {"total": 4, "one": 0, "two": 0, "three": 1, "four": 1, "five": 2}}
            },
            "businessUnit": {"trustScore": 4.5, "numberOfReviews": 4, "displayName": "Shop Test"}
        }
    });

    let mut pages = HashMap::new();
    pages.insert(format!("{BASE}/review/{SLUG}"), landing);
    pages.insert(api, page.to_string());

    let mut config = AppConfig::default().scraper;
    config.base_url = BASE.to_string();
    config.sources = vec![SLUG.to_string()];
    ReviewScraper::new(Arc::new(StaticFetcher { pages }), &config).expect("Failed to build scraper")
}

fn sample_reviews() -> Value {
    json!([
        {"id": "r1", "text": "Produit excellent, je recommande", "rating": 5,
         "consumer": {"id": "u1"}, "dates": {"publishedDate": "2024-04-01T10:00:00.000Z"}},
        {"id": "r2", "text": "Écrivez-moi à lea@mail.fr, colis jamais reçu", "rating": 1,
         "labels": {"verification": {"isVerified": true}}}
    ])
}

fn raw_files(dir: &Path) -> usize {
    fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "json"))
                .count()
        })
        .unwrap_or(0)
}

#[tokio::test]
async fn test_extract_stages_raw_file() {
    let dir = tempdir().expect("Failed to create temp dir");
    let staging = StagingArea::new(dir.path());

    let path = run_extract(&scraper(sample_reviews()), &staging, 1).await.expect("extract failed");

    assert!(path.exists());
    let (_, batches) = staging.load_raw(Some(path.as_path())).expect("Failed to load raw");
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].reviews.len(), 2);
    assert_eq!(batches[0].enterprise.name.as_deref(), Some("Shop Test"));
}

#[tokio::test]
async fn test_extract_rejects_invalid_page_count() {
    let dir = tempdir().expect("Failed to create temp dir");
    let staging = StagingArea::new(dir.path());

    let result = run_extract(&scraper(sample_reviews()), &staging, 0).await;
    assert!(matches!(result, Err(EtlError::InvalidConfig(_))));

    let result = run_extract(&scraper(sample_reviews()), &staging, 11).await;
    assert!(matches!(result, Err(EtlError::InvalidConfig(_))));
}

#[tokio::test]
async fn test_extract_without_reviews_fails_and_stages_nothing() {
    let dir = tempdir().expect("Failed to create temp dir");
    let staging = StagingArea::new(dir.path());

    let result = run_extract(&scraper(json!([])), &staging, 1).await;

    assert!(matches!(result, Err(EtlError::EmptyExtract(_))));
    assert_eq!(raw_files(dir.path()), 0);
}

#[tokio::test]
async fn test_transform_without_raw_file() {
    let dir = tempdir().expect("Failed to create temp dir");
    let staging = StagingArea::new(dir.path());
    let anonymizer = Anonymizer::new().expect("Failed to compile anonymizer");

    let result = run_transform(&staging, &LexiconClassifier::new(), &anonymizer, None).await;
    assert!(matches!(result, Err(EtlError::EmptyLoadInput(_))));
}

#[tokio::test]
async fn test_transform_with_no_review_is_empty_transform() {
    let dir = tempdir().expect("Failed to create temp dir");
    let staging = StagingArea::new(dir.path());
    let anonymizer = Anonymizer::new().expect("Failed to compile anonymizer");
    staging
        .stage_raw(&[SourceBatch::empty("www.example.com")])
        .expect("Failed to stage raw");

    let result = run_transform(&staging, &LexiconClassifier::new(), &anonymizer, None).await;
    assert!(matches!(result, Err(EtlError::EmptyTransform)));
}

#[tokio::test]
async fn test_transform_stages_documents_and_purges_raw() {
    let dir = tempdir().expect("Failed to create temp dir");
    let staging = StagingArea::new(dir.path());
    let anonymizer = Anonymizer::new().expect("Failed to compile anonymizer");

    let mut batch = SourceBatch::empty("www.example.com");
    batch.reviews.push(RawReview {
        id: Some("r1".to_string()),
        text: Some("Contact: marc@mail.fr".to_string()),
        ..RawReview::default()
    });
    staging.stage_raw(&[batch]).expect("Failed to stage raw");

    let path = run_transform(&staging, &LexiconClassifier::new(), &anonymizer, None)
        .await
        .expect("transform failed");

    assert_eq!(raw_files(dir.path()), 0);
    let (_, documents) = staging.load_documents(Some(path.as_path())).expect("Failed to load documents");
    assert_eq!(documents.len(), 1);
    assert!(documents[0].user_review.contains(EMAIL_PLACEHOLDER));
}

#[tokio::test]
async fn test_transform_deletes_raw_input_outside_staging_dir() {
    let dir = tempdir().expect("Failed to create temp dir");
    let elsewhere = tempdir().expect("Failed to create temp dir");
    let staging = StagingArea::new(dir.path());
    let anonymizer = Anonymizer::new().expect("Failed to compile anonymizer");

    let mut batch = SourceBatch::empty("www.example.com");
    batch.reviews.push(RawReview {
        id: Some("r1".to_string()),
        text: Some("Appelez Jean au 06 12 34 56 78".to_string()),
        ..RawReview::default()
    });
    let raw = elsewhere.path().join("raw.json");
    fs::write(&raw, serde_json::to_string(&[batch]).expect("Failed to serialize")).expect("Failed to write raw");

    let path = run_transform(&staging, &LexiconClassifier::new(), &anonymizer, Some(raw.as_path()))
        .await
        .expect("transform failed");

    assert!(path.exists());
    assert!(!raw.exists());
}

#[tokio::test]
async fn test_run_all_end_to_end() {
    let dir = tempdir().expect("Failed to create temp dir");
    let staging = StagingArea::new(dir.path());
    let anonymizer = Anonymizer::new().expect("Failed to compile anonymizer");
    let classifier = LexiconClassifier::new();
    let index = MemoryIndex::default();
    let scraper = scraper(sample_reviews());

    let stages = Stages {
        scraper: &scraper,
        staging: &staging,
        classifier: &classifier,
        anonymizer: &anonymizer,
        index: &index,
        index_name: "reviews",
    };
    let report = run_all(&stages, 1).await.expect("pipeline failed");

    assert_eq!(report.succeeded, 2);
    assert!(report.failed.is_empty());
    assert_eq!(raw_files(dir.path()), 0);

    let documents = index.documents.lock();
    let first = &documents["r1"];
    assert_eq!(first["user_sentiment"], json!(Sentiment::Positif.label()));
    assert_eq!(first["date_review"], json!("2024-04-01"));
    assert_eq!(first["enterprise_name"], json!("Shop Test"));
    assert_eq!(first["enterprise_percentage_five_star"], json!(50));
    assert!(first.contains_key("created_at"));

    let second = &documents["r2"];
    assert_eq!(second["is_verified"], json!(true));
    assert!(!second["user_review"].as_str().unwrap_or_default().contains("lea@mail.fr"));
}

#[tokio::test]
async fn test_load_from_latest_documents() {
    let dir = tempdir().expect("Failed to create temp dir");
    let staging = StagingArea::new(dir.path());
    let anonymizer = Anonymizer::new().expect("Failed to compile anonymizer");
    let index = MemoryIndex::default();

    run_extract(&scraper(sample_reviews()), &staging, 1).await.expect("extract failed");
    run_transform(&staging, &LexiconClassifier::new(), &anonymizer, None)
        .await
        .expect("transform failed");
    let report = run_load(&staging, &index, "reviews", None).await.expect("load failed");

    assert_eq!(report.submitted, 2);
    assert_eq!(index.documents.lock().len(), 2);
}
