//! Raw review batches to index-ready documents.
//!
//! Texts are cleaned and anonymized before they are stored or sent to the
//! classifier. Empty texts get the `"indisponible"` sentinel and are never
//! classified.

use tracing::{debug, info};

use crate::anonymize::Anonymizer;
use crate::metrics::PipelineMetrics;
use crate::models::{RatingCounts, RawReview, ReviewDocument, Sentiment, SourceBatch};
use crate::normalize::{clean_text, format_date, to_float, to_int, MAX_TEXT_LENGTH};
use crate::sentiment::{classify_or_sentinel, SentimentClassifier};

/// Stored in place of a text that is missing or has no usable content
pub const UNAVAILABLE_TEXT: &str = "indisponible";

/// Ceiling percentage of `count` over `total`, clamped to `0..=100`.
///
/// A zero total is treated as one.
#[must_use]
pub fn percentage(count: u64, total: u64) -> u32 {
    let total = total.max(1);
    let pct = count.saturating_mul(100).div_ceil(total).min(100);
    u32::try_from(pct).unwrap_or(100)
}

/// Five star buckets as percentages, one star first
#[must_use]
pub fn rating_percentages(ratings: &RatingCounts) -> [u32; 5] {
    [ratings.one, ratings.two, ratings.three, ratings.four, ratings.five]
        .map(|count| percentage(count, ratings.total))
}

/// Clean then anonymize a text; `None` when nothing usable is left
#[must_use]
pub fn clean_and_anonymize(text: Option<&str>, anonymizer: &Anonymizer) -> Option<String> {
    clean_text(text, MAX_TEXT_LENGTH).map(|clean| anonymizer.anonymize(&clean))
}

/// Batch-level fields shared by every document of a source
struct BatchContext {
    enterprise_url: String,
    enterprise_name: Option<String>,
    enterprise_rating: f64,
    enterprise_review_number: i64,
    percentages: [u32; 5],
}

impl BatchContext {
    fn new(batch: &SourceBatch) -> Self {
        let info = &batch.enterprise;
        let name = info
            .name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(&batch.enterprise_url);

        Self {
            enterprise_url: batch.enterprise_url.clone(),
            enterprise_name: clean_text(Some(name), MAX_TEXT_LENGTH),
            enterprise_rating: to_float(info.enterprise_rating.as_ref()),
            enterprise_review_number: to_int(info.enterprise_review_number.as_ref()),
            percentages: rating_percentages(&info.ratings),
        }
    }
}

async fn transform_review(
    review: &RawReview,
    context: &BatchContext,
    classifier: &dyn SentimentClassifier,
    anonymizer: &Anonymizer,
) -> ReviewDocument {
    let (user_review, user_sentiment) = match clean_and_anonymize(review.text.as_deref(), anonymizer) {
        Some(text) => {
            let sentiment = classify_or_sentinel(classifier, &text).await;
            (text, sentiment)
        }
        None => (UNAVAILABLE_TEXT.to_string(), Sentiment::Indefini),
    };

    let reply = review.reply.as_ref();
    let enterprise_response =
        clean_and_anonymize(reply.and_then(|r| r.message.as_deref()), anonymizer)
            .unwrap_or_else(|| UNAVAILABLE_TEXT.to_string());

    let [one, two, three, four, five] = context.percentages;

    ReviewDocument {
        id_review: review.id.clone(),
        is_verified: review.labels.verification.is_verified,
        date_review: format_date(review.dates.published_date.as_deref()),
        id_user: clean_text(review.consumer.id.as_deref(), MAX_TEXT_LENGTH),
        user_review_length: user_review.chars().count(),
        user_review,
        user_rating: to_float(review.rating.as_ref()),
        user_sentiment,
        date_response: format_date(reply.and_then(|r| r.published_date.as_deref())),
        enterprise_response,
        enterprise_name: context.enterprise_name.clone(),
        enterprise_url: context.enterprise_url.clone(),
        enterprise_rating: context.enterprise_rating,
        enterprise_review_number: context.enterprise_review_number,
        enterprise_percentage_one_star: one,
        enterprise_percentage_two_star: two,
        enterprise_percentage_three_star: three,
        enterprise_percentage_four_star: four,
        enterprise_percentage_five_star: five,
    }
}

/// Transform the reviews of one source, in review order
pub async fn transform_batch(
    batch: &SourceBatch,
    classifier: &dyn SentimentClassifier,
    anonymizer: &Anonymizer,
) -> Vec<ReviewDocument> {
    let context = BatchContext::new(batch);
    let mut documents = Vec::with_capacity(batch.reviews.len());

    for review in &batch.reviews {
        documents.push(transform_review(review, &context, classifier, anonymizer).await);
    }

    debug!(source = %batch.enterprise_url, count = documents.len(), "Batch transformed");
    documents
}

/// Transform every batch, in batch order then review order
pub async fn transform(
    batches: &[SourceBatch],
    classifier: &dyn SentimentClassifier,
    anonymizer: &Anonymizer,
) -> Vec<ReviewDocument> {
    let mut documents = Vec::new();
    for batch in batches {
        documents.extend(transform_batch(batch, classifier, anonymizer).await);
    }

    PipelineMetrics::default().record_documents_transformed(documents.len());
    info!(count = documents.len(), "Reviews transformed");
    documents
}
