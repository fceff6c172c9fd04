//! Sentiment classification behind a single prediction contract.
//!
//! The transformer only sees [`SentimentClassifier`]. Production runs call the
//! prediction service over HTTP; [`LexiconClassifier`] scores text locally with
//! a weighted French lexicon so the pipeline can run without the service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::SentimentConfig;
use crate::error::{EtlError, Result};
use crate::metrics::PipelineMetrics;
use crate::models::Sentiment;
use crate::normalize::{clean_text, MAX_TEXT_LENGTH};

/// Classifier output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction {
    /// Text as normalized by the classifier
    #[serde(default)]
    pub text_clean: String,
    /// Predicted label
    pub sentiment: Sentiment,
}

/// Prediction contract consumed by the transformer
#[async_trait]
pub trait SentimentClassifier: Send + Sync {
    /// Predict the sentiment of an already anonymized text.
    async fn predict(&self, text: &str) -> Result<Prediction>;
}

/// Classify `text`, degrading any failure to [`Sentiment::Indefini`].
pub async fn classify_or_sentinel(classifier: &dyn SentimentClassifier, text: &str) -> Sentiment {
    match classifier.predict(text).await {
        Ok(prediction) => prediction.sentiment,
        Err(e) => {
            warn!(error = %e, "Sentiment prediction failed, using sentinel label");
            PipelineMetrics::default().record_classifier_failure();
            Sentiment::Indefini
        }
    }
}

/// Build the classifier selected by `sentiment.provider`
pub fn from_config(config: &SentimentConfig) -> Result<Box<dyn SentimentClassifier>> {
    match config.provider.as_str() {
        "http" => Ok(Box::new(HttpSentimentClassifier::new(
            &config.endpoint,
            Duration::from_secs(config.timeout_secs),
        )?)),
        "lexicon" => Ok(Box::new(LexiconClassifier::new())),
        other => Err(EtlError::InvalidConfig(format!(
            "unknown sentiment provider: {other}"
        ))),
    }
}

#[derive(Serialize)]
struct PredictRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct PredictResponse {
    #[serde(default)]
    text_clean: String,
    sentiment: String,
}

/// Client for the remote prediction service
pub struct HttpSentimentClassifier {
    client: Client,
    endpoint: String,
}

impl HttpSentimentClassifier {
    /// Create a client posting to `endpoint` with a per-request `timeout`
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }
}

#[async_trait]
impl SentimentClassifier for HttpSentimentClassifier {
    async fn predict(&self, text: &str) -> Result<Prediction> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&PredictRequest { text })
            .send()
            .await
            .map_err(|e| EtlError::Classifier(e.to_string()))?
            .error_for_status()
            .map_err(|e| EtlError::Classifier(e.to_string()))?;

        let body: PredictResponse = response
            .json()
            .await
            .map_err(|e| EtlError::Classifier(format!("invalid response body: {e}")))?;

        let sentiment = body.sentiment.parse::<Sentiment>().map_err(EtlError::Classifier)?;
        Ok(Prediction {
            text_clean: body.text_clean,
            sentiment,
        })
    }
}

const POSITIVE_WORDS: &[(&str, f32)] = &[
    ("bien", 1.0),
    ("bon", 1.0),
    ("bonne", 1.0),
    ("super", 1.5),
    ("excellent", 2.0),
    ("excellente", 2.0),
    ("parfait", 2.0),
    ("parfaite", 2.0),
    ("génial", 1.8),
    ("top", 1.5),
    ("rapide", 1.2),
    ("satisfait", 1.2),
    ("satisfaite", 1.2),
    ("ravi", 1.8),
    ("ravie", 1.8),
    ("content", 1.2),
    ("contente", 1.2),
    ("conforme", 1.0),
    ("recommande", 1.5),
    ("merci", 1.0),
    ("qualité", 1.0),
    ("efficace", 1.2),
    ("agréable", 1.2),
    ("impeccable", 1.8),
    ("great", 1.5),
    ("good", 1.0),
    ("perfect", 2.0),
];

const NEGATIVE_WORDS: &[(&str, f32)] = &[
    ("mauvais", -1.2),
    ("mauvaise", -1.2),
    ("nul", -1.8),
    ("nulle", -1.8),
    ("horrible", -2.0),
    ("catastrophique", -2.0),
    ("déçu", -1.5),
    ("déçue", -1.5),
    ("décevant", -1.5),
    ("retard", -1.2),
    ("lent", -1.0),
    ("arnaque", -2.0),
    ("cassé", -1.5),
    ("cassée", -1.5),
    ("abîmé", -1.5),
    ("défectueux", -1.8),
    ("problème", -1.2),
    ("remboursement", -0.8),
    ("fuir", -2.0),
    ("inadmissible", -2.0),
    ("honteux", -2.0),
    ("bad", -1.0),
    ("terrible", -2.0),
];

const INTENSIFIERS: &[(&str, f32)] = &[
    ("très", 1.5),
    ("trop", 1.3),
    ("vraiment", 1.3),
    ("extrêmement", 2.0),
    ("totalement", 1.8),
    ("complètement", 1.8),
    ("absolument", 2.0),
    ("tellement", 1.5),
    ("super", 1.5),
    ("assez", 1.1),
    ("plutôt", 0.9),
    ("peu", 0.6),
];

const NEGATIONS: &[&str] = &["ne", "n", "pas", "jamais", "aucun", "aucune", "ni", "sans", "rien"];

/// Score thresholds separating the three labels
const POSITIVE_THRESHOLD: f32 = 0.2;
const NEGATIVE_THRESHOLD: f32 = -0.2;

/// Offline classifier scoring text with a weighted French lexicon
#[derive(Debug, Clone, Copy, Default)]
pub struct LexiconClassifier;

impl LexiconClassifier {
    /// Create the classifier
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Sentiment score in `[-1.0, 1.0]`; `0.0` when no lexicon word occurs
    #[must_use]
    pub fn score(&self, text: &str) -> f32 {
        let words: Vec<String> = text
            .split(|c: char| c.is_whitespace() || c == '\'' || c == '’')
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();

        let mut total = 0.0_f32;
        let mut hits = 0.0_f32;

        for (i, word) in words.iter().enumerate() {
            let weight = POSITIVE_WORDS
                .iter()
                .chain(NEGATIVE_WORDS)
                .find(|(w, _)| w == word)
                .map(|(_, weight)| *weight);

            let Some(mut sentiment) = weight else {
                continue;
            };

            if i > 0 {
                if let Some((_, intensity)) = INTENSIFIERS.iter().find(|(w, _)| *w == words[i - 1]) {
                    sentiment *= intensity;
                }
            }

            let negated = words[i.saturating_sub(2)..i]
                .iter()
                .any(|w| NEGATIONS.contains(&w.as_str()));
            if negated {
                sentiment = -sentiment * 0.8;
            }

            total += sentiment;
            hits += 1.0;
        }

        if hits == 0.0 {
            0.0
        } else {
            (total / hits).clamp(-1.0, 1.0)
        }
    }

    /// Map a score to a label
    #[must_use]
    pub fn label(score: f32) -> Sentiment {
        if score > POSITIVE_THRESHOLD {
            Sentiment::Positif
        } else if score < NEGATIVE_THRESHOLD {
            Sentiment::Negatif
        } else {
            Sentiment::Neutre
        }
    }
}

#[async_trait]
impl SentimentClassifier for LexiconClassifier {
    async fn predict(&self, text: &str) -> Result<Prediction> {
        let text_clean = clean_text(Some(text), MAX_TEXT_LENGTH)
            .ok_or_else(|| EtlError::Classifier("empty or invalid text".to_string()))?;
        let score = self.score(&text_clean);
        debug!(score, "Lexicon sentiment score");
        Ok(Prediction {
            sentiment: Self::label(score),
            text_clean,
        })
    }
}
