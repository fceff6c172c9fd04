//! Data models for scraped reviews and index-ready documents
//!
//! Raw types mirror the JSON shape served by the review site's data API and
//! written to the raw staging file; [`ReviewDocument`] is the flat record
//! written to the transformed staging file and upserted into the index.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// All reviews and rating metadata scraped for one configured source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceBatch {
    /// Source slug, e.g. `www.example.com`
    pub enterprise_url: String,
    /// Aggregate rating metadata; empty when the metadata fetch failed
    #[serde(default)]
    pub enterprise: EnterpriseInfo,
    /// Reviews in append order
    #[serde(default)]
    pub reviews: Vec<RawReview>,
}

impl SourceBatch {
    /// Batch recorded for a source whose extraction failed.
    #[must_use]
    pub fn empty(enterprise_url: &str) -> Self {
        Self {
            enterprise_url: enterprise_url.to_string(),
            ..Self::default()
        }
    }
}

/// Read an explicit JSON `null` as the type's default
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Enterprise-level statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnterpriseInfo {
    /// Mean score as served (number or numeric string)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enterprise_rating: Option<serde_json::Value>,
    /// Total review count as served
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enterprise_review_number: Option<serde_json::Value>,
    /// Five-bucket distribution
    #[serde(default, skip_serializing_if = "RatingCounts::is_empty")]
    pub ratings: RatingCounts,
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Count of ratings per star bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingCounts {
    /// Total number of ratings
    pub total: u64,
    /// One-star ratings
    pub one: u64,
    /// Two-star ratings
    pub two: u64,
    /// Three-star ratings
    pub three: u64,
    /// Four-star ratings
    pub four: u64,
    /// Five-star ratings
    pub five: u64,
}

impl RatingCounts {
    /// True when no bucket has been filled
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// One inbound review as served by the data API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawReview {
    /// External review id
    pub id: Option<String>,
    /// Author
    #[serde(deserialize_with = "null_as_default")]
    pub consumer: Consumer,
    /// Free-text body
    pub text: Option<String>,
    /// Star rating, kept untyped for tolerant coercion
    pub rating: Option<serde_json::Value>,
    /// Publication dates
    #[serde(deserialize_with = "null_as_default")]
    pub dates: ReviewDates,
    /// Verification labels
    #[serde(deserialize_with = "null_as_default")]
    pub labels: ReviewLabels,
    /// Optional reply from the enterprise
    pub reply: Option<Reply>,
}

/// Author sub-record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Consumer {
    /// Author id
    pub id: Option<String>,
}

/// Date sub-record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewDates {
    /// ISO-8601 publication timestamp
    #[serde(rename = "publishedDate")]
    pub published_date: Option<String>,
}

/// Label sub-record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewLabels {
    /// Verification status
    #[serde(deserialize_with = "null_as_default")]
    pub verification: Verification,
}

/// Verification flag
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Verification {
    /// Whether the review comes from a verified purchase
    #[serde(rename = "isVerified", deserialize_with = "null_as_default")]
    pub is_verified: bool,
}

/// Enterprise reply to a review
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Reply {
    /// Reply body
    pub message: Option<String>,
    /// ISO-8601 reply timestamp
    #[serde(rename = "publishedDate")]
    pub published_date: Option<String>,
}

/// Sentiment label attached to each document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sentiment {
    /// Positive review
    Positif,
    /// Neutral review
    Neutre,
    /// Negative review
    #[serde(rename = "Négatif")]
    Negatif,
    /// No classification was possible
    #[serde(rename = "Indéfini")]
    Indefini,
}

impl Sentiment {
    /// Label as stored in the index
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Positif => "Positif",
            Self::Neutre => "Neutre",
            Self::Negatif => "Négatif",
            Self::Indefini => "Indéfini",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Sentiment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Positif" => Ok(Self::Positif),
            "Neutre" => Ok(Self::Neutre),
            "Négatif" => Ok(Self::Negatif),
            "Indéfini" => Ok(Self::Indefini),
            other => Err(format!("unknown sentiment label: {other}")),
        }
    }
}

/// Flat, index-ready review document
///
/// `created_at` and `updated_at` are added by the loader; a transformed
/// document never carries them. Unknown fields are rejected when reading the
/// transformed staging file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReviewDocument {
    /// Unique key in the index
    pub id_review: Option<String>,
    /// Verified purchase flag
    pub is_verified: bool,
    /// Publication day (`YYYY-MM-DD`)
    pub date_review: Option<String>,
    /// Author id
    pub id_user: Option<String>,
    /// Cleaned, anonymized review text or the unavailable sentinel
    pub user_review: String,
    /// Character length of `user_review`
    pub user_review_length: usize,
    /// Star rating
    pub user_rating: f64,
    /// Sentiment label
    pub user_sentiment: Sentiment,
    /// Reply day (`YYYY-MM-DD`)
    pub date_response: Option<String>,
    /// Cleaned, anonymized reply text or the unavailable sentinel
    pub enterprise_response: String,
    /// Display name of the enterprise
    pub enterprise_name: Option<String>,
    /// Source slug
    pub enterprise_url: String,
    /// Mean enterprise score
    pub enterprise_rating: f64,
    /// Total enterprise review count
    pub enterprise_review_number: i64,
    /// Share of one-star ratings, in percent
    pub enterprise_percentage_one_star: u32,
    /// Share of two-star ratings, in percent
    pub enterprise_percentage_two_star: u32,
    /// Share of three-star ratings, in percent
    pub enterprise_percentage_three_star: u32,
    /// Share of four-star ratings, in percent
    pub enterprise_percentage_four_star: u32,
    /// Share of five-star ratings, in percent
    pub enterprise_percentage_five_star: u32,
}
