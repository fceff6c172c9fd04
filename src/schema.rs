//! Strict index schema for review documents.
//!
//! The mapping sets `"dynamic": "strict"` so the index rejects unknown
//! fields; [`validate_fields`] applies the same allow-list before anything is
//! sent.

use serde_json::{json, Map, Value};

use crate::error::{EtlError, Result};

/// Field set accepted by the index
pub const REVIEW_FIELDS: &[&str] = &[
    "id_review",
    "is_verified",
    "date_review",
    "id_user",
    "user_review",
    "user_review_length",
    "user_rating",
    "user_sentiment",
    "date_response",
    "enterprise_response",
    "enterprise_name",
    "enterprise_url",
    "enterprise_rating",
    "enterprise_review_number",
    "enterprise_percentage_one_star",
    "enterprise_percentage_two_star",
    "enterprise_percentage_three_star",
    "enterprise_percentage_four_star",
    "enterprise_percentage_five_star",
    "created_at",
    "updated_at",
];

fn text_with_raw() -> Value {
    json!({"type": "text", "fields": {"raw": {"type": "keyword"}}})
}

/// Index mapping for review documents
#[must_use]
pub fn mapping() -> Value {
    json!({
        "dynamic": "strict",
        "properties": {
            "id_review": {"type": "keyword"},
            "is_verified": {"type": "boolean"},
            "date_review": {"type": "date"},
            "date_response": {"type": "date"},
            "created_at": {"type": "date"},
            "updated_at": {"type": "date"},
            "id_user": {"type": "keyword"},
            "user_review": text_with_raw(),
            "user_review_length": {"type": "integer"},
            "user_rating": {"type": "float"},
            "user_sentiment": {"type": "keyword", "fields": {"raw": {"type": "keyword"}}},
            "enterprise_name": text_with_raw(),
            "enterprise_response": text_with_raw(),
            "enterprise_url": {"type": "keyword"},
            "enterprise_rating": {"type": "float"},
            "enterprise_review_number": {"type": "integer"},
            "enterprise_percentage_one_star": {"type": "integer"},
            "enterprise_percentage_two_star": {"type": "integer"},
            "enterprise_percentage_three_star": {"type": "integer"},
            "enterprise_percentage_four_star": {"type": "integer"},
            "enterprise_percentage_five_star": {"type": "integer"},
        }
    })
}

/// Reject any field outside [`REVIEW_FIELDS`]
pub fn validate_fields(document: &Map<String, Value>) -> Result<()> {
    let unknown: Vec<&str> = document
        .keys()
        .map(String::as_str)
        .filter(|key| !REVIEW_FIELDS.contains(key))
        .collect();

    if unknown.is_empty() {
        Ok(())
    } else {
        Err(EtlError::SchemaViolation(format!(
            "unknown fields: {}",
            unknown.join(", ")
        )))
    }
}
