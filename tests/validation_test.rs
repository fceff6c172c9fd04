//! Unit tests for validation.rs module

use std::path::Path;
use review_etl::validation::{InputValidator, MAX_PAGES_LIMIT};
use tempfile::{tempdir, NamedTempFile};

#[test]
fn test_validate_max_pages_bounds() {
    assert!(InputValidator::validate_max_pages(0).is_err());
    assert!(InputValidator::validate_max_pages(1).is_ok());
    assert!(InputValidator::validate_max_pages(MAX_PAGES_LIMIT).is_ok());
    assert!(InputValidator::validate_max_pages(MAX_PAGES_LIMIT + 1).is_err());
}

#[test]
fn test_validate_source_slug_valid() {
    assert!(InputValidator::validate_source_slug("www.showroomprive.com").is_ok());
    assert!(InputValidator::validate_source_slug("shop-example_fr.com").is_ok());
}

#[test]
fn test_validate_source_slug_empty() {
    assert!(InputValidator::validate_source_slug("").is_err());
    assert!(InputValidator::validate_source_slug("   ").is_err());
}

#[test]
fn test_validate_source_slug_rejects_url_characters() {
    assert!(InputValidator::validate_source_slug("www.example.com/x").is_err());
    assert!(InputValidator::validate_source_slug("example.com?page=2").is_err());
    assert!(InputValidator::validate_source_slug("example com").is_err());
}

#[test]
fn test_validate_source_slug_too_long() {
    let slug = format!("{}.com", "a".repeat(250));
    assert!(InputValidator::validate_source_slug(&slug).is_err());
}

#[test]
fn test_validate_index_name_valid() {
    assert!(InputValidator::validate_index_name("reviews").is_ok());
    assert!(InputValidator::validate_index_name("reviews-2024.v1").is_ok());
}

#[test]
fn test_validate_index_name_invalid() {
    assert!(InputValidator::validate_index_name("").is_err());
    assert!(InputValidator::validate_index_name("Reviews").is_err());
    assert!(InputValidator::validate_index_name("_reviews").is_err());
    assert!(InputValidator::validate_index_name("-reviews").is_err());
    assert!(InputValidator::validate_index_name("re views").is_err());
    assert!(InputValidator::validate_index_name("re*views").is_err());
    assert!(InputValidator::validate_index_name("..").is_err());
}

#[test]
fn test_validate_url() {
    assert!(InputValidator::validate_url("http://elasticsearch:9200").is_ok());
    assert!(InputValidator::validate_url("https://www.trustpilot.com").is_ok());
    assert!(InputValidator::validate_url("ftp://example.com").is_err());
    assert!(InputValidator::validate_url("").is_err());
    assert!(InputValidator::validate_url("http://exa mple.com").is_err());
}

#[test]
fn test_validate_staging_dir() {
    let dir = tempdir().expect("Failed to create temp dir");
    assert!(InputValidator::validate_staging_dir(dir.path()).is_ok());
    // A directory that does not exist yet is fine; it is created on first write
    assert!(InputValidator::validate_staging_dir(&dir.path().join("later")).is_ok());
    assert!(InputValidator::validate_staging_dir(Path::new("")).is_err());

    let file = NamedTempFile::new().expect("Failed to create temp file");
    assert!(InputValidator::validate_staging_dir(file.path()).is_err());
}

#[test]
fn test_validate_input_file() {
    let file = NamedTempFile::new().expect("Failed to create temp file");
    assert!(InputValidator::validate_input_file(file.path()).is_ok());

    let dir = tempdir().expect("Failed to create temp dir");
    assert!(InputValidator::validate_input_file(dir.path()).is_err());
    assert!(InputValidator::validate_input_file(&dir.path().join("missing.json")).is_err());
}
