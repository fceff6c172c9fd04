use anyhow::{anyhow, Result};
use std::path::Path;

/// Upper bound on the number of review pages fetched per source
pub const MAX_PAGES_LIMIT: u32 = 10;

/// Validation utilities for input sanitization and edge case handling
#[derive(Debug, Copy, Clone)]
pub struct InputValidator;

impl InputValidator {
    /// Validate the requested page count
    pub fn validate_max_pages(max_pages: u32) -> Result<()> {
        if max_pages == 0 {
            return Err(anyhow!("max_pages must be at least 1"));
        }

        if max_pages > MAX_PAGES_LIMIT {
            return Err(anyhow!(
                "max_pages too large ({max_pages}, max {MAX_PAGES_LIMIT})"
            ));
        }

        Ok(())
    }

    /// Validate a review-site business slug such as `www.example.com`
    pub fn validate_source_slug(slug: &str) -> Result<()> {
        if slug.trim().is_empty() {
            return Err(anyhow!("Source slug cannot be empty"));
        }

        if slug.len() > 253 {
            return Err(anyhow!("Source slug too long (max 253 characters)"));
        }

        // The slug is interpolated into URL paths and query strings
        if !slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_')
        {
            return Err(anyhow!("Source slug contains invalid characters: {slug}"));
        }

        Ok(())
    }

    /// Validate a search index name
    pub fn validate_index_name(name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(anyhow!("Index name cannot be empty"));
        }

        if name.len() > 255 {
            return Err(anyhow!("Index name too long (max 255 bytes)"));
        }

        if name.chars().any(char::is_uppercase) {
            return Err(anyhow!("Index name must be lowercase: {name}"));
        }

        if name.starts_with(['-', '_', '+']) {
            return Err(anyhow!("Index name cannot start with '-', '_' or '+'"));
        }

        if name == "." || name == ".." {
            return Err(anyhow!("Index name cannot be '.' or '..'"));
        }

        const FORBIDDEN: [char; 11] = ['\\', '/', '*', '?', '"', '<', '>', '|', ' ', ',', '#'];
        if name.contains(FORBIDDEN) {
            return Err(anyhow!("Index name contains invalid characters: {name}"));
        }

        Ok(())
    }

    /// Validate an http(s) endpoint
    pub fn validate_url(url: &str) -> Result<()> {
        if url.trim().is_empty() {
            return Err(anyhow!("URL cannot be empty"));
        }

        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(anyhow!("URL must use http or https: {url}"));
        }

        if url.len() > 2048 {
            return Err(anyhow!("URL too long (max 2048 characters)"));
        }

        if url.chars().any(char::is_whitespace) {
            return Err(anyhow!("URL cannot contain whitespace"));
        }

        Ok(())
    }

    /// Validate the staging directory path
    pub fn validate_staging_dir(path: &Path) -> Result<()> {
        let path_str = path.to_string_lossy();
        if path_str.trim().is_empty() {
            return Err(anyhow!("Staging directory cannot be empty"));
        }

        if path_str.len() > 4096 {
            return Err(anyhow!("Staging directory path too long (max 4096 characters)"));
        }

        if path.exists() && !path.is_dir() {
            return Err(anyhow!("Staging path exists but is not a directory: {path:?}"));
        }

        Ok(())
    }

    /// Validate an explicit staged input file
    pub fn validate_input_file(path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(anyhow!("Input file does not exist: {path:?}"));
        }

        if !path.is_file() {
            return Err(anyhow!("Input path is not a file: {path:?}"));
        }

        Ok(())
    }
}
