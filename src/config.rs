use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::validation::InputValidator;

/// Application configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Review site access
    pub scraper: ScraperConfig,
    /// Sentiment classifier
    pub sentiment: SentimentConfig,
    /// Target search index
    pub index: IndexConfig,
    /// Staging area
    pub staging: StagingConfig,
    /// Log output
    pub logging: LoggingConfig,
}

/// Review site access settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// Review site root URL
    pub base_url: String,
    /// Source slugs, scraped in order
    pub sources: Vec<String>,
    /// Review language filter
    pub language: String,
    /// Pages per source (1-10)
    pub max_pages: u32,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// User-Agent header
    pub user_agent: String,
    /// Accept-Language header
    pub accept_language: String,
}

/// Sentiment classifier settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentConfig {
    /// `http` or `lexicon`
    pub provider: String,
    /// Prediction service URL
    pub endpoint: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

/// Search index settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Index service URL
    pub host: String,
    /// Index name
    pub name: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

/// Staging area settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagingConfig {
    /// Staging directory
    pub directory: String,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level
    pub level: String,
    /// `text` or `json`
    pub format: String,
    /// Daily-rolled JSON log file
    pub file_path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scraper: ScraperConfig {
                base_url: "https://www.trustpilot.com".to_string(),
                sources: vec!["www.showroomprive.com".to_string()],
                language: "fr".to_string(),
                max_pages: 1,
                timeout_secs: 30,
                user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                             (KHTML, like Gecko) Chrome/96.0.4664.110 Safari/537.36"
                    .to_string(),
                accept_language: "fr-FR,fr;q=0.9".to_string(),
            },
            sentiment: SentimentConfig {
                provider: "http".to_string(),
                endpoint: "http://fastapi:8000/predict/internal".to_string(),
                timeout_secs: 30,
            },
            index: IndexConfig {
                host: "http://elasticsearch:9200".to_string(),
                name: "reviews".to_string(),
                timeout_secs: 30,
            },
            staging: StagingConfig {
                directory: "./data".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "text".to_string(),
                file_path: None,
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources with precedence
    ///
    /// Defaults, then `config/default`, `config/local`, the explicit `path`
    /// if given, and finally `REVIEW_ETL_*` environment variables
    /// (`REVIEW_ETL_INDEX__HOST` sets `index.host`).
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let defaults = Config::try_from(&AppConfig::default())
            .map_err(|e| anyhow::anyhow!("Failed to build default configuration: {}", e))?;

        let mut builder = Config::builder()
            .add_source(defaults)
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false));

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix("REVIEW_ETL")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

        let app_config: AppConfig = config
            .try_deserialize()
            .map_err(|e| anyhow::anyhow!("Failed to deserialize configuration: {}", e))?;

        // Validate configuration
        app_config.validate()?;

        Ok(app_config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        // Validate scraper config
        InputValidator::validate_url(&self.scraper.base_url)?;
        if self.scraper.sources.is_empty() {
            return Err(anyhow::anyhow!("scraper.sources must list at least one source"));
        }
        for source in &self.scraper.sources {
            InputValidator::validate_source_slug(source)?;
        }
        InputValidator::validate_max_pages(self.scraper.max_pages)?;
        if self.scraper.timeout_secs == 0 {
            return Err(anyhow::anyhow!("scraper.timeout_secs must be greater than 0"));
        }
        if self.scraper.language.trim().is_empty() {
            return Err(anyhow::anyhow!("scraper.language cannot be empty"));
        }

        // Validate sentiment config
        let valid_providers = ["http", "lexicon"];
        if !valid_providers.contains(&self.sentiment.provider.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid sentiment provider: {}. Must be one of: {:?}",
                self.sentiment.provider,
                valid_providers
            ));
        }
        if self.sentiment.provider == "http" {
            InputValidator::validate_url(&self.sentiment.endpoint)?;
        }
        if self.sentiment.timeout_secs == 0 {
            return Err(anyhow::anyhow!("sentiment.timeout_secs must be greater than 0"));
        }

        // Validate index config
        InputValidator::validate_url(&self.index.host)?;
        InputValidator::validate_index_name(&self.index.name)?;
        if self.index.timeout_secs == 0 {
            return Err(anyhow::anyhow!("index.timeout_secs must be greater than 0"));
        }

        // Validate staging config
        InputValidator::validate_staging_dir(Path::new(&self.staging.directory))?;

        // Validate logging config
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level,
                valid_levels
            ));
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log format: {}. Must be one of: {:?}",
                self.logging.format,
                valid_formats
            ));
        }

        Ok(())
    }

    /// Staging directory as a path
    pub fn staging_dir(&self) -> PathBuf {
        PathBuf::from(&self.staging.directory)
    }

    /// Get log level from environment or config
    pub fn get_log_level(&self) -> String {
        std::env::var("RUST_LOG").unwrap_or_else(|_| self.logging.level.clone())
    }
}
