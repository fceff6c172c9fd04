use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

use review_etl::config::AppConfig;
use review_etl::http_client::{ClientSettings, FetchClient};
use review_etl::index::{ElasticsearchIndex, LoadReport};
use review_etl::logging::init_logging;
use review_etl::pipeline::{self, Stages};
use review_etl::{sentiment, Anonymizer, ReviewScraper, StagingArea};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file layered over the defaults
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape reviews and stage the raw extract
    Extract {
        /// Number of pages per source (1-10)
        #[arg(short, long)]
        max_pages: Option<u32>,
    },
    /// Anonymize and classify the raw extract
    Transform {
        /// Raw extract to read instead of the latest one
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
    /// Upsert transformed documents into the index
    Load {
        /// Transformed file to read instead of the latest one
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
    /// Run extract, transform and load in sequence
    Run {
        /// Number of pages per source (1-10)
        #[arg(short, long)]
        max_pages: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Load configuration
    let config = AppConfig::load_from(cli.config.as_deref())?;

    // Initialize logging; the guard flushes the file layer on exit
    let _log_guard = init_logging(
        Some(&config.get_log_level()),
        &config.logging.format,
        config.logging.file_path.as_deref().map(Path::new),
    )?;

    info!("Starting review-etl");

    let staging = StagingArea::new(config.staging_dir());
    let fetch_client = Arc::new(FetchClient::new(ClientSettings::from(&config.scraper)));

    let result = match &cli.command {
        Commands::Extract { max_pages } => {
            let scraper = ReviewScraper::new(fetch_client.clone(), &config.scraper)?;
            let max_pages = max_pages.unwrap_or(config.scraper.max_pages);
            pipeline::run_extract(&scraper, &staging, max_pages)
                .await
                .map(|path| info!(path = %path.display(), "Extract staged"))
        }
        Commands::Transform { input } => {
            let classifier = sentiment::from_config(&config.sentiment)?;
            let anonymizer = Anonymizer::new()?;
            pipeline::run_transform(&staging, classifier.as_ref(), &anonymizer, input.as_deref())
                .await
                .map(|path| info!(path = %path.display(), "Transform staged"))
        }
        Commands::Load { input } => {
            let index = ElasticsearchIndex::from_config(&config.index)?;
            pipeline::run_load(&staging, &index, &config.index.name, input.as_deref())
                .await
                .map(|report| log_report(&report))
        }
        Commands::Run { max_pages } => {
            let scraper = ReviewScraper::new(fetch_client.clone(), &config.scraper)?;
            let classifier = sentiment::from_config(&config.sentiment)?;
            let anonymizer = Anonymizer::new()?;
            let index = ElasticsearchIndex::from_config(&config.index)?;
            let stages = Stages {
                scraper: &scraper,
                staging: &staging,
                classifier: classifier.as_ref(),
                anonymizer: &anonymizer,
                index: &index,
                index_name: &config.index.name,
            };
            pipeline::run_all(&stages, max_pages.unwrap_or(config.scraper.max_pages))
                .await
                .map(|report| log_report(&report))
        }
    };

    fetch_client.close();

    if let Err(e) = &result {
        error!(error = %e, "review-etl failed");
    }
    result.context("Pipeline stage failed")
}

fn log_report(report: &LoadReport) {
    info!(
        submitted = report.submitted,
        succeeded = report.succeeded,
        skipped = report.skipped,
        failed = report.failed.len(),
        "Load report"
    );
}
