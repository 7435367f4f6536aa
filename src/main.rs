//! CLI entry point for the harvester tool.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use harvester_core::catalog::{DEFAULT_CATALOG_FILE, DEFAULT_DOWNLOAD_BASE_URL};
use harvester_core::classify::{DEFAULT_CATEGORIES, DEFAULT_CLASSIFY_URL};
use harvester_core::config::{FileConfig, load_config};
use harvester_core::download::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use harvester_core::metadata::DEFAULT_METADATA_URL;
use harvester_core::transfer::DEFAULT_OUTPUT_DIR;
use harvester_core::{
    CatalogStore, Classifier, HarvestOptions, Harvester, HttpClient, MetadataClient,
    ObjectStoreDocuments, TransferMode, TransferOptions, TransferOrchestrator,
};
use tracing::{debug, info};

mod cli;

use cli::{Args, Command, HarvestArgs, TransferArgs};

/// Region used when the config names a bucket but no region.
const DEFAULT_REGION: &str = "eu-west-2";

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");

    let config = load_config(args.config.as_deref())
        .context("failed to load configuration")?
        .unwrap_or_default();

    let catalog_path = args
        .catalog
        .clone()
        .or_else(|| config.catalog_path.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CATALOG_FILE));
    let catalog = CatalogStore::new(catalog_path);
    info!(catalog = %catalog.path().display(), "harvester starting");

    match &args.command {
        Command::Harvest(harvest) => run_harvest(harvest, &config, catalog).await,
        Command::Transfer(transfer) => run_transfer(transfer, &config, catalog).await,
    }
}

async fn run_harvest(args: &HarvestArgs, config: &FileConfig, catalog: CatalogStore) -> Result<()> {
    let http = HttpClient::for_services();

    let metadata_url = config
        .metadata_url
        .clone()
        .unwrap_or_else(|| DEFAULT_METADATA_URL.to_string());
    let metadata = MetadataClient::with_base_url(http.clone(), metadata_url);

    let classify_url = config
        .classify_url
        .clone()
        .unwrap_or_else(|| DEFAULT_CLASSIFY_URL.to_string());
    let mut classifier = Classifier::with_base_url(http, classify_url);
    if let Some(width) = args.concurrency.map(usize::from).or(config.classify_concurrency) {
        classifier = classifier.with_concurrency(width);
    }

    let categories = if args.all_categories {
        Vec::new()
    } else {
        args.categories
            .clone()
            .or_else(|| config.categories.clone())
            .unwrap_or_else(|| DEFAULT_CATEGORIES.to_vec())
    };

    let options = HarvestOptions {
        start_year: args.start_year,
        end_year: args.end_year,
        language: args.language.clone(),
        starting_limit: args.starting_limit,
        max_limit: args.max_limit,
        categories,
        download_base_url: config
            .download_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_DOWNLOAD_BASE_URL.to_string()),
    };

    let harvester = Harvester::new(metadata, classifier, catalog, options)
        .context("invalid harvest options")?;
    let report = harvester.run().await.context("harvest failed")?;

    info!(
        pages = report.pages,
        records = report.records_fetched,
        kept = report.entries_kept,
        catalog_rows = report.catalog_rows,
        "Harvest complete"
    );
    Ok(())
}

async fn run_transfer(
    args: &TransferArgs,
    config: &FileConfig,
    catalog: CatalogStore,
) -> Result<()> {
    let mode = TransferMode::try_from(args.mode)?;

    let client = match (config.connect_timeout_secs, config.read_timeout_secs) {
        (None, None) => HttpClient::new(),
        (connect, read) => HttpClient::new_with_timeouts(
            connect.unwrap_or(CONNECT_TIMEOUT_SECS),
            read.unwrap_or(READ_TIMEOUT_SECS),
        ),
    };

    let mut options = TransferOptions::new(mode);
    options.output_dir = args
        .output_dir
        .clone()
        .or_else(|| config.output_dir.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));
    options.concurrency = args.concurrency.map(usize::from).or(match mode {
        TransferMode::Archive => config.archive_concurrency,
        TransferMode::Local | TransferMode::Mirror => config.local_concurrency,
    });

    let store = match mode {
        TransferMode::Local => None,
        TransferMode::Archive | TransferMode::Mirror => {
            let bucket = config
                .bucket
                .as_deref()
                .with_context(|| format!("{mode} transfers need `bucket` in the config file"))?;
            let region = config.region.as_deref().unwrap_or(DEFAULT_REGION);
            options.mirror_base_url = config
                .mirror_base_url
                .clone()
                .unwrap_or_else(|| format!("https://{bucket}.s3.{region}.amazonaws.com"));
            let store = ObjectStoreDocuments::s3(bucket, region)
                .with_context(|| format!("failed to open bucket {bucket}"))?;
            Some(store)
        }
    };

    let mut orchestrator = TransferOrchestrator::new(client, catalog, options)?;
    if let Some(store) = store {
        orchestrator = orchestrator.with_store(Arc::new(store));
    }

    let report = orchestrator.run().await.context("transfer failed")?;

    info!(
        mode = %mode,
        attempted = report.attempted,
        succeeded = report.succeeded,
        failed = report.failed,
        retried = report.retried,
        "Transfer complete"
    );
    Ok(())
}
