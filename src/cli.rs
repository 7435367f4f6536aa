//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

/// Harvest bibliographic records into a catalog and transfer the documents.
///
/// `harvest` pages through the metadata service, classifies each record, and
/// merges the survivors into the catalog. `transfer` moves the catalogued
/// documents to object storage or local disk.
#[derive(Parser, Debug)]
#[command(name = "harvester")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: $XDG_CONFIG_HOME/harvester/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Catalog CSV path (default: ./catalog.csv)
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build or extend the catalog from the metadata service
    Harvest(HarvestArgs),
    /// Move catalogued documents (0 = to bucket, 1 = to disk, 2 = bucket to disk)
    Transfer(TransferArgs),
}

#[derive(ClapArgs, Debug, Clone)]
pub struct HarvestArgs {
    /// First publication year to harvest
    #[arg(long, default_value_t = 2018)]
    pub start_year: i32,

    /// Last publication year to harvest (inclusive)
    #[arg(long, default_value_t = 2019)]
    pub end_year: i32,

    /// Language of the documents to keep
    #[arg(long, default_value = "english")]
    pub language: String,

    /// Offset of the first page in each year
    #[arg(long, default_value_t = 1)]
    pub starting_limit: u64,

    /// Page size, and the step between page offsets
    #[arg(long, default_value_t = 10_000, value_parser = clap::value_parser!(u64).range(1..))]
    pub max_limit: u64,

    /// Category allow-list in hundreds, comma separated (default: 0,500,600)
    #[arg(long, value_delimiter = ',')]
    pub categories: Option<Vec<u16>>,

    /// Keep entries of every category, including unclassified ones
    #[arg(long, conflicts_with = "categories")]
    pub all_categories: bool,

    /// Concurrent classification lookups (1-100)
    #[arg(short = 'c', long, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub concurrency: Option<u8>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct TransferArgs {
    /// Destination: 0 = object store, 1 = local disk, 2 = object store to local disk
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(0..=2))]
    pub mode: u8,

    /// Directory for local and mirror transfers (default: ./downloads)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Concurrent transfers (1-100; default 20 for mode 0, 3 for mode 1)
    #[arg(short = 'c', long, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub concurrency: Option<u8>,
}
