//! Harvester Core Library
//!
//! This library provides the core functionality for the harvester tool,
//! which builds a catalog of bibliographic records from a remote metadata
//! service, tags each record with a subject classification, and transfers
//! the referenced documents to object storage or local disk.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`metadata`] - Paginated fetcher for the remote metadata service
//! - [`catalog`] - Catalog entries, record normalization, and the CSV store
//! - [`classify`] - Subject classification lookup with title fallback
//! - [`harvest`] - Pipeline that drives fetch, normalize, classify, and merge
//! - [`download`] - HTTP client, retry policy, and filename sanitization
//! - [`storage`] - Object-store seam for the document archive
//! - [`transfer`] - Bounded worker pools for the three transfer modes
//! - [`config`] - TOML configuration file loading

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod catalog;
pub mod classify;
pub mod config;
pub mod download;
pub mod harvest;
pub mod metadata;
pub mod storage;
pub mod transfer;
mod user_agent;

// Re-export commonly used types
pub use catalog::{CatalogEntry, CatalogError, CatalogKey, CatalogStore, TransferStatus};
pub use classify::{Classifier, LookupKey, expand_categories};
pub use config::{ConfigError, FileConfig};
pub use download::{
    DownloadError, FailureType, HttpClient, RetryDecision, RetryPolicy, classify_error,
    sanitize_document_name,
};
pub use harvest::{HarvestOptions, HarvestReport, Harvester};
pub use metadata::{MetadataClient, MetadataError, RawRecord, YearWindow};
pub use storage::{DocumentStore, ObjectStoreDocuments, StorageError};
pub use transfer::{TransferMode, TransferOptions, TransferOrchestrator, TransferReport};
