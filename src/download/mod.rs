//! HTTP layer for fetching documents and service responses.
//!
//! This module provides functionality for downloading documents from
//! HTTP/HTTPS URLs with retry support and streaming to disk.
//!
//! # Features
//!
//! - Buffered fetches for object-store uploads and small service responses
//! - Streaming downloads (memory-efficient for large documents)
//! - Retry policies with exponential backoff, one preset per transfer mode
//! - Structured error types with full context
//! - Deterministic document naming and filename sanitization
//!
//! # Example
//!
//! ```no_run
//! use harvester_core::download::{HttpClient, RetryPolicy};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new();
//! let result = client
//!     .download_to_path(
//!         "https://example.com/paper.pdf",
//!         Path::new("./downloads/paper.pdf"),
//!         &RetryPolicy::local_download(),
//!     )
//!     .await
//!     .map_err(|(e, _)| e)?;
//! println!("Downloaded: {}", result.path.display());
//! # Ok(())
//! # }
//! ```

mod client;
pub mod constants;
mod error;
mod filename;
mod retry;

pub use client::{DownloadFileResult, HttpClient};
pub use error::DownloadError;
pub use filename::{document_name, sanitize_document_name};
pub(crate) use filename::truncate_chars;
pub use retry::{
    FailureType, RetryDecision, RetryPolicy, classify_error, classify_error_any_status,
    run_with_retry,
};

// Note: we do NOT define module-local Result aliases.
// Use `Result<T, DownloadError>` explicitly in function signatures.
