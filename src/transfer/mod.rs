//! Transfer orchestrator for moving catalogued documents.
//!
//! Three strategies are selected by [`TransferMode`]:
//!
//! - **Archive** (`0`): fetch each not-yet-archived document and upload it
//!   to the object store.
//! - **Local** (`1`): stream every document to the output directory.
//! - **Mirror** (`2`): copy everything already archived to the output
//!   directory.
//!
//! Archive and local runs use a bounded worker pool (semaphore permits plus
//! one spawned task per entry). Each task returns the entry's new status;
//! after the pool drains the statuses are merged back into the catalog
//! with [`CatalogStore::status_merge`]. Mirror runs are sequential and only
//! report counts.

mod archive;
mod local;
mod mirror;
mod stats;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, instrument, warn};

use crate::catalog::{CatalogEntry, CatalogError, CatalogStore, TransferStatus, status_timestamp};
use crate::download::{HttpClient, RetryPolicy};
use crate::storage::{DocumentStore, StorageError};

use stats::TransferStats;
pub use stats::TransferReport;

/// Minimum allowed concurrency value.
const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed concurrency value.
const MAX_CONCURRENCY: usize = 100;

/// Default worker count for archive runs.
pub const DEFAULT_ARCHIVE_CONCURRENCY: usize = 20;

/// Default worker count for local runs.
pub const DEFAULT_LOCAL_CONCURRENCY: usize = 3;

/// Default directory for local and mirror runs.
pub const DEFAULT_OUTPUT_DIR: &str = "./downloads";

/// Where documents are moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    /// Remote source to object store.
    Archive,
    /// Remote source to local disk.
    Local,
    /// Object store to local disk.
    Mirror,
}

impl TryFrom<u8> for TransferMode {
    type Error = TransferError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Archive),
            1 => Ok(Self::Local),
            2 => Ok(Self::Mirror),
            other => Err(TransferError::InvalidMode { value: other }),
        }
    }
}

impl fmt::Display for TransferMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Archive => write!(f, "archive"),
            Self::Local => write!(f, "local"),
            Self::Mirror => write!(f, "mirror"),
        }
    }
}

/// Errors that abort a transfer run as a whole.
///
/// Per-item failures never surface here; they become failed statuses.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("invalid transfer mode {value}: must be 0 (archive), 1 (local) or 2 (mirror)")]
    InvalidMode { value: u8 },

    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency { value: usize },

    #[error("{mode} transfers need a document store")]
    MissingStore { mode: TransferMode },

    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("document store error: {0}")]
    Storage(#[from] StorageError),

    #[error("cannot create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Settings for one transfer run.
#[derive(Debug, Clone)]
pub struct TransferOptions {
    pub mode: TransferMode,
    /// Worker count; `None` picks the per-mode default.
    pub concurrency: Option<usize>,
    pub output_dir: PathBuf,
    /// Public base URL of the bucket, used by mirror runs.
    pub mirror_base_url: String,
    pub archive_fetch_policy: RetryPolicy,
    pub upload_policy: RetryPolicy,
    pub local_policy: RetryPolicy,
    pub mirror_policy: RetryPolicy,
}

impl TransferOptions {
    #[must_use]
    pub fn new(mode: TransferMode) -> Self {
        Self {
            mode,
            concurrency: None,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            mirror_base_url: String::new(),
            archive_fetch_policy: RetryPolicy::archive_fetch(),
            upload_policy: RetryPolicy::throttled_upload(),
            local_policy: RetryPolicy::local_download(),
            mirror_policy: RetryPolicy::mirror_fetch(),
        }
    }

    /// Worker count after applying the per-mode default.
    #[must_use]
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.unwrap_or(match self.mode {
            TransferMode::Archive => DEFAULT_ARCHIVE_CONCURRENCY,
            TransferMode::Local | TransferMode::Mirror => DEFAULT_LOCAL_CONCURRENCY,
        })
    }
}

// ==================== Status messages ====================

pub(crate) fn upload_succeeded(id: &str) -> TransferStatus {
    TransferStatus::succeeded(format!(
        "document successfully uploaded [{}] {id}",
        status_timestamp()
    ))
}

pub(crate) fn upload_failed(reason: &str) -> TransferStatus {
    TransferStatus::failed(format!(
        "document failed to upload [{}] - Error - {reason}",
        status_timestamp()
    ))
}

pub(crate) fn saved_to_disk(id: &str) -> TransferStatus {
    TransferStatus::succeeded(format!("document saved to disk [{}] {id}", status_timestamp()))
}

pub(crate) fn download_failed(reason: &str) -> TransferStatus {
    TransferStatus::failed(format!(
        "document failed to download [{}] - Error - {reason}",
        status_timestamp()
    ))
}

// ==================== Orchestrator ====================

/// Runs one transfer mode against the catalog.
#[derive(Debug)]
pub struct TransferOrchestrator {
    client: HttpClient,
    catalog: CatalogStore,
    store: Option<Arc<dyn DocumentStore>>,
    options: TransferOptions,
}

impl TransferOrchestrator {
    /// Creates an orchestrator.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::InvalidConcurrency`] if the worker count is
    /// outside `1..=100`.
    pub fn new(
        client: HttpClient,
        catalog: CatalogStore,
        options: TransferOptions,
    ) -> Result<Self, TransferError> {
        let concurrency = options.effective_concurrency();
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&concurrency) {
            return Err(TransferError::InvalidConcurrency { value: concurrency });
        }

        debug!(mode = %options.mode, concurrency, "creating transfer orchestrator");

        Ok(Self {
            client,
            catalog,
            store: None,
            options,
        })
    }

    /// Attaches the document store used by archive and mirror runs.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = Some(store);
        self
    }

    fn require_store(&self) -> Result<Arc<dyn DocumentStore>, TransferError> {
        self.store.clone().ok_or(TransferError::MissingStore {
            mode: self.options.mode,
        })
    }

    async fn ensure_output_dir(&self) -> Result<(), TransferError> {
        tokio::fs::create_dir_all(&self.options.output_dir)
            .await
            .map_err(|source| TransferError::OutputDir {
                path: self.options.output_dir.clone(),
                source,
            })
    }

    /// Runs the configured mode to completion.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError`] if the catalog cannot be read or written,
    /// the output directory cannot be created, a required store is missing,
    /// or the archive cannot be listed. Individual item failures do not
    /// cause an error.
    #[instrument(skip(self), fields(mode = %self.options.mode))]
    pub async fn run(&self) -> Result<TransferReport, TransferError> {
        let stats = Arc::new(TransferStats::default());

        match self.options.mode {
            TransferMode::Archive | TransferMode::Local => self.run_pool(&stats).await?,
            TransferMode::Mirror => {
                let store = self.require_store()?;
                self.ensure_output_dir().await?;
                mirror::mirror_documents(
                    &self.client,
                    store.as_ref(),
                    &self.options.mirror_base_url,
                    &self.options.output_dir,
                    &self.options.mirror_policy,
                    &stats,
                )
                .await?;
            }
        }

        let report = stats.snapshot();
        info!(
            attempted = report.attempted,
            succeeded = report.succeeded,
            failed = report.failed,
            retried = report.retried,
            "transfer complete"
        );
        Ok(report)
    }

    async fn run_pool(&self, stats: &Arc<TransferStats>) -> Result<(), TransferError> {
        let mode = self.options.mode;
        let store = match mode {
            TransferMode::Archive => Some(self.require_store()?),
            _ => None,
        };
        if mode == TransferMode::Local {
            self.ensure_output_dir().await?;
        }

        let entries: Vec<CatalogEntry> = self
            .catalog
            .load()?
            .into_iter()
            .filter(|entry| mode != TransferMode::Archive || !entry.transfer_status.succeeded)
            .collect();

        info!(candidates = entries.len(), "entries selected for transfer");
        if entries.is_empty() {
            info!("nothing to transfer");
            return Ok(());
        }

        let semaphore = Arc::new(Semaphore::new(self.options.effective_concurrency()));
        let mut handles = Vec::with_capacity(entries.len());

        for entry in entries {
            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                warn!("transfer pool closed unexpectedly");
                break;
            };

            let client = self.client.clone();
            let store = store.clone();
            let options = self.options.clone();
            let stats = Arc::clone(stats);
            let task_entry = entry.clone();

            let handle = tokio::spawn(async move {
                // Permit is dropped when this block exits (RAII)
                let _permit = permit;
                stats.increment_attempted();

                let status = match (options.mode, store) {
                    (TransferMode::Archive, Some(store)) => {
                        match archive::archive_entry(
                            &client,
                            store.as_ref(),
                            &task_entry,
                            &options.archive_fetch_policy,
                            &options.upload_policy,
                            &stats,
                        )
                        .await
                        {
                            Ok(status) => status,
                            Err(e) => {
                                error!(entry_id = %task_entry.id, error = %e, "upload failed");
                                upload_failed(&e.to_string())
                            }
                        }
                    }
                    _ => {
                        local::download_entry(
                            &client,
                            &task_entry,
                            &options.output_dir,
                            &options.local_policy,
                            &stats,
                        )
                        .await
                    }
                };

                if status.succeeded {
                    stats.increment_succeeded();
                } else {
                    stats.increment_failed();
                }
                status
            });
            handles.push((entry, handle));
        }

        debug!(task_count = handles.len(), "waiting for transfers to complete");

        let mut updated = Vec::with_capacity(handles.len());
        for (entry, handle) in handles {
            let status = match handle.await {
                Ok(status) => status,
                Err(e) => {
                    // Task panics are logged and recorded but don't fail the batch
                    warn!(entry_id = %entry.id, error = %e, "transfer task panicked");
                    stats.increment_failed();
                    let reason = format!("worker panicked: {e}");
                    match mode {
                        TransferMode::Archive => upload_failed(&reason),
                        _ => download_failed(&reason),
                    }
                }
            };
            updated.push(entry.with_status(status));
        }

        self.catalog.status_merge(updated)?;
        Ok(())
    }
}
