//! Archive strategy: fetch a document and upload it to the object store.

use tracing::{info, instrument, warn};

use super::stats::TransferStats;
use super::{upload_failed, upload_succeeded};
use crate::catalog::{CatalogEntry, TransferStatus};
use crate::download::{FailureType, HttpClient, RetryPolicy, document_name, run_with_retry};
use crate::storage::{DocumentStore, StorageError};

fn classify_storage_error(error: &StorageError) -> FailureType {
    if error.is_throttled() {
        FailureType::RateLimited
    } else {
        FailureType::Permanent
    }
}

/// Archives one entry.
///
/// Fetch failures and exhausted throttling retries come back as a failed
/// status. Any other storage error is returned so the caller can record it.
#[instrument(skip_all, fields(entry_id = %entry.id))]
pub(crate) async fn archive_entry(
    client: &HttpClient,
    store: &dyn DocumentStore,
    entry: &CatalogEntry,
    fetch_policy: &RetryPolicy,
    upload_policy: &RetryPolicy,
    stats: &TransferStats,
) -> Result<TransferStatus, StorageError> {
    let name = document_name(&entry.author, &entry.title, entry.year);

    let body = match client
        .fetch_bytes_with_retry(&entry.download_url, fetch_policy)
        .await
    {
        Ok((body, attempts)) => {
            stats.add_retries_from_attempts(attempts);
            body
        }
        Err((error, attempts)) => {
            stats.add_retries_from_attempts(attempts);
            warn!(url = %entry.download_url, %error, attempts, "document fetch failed");
            return Ok(upload_failed(&error.to_string()));
        }
    };

    let uploaded = run_with_retry(upload_policy, classify_storage_error, &name, |_| {
        store.put_document(&name, body.clone())
    })
    .await;

    match uploaded {
        Ok(((), attempts)) => {
            stats.add_retries_from_attempts(attempts);
            info!(document = %name, bytes = body.len(), "document uploaded");
            Ok(upload_succeeded(&entry.id))
        }
        Err((error, attempts)) if error.is_throttled() => {
            stats.add_retries_from_attempts(attempts);
            warn!(document = %name, %error, attempts, "upload still throttled, giving up");
            Ok(upload_failed(&error.to_string()))
        }
        Err((error, _)) => Err(error),
    }
}
