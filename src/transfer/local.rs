//! Local strategy: stream a document straight to disk.

use std::path::Path;

use tracing::{error, info, instrument};

use super::stats::TransferStats;
use super::{download_failed, saved_to_disk};
use crate::catalog::{CatalogEntry, TransferStatus};
use crate::download::{HttpClient, RetryPolicy, document_name};

/// Downloads one entry to `<output_dir>/<name>.pdf`.
///
/// Never fails: exhausted retries and write errors become a failed status.
#[instrument(skip_all, fields(entry_id = %entry.id))]
pub(crate) async fn download_entry(
    client: &HttpClient,
    entry: &CatalogEntry,
    output_dir: &Path,
    policy: &RetryPolicy,
    stats: &TransferStats,
) -> TransferStatus {
    let name = document_name(&entry.author, &entry.title, entry.year);
    let path = output_dir.join(format!("{name}.pdf"));

    match client.download_to_path(&entry.download_url, &path, policy).await {
        Ok(result) => {
            stats.add_retries_from_attempts(result.attempts);
            info!(
                path = %result.path.display(),
                bytes = result.bytes_downloaded,
                "document saved"
            );
            saved_to_disk(&entry.id)
        }
        Err((e, attempts)) => {
            stats.add_retries_from_attempts(attempts);
            error!(url = %entry.download_url, error = %e, attempts, "download abandoned");
            download_failed(&e.to_string())
        }
    }
}
