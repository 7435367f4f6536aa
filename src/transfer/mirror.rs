//! Mirror strategy: copy every archived document to local disk.

use std::path::Path;

use tracing::{info, instrument, warn};

use super::stats::TransferStats;
use crate::download::{DownloadError, HttpClient, RetryPolicy, truncate_chars};
use crate::storage::{DOCUMENT_PREFIX, DocumentStore, StorageError};

/// Maximum characters of the object name kept in the local file name.
const LOCAL_NAME_LIMIT: usize = 200;

/// Form-style encoding: like percent-encoding but spaces become `+`.
fn quote_plus(value: &str) -> String {
    urlencoding::encode(value).replace("%20", "+")
}

/// Public URL of an archived object.
pub(crate) fn mirror_url(base_url: &str, object_name: &str) -> String {
    format!(
        "{}/{DOCUMENT_PREFIX}/{}",
        base_url.trim_end_matches('/'),
        quote_plus(object_name)
    )
}

/// Local file name for an archived object.
pub(crate) fn local_file_name(object_name: &str) -> String {
    let stem = object_name.replace(".pdf", "");
    format!("{}.pdf", truncate_chars(&stem, LOCAL_NAME_LIMIT))
}

/// Copies every archived document into `output_dir`, one at a time.
///
/// Per-object failures are logged and counted; enumeration continues.
///
/// # Errors
///
/// Returns [`StorageError`] only if the archive cannot be listed.
#[instrument(skip_all, fields(output_dir = %output_dir.display()))]
pub(crate) async fn mirror_documents(
    client: &HttpClient,
    store: &dyn DocumentStore,
    base_url: &str,
    output_dir: &Path,
    policy: &RetryPolicy,
    stats: &TransferStats,
) -> Result<(), StorageError> {
    let names = store.list_documents().await?;
    info!(documents = names.len(), "archived documents found");

    for name in names {
        stats.increment_attempted();
        let url = mirror_url(base_url, &name);
        let path = output_dir.join(local_file_name(&name));

        let fetched = client.fetch_bytes_with_retry(&url, policy).await;
        let written = match fetched {
            Ok((body, attempts)) => {
                stats.add_retries_from_attempts(attempts);
                tokio::fs::write(&path, &body)
                    .await
                    .map_err(|e| DownloadError::io(&path, e))
            }
            Err((e, attempts)) => {
                stats.add_retries_from_attempts(attempts);
                Err(e)
            }
        };

        match written {
            Ok(()) => {
                info!(document = %name, path = %path.display(), "document mirrored");
                stats.increment_succeeded();
            }
            Err(e) => {
                warn!(document = %name, error = %e, "unable to mirror document");
                stats.increment_failed();
            }
        }
    }

    Ok(())
}
