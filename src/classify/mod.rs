//! Subject classification lookup.
//!
//! Each entry is resolved in two stages: an identifier query, then a title
//! query when the identifier is missing or its lookup errors. Known
//! "unresolved" answers from the service end the search without falling
//! back. Resolution never fails past this module; the worst outcome is
//! `None`.

mod lookup;
mod response;

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use crate::catalog::{CatalogEntry, CatalogKey};
use crate::download::{DownloadError, HttpClient};

pub use lookup::{LookupKey, format_identifier, format_title};
pub use response::classification_from_sfa;
use response::{ClassifyResponse, ResponseCode};

/// Default classification service endpoint.
pub const DEFAULT_CLASSIFY_URL: &str = "http://classify.oclc.org/classify2/Classify";

/// Default number of lookups in flight.
pub const DEFAULT_CLASSIFY_CONCURRENCY: usize = 10;

/// Default category allow-list, in hundreds.
pub const DEFAULT_CATEGORIES: [u16; 3] = [0, 500, 600];

/// A lookup that could not produce an answer, which triggers the title fallback.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("classification request failed: {0}")]
    Transport(#[from] DownloadError),

    #[error("classification response has no response code")]
    MissingCode,

    #[error("unknown classification response code {code}")]
    UnknownCode { code: String },
}

/// Resolves catalog entries to subject classification codes.
#[derive(Debug, Clone)]
pub struct Classifier {
    http: HttpClient,
    base_url: String,
    concurrency: usize,
}

impl Classifier {
    #[must_use]
    pub fn new(http: HttpClient) -> Self {
        Self::with_base_url(http, DEFAULT_CLASSIFY_URL)
    }

    #[must_use]
    pub fn with_base_url(http: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            concurrency: DEFAULT_CLASSIFY_CONCURRENCY,
        }
    }

    /// Sets the worker pool width used by [`resolve_all`](Self::resolve_all).
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    fn url_for(&self, key: &LookupKey) -> String {
        format!("{}?{}", self.base_url, key.query())
    }

    async fn query(&self, key: &LookupKey) -> Result<ClassifyResponse, LookupError> {
        let body = self.http.fetch_text(&self.url_for(key)).await?;
        Ok(ClassifyResponse::parse(&body))
    }

    /// Runs one lookup.
    ///
    /// `Ok(None)` means the service answered but had no usable code.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError`] on transport failure or an unreadable answer.
    #[instrument(skip(self))]
    pub async fn lookup(&self, key: &LookupKey) -> Result<Option<u16>, LookupError> {
        let response = self.query(key).await?;

        match &response.code {
            None => Err(LookupError::MissingCode),
            Some(ResponseCode::SingleMatch) => {
                let code = response.classification_code();
                debug!(?code, sfa = ?response.most_popular_sfa, "single match");
                Ok(code)
            }
            Some(ResponseCode::MultipleWorks) => {
                let Some(owi) = response.first_work_owi.clone() else {
                    debug!("multiple works without a work id");
                    return Ok(None);
                };
                debug!(%owi, "multiple works, re-querying first candidate");
                let work = self.query(&LookupKey::ByWork(owi)).await?;
                let code = work.classification_code();
                debug!(?code, sfa = ?work.most_popular_sfa, "work query answered");
                Ok(code)
            }
            Some(
                code @ (ResponseCode::MissingInput
                | ResponseCode::InvalidInput
                | ResponseCode::NotFound
                | ResponseCode::ServiceError),
            ) => {
                debug!(?code, "lookup unresolved");
                Ok(None)
            }
            Some(ResponseCode::Unknown(code)) => Err(LookupError::UnknownCode { code: code.clone() }),
        }
    }

    /// Resolves one entry: identifier first, title on fallback.
    #[instrument(skip(self, entry), fields(entry_id = %entry.id))]
    pub async fn resolve(&self, entry: &CatalogEntry) -> Option<u16> {
        if let Some(isbn) = format_identifier(&entry.identifier) {
            match self.lookup(&LookupKey::ByIdentifier(isbn)).await {
                Ok(code) => return code,
                Err(e) => warn!(error = %e, "identifier lookup failed, falling back to title"),
            }
        } else {
            debug!("no usable identifier, falling back to title");
        }

        let title = format_title(&entry.title);
        if title.trim().is_empty() {
            debug!("title empty after cleaning");
            return None;
        }

        match self.lookup(&LookupKey::ByTitle(title)).await {
            Ok(code) => code,
            Err(e) => {
                warn!(error = %e, "title lookup failed");
                None
            }
        }
    }

    /// Resolves every entry on a bounded worker pool.
    ///
    /// Every input key is present in the result; keys whose task failed map
    /// to `None`.
    #[instrument(skip_all, fields(entries = entries.len(), concurrency = self.concurrency))]
    pub async fn resolve_all(&self, entries: &[CatalogEntry]) -> BTreeMap<CatalogKey, Option<u16>> {
        let mut results: BTreeMap<CatalogKey, Option<u16>> =
            entries.iter().map(|e| (e.key(), None)).collect();

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut handles = Vec::with_capacity(entries.len());

        for entry in entries {
            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                warn!("classification pool closed unexpectedly");
                break;
            };

            let classifier = self.clone();
            let entry = entry.clone();
            handles.push(tokio::spawn(async move {
                let _permit = permit;
                let code = classifier.resolve(&entry).await;
                (entry.key(), code)
            }));
        }

        for handle in handles {
            match handle.await {
                Ok((key, code)) => {
                    results.insert(key, code);
                }
                Err(e) => warn!(error = %e, "classification task panicked"),
            }
        }

        let resolved = results.values().filter(|c| c.is_some()).count();
        info!(resolved, total = results.len(), "classification complete");
        results
    }
}

/// Expands hundreds into their tens codes: `500` becomes `500, 510, ..., 590`.
#[must_use]
pub fn expand_categories(hundreds: &[u16]) -> Vec<u16> {
    hundreds
        .iter()
        .flat_map(|&base| (0..10u16).filter_map(move |step| base.checked_add(step * 10)))
        .collect()
}

/// Keeps entries whose classification code is in `allowed`.
///
/// An empty allow-list disables the filter. Unclassified entries are dropped
/// whenever the filter is active.
#[must_use]
pub fn filter_by_categories(entries: Vec<CatalogEntry>, allowed: &[u16]) -> Vec<CatalogEntry> {
    if allowed.is_empty() {
        return entries;
    }
    entries
        .into_iter()
        .filter(|entry| {
            entry
                .classification_code
                .is_some_and(|code| allowed.contains(&code))
        })
        .collect()
}
