//! CSV-backed catalog store.
//!
//! The whole table is read, merged in memory, and written back. Two merge
//! policies share the `(id, title)` key space:
//!
//! - [`CatalogStore::build_merge`] keeps the existing row on conflict, so
//!   re-harvesting a window never clobbers statuses already recorded.
//! - [`CatalogStore::status_merge`] keeps the newest row on conflict, so a
//!   fresh transfer result replaces the stale one.
//!
//! Writes go to a temporary sibling that is renamed over the catalog.

use std::collections::HashSet;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use super::entry::{CatalogEntry, CatalogKey, TransferStatus};
use super::error::CatalogError;

/// Default catalog file name.
pub const DEFAULT_CATALOG_FILE: &str = "catalog.csv";

/// Column headers; the leading index column is unnamed.
const HEADERS: [&str; 12] = [
    "",
    "id",
    "author",
    "title",
    "year",
    "language",
    "md5",
    "cover_url",
    "identifier",
    "download_url",
    "classification_code",
    "transfer_status",
];

/// One persisted row.
#[derive(Debug, Serialize, Deserialize)]
struct CatalogRow {
    #[serde(rename = "")]
    index: Option<u64>,
    id: String,
    author: String,
    title: String,
    year: Option<i32>,
    language: String,
    md5: String,
    cover_url: String,
    identifier: String,
    download_url: String,
    classification_code: Option<u16>,
    transfer_status: String,
}

impl CatalogRow {
    fn from_entry(index: u64, entry: &CatalogEntry) -> Result<Self, serde_json::Error> {
        Ok(Self {
            index: Some(index),
            id: entry.id.clone(),
            author: entry.author.clone(),
            title: entry.title.clone(),
            year: entry.year,
            language: entry.language.clone(),
            md5: entry.md5.clone(),
            cover_url: entry.cover_url.clone(),
            identifier: entry.identifier.clone(),
            download_url: entry.download_url.clone(),
            classification_code: entry.classification_code,
            transfer_status: serde_json::to_string(&entry.transfer_status)?,
        })
    }

    fn into_entry(self) -> Result<CatalogEntry, (String, serde_json::Error)> {
        let transfer_status: TransferStatus =
            serde_json::from_str(&self.transfer_status).map_err(|e| (self.id.clone(), e))?;
        Ok(CatalogEntry {
            id: self.id,
            author: self.author,
            title: self.title,
            year: self.year,
            language: self.language,
            md5: self.md5,
            cover_url: self.cover_url,
            identifier: self.identifier,
            download_url: self.download_url,
            classification_code: self.classification_code,
            transfer_status,
        })
    }
}

/// Durable catalog backed by a single CSV file.
#[derive(Debug, Clone)]
pub struct CatalogStore {
    path: PathBuf,
}

impl CatalogStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every persisted entry. A missing file is an empty catalog.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] if the file cannot be read or a row is malformed.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn load(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        if !self.path.exists() {
            debug!("catalog file absent, starting empty");
            return Ok(Vec::new());
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(&self.path)
            .map_err(|e| CatalogError::csv(&self.path, e))?;

        let mut entries = Vec::new();
        for row in reader.deserialize::<CatalogRow>() {
            let row = row.map_err(|e| CatalogError::csv(&self.path, e))?;
            let entry = row.into_entry().map_err(|(id, source)| CatalogError::Status {
                path: self.path.clone(),
                id,
                source,
            })?;
            entries.push(entry);
        }

        debug!(rows = entries.len(), "catalog loaded");
        Ok(entries)
    }

    /// Merges newly built entries into the catalog, keeping existing rows on conflict.
    ///
    /// Returns the number of rows persisted.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] if the catalog cannot be read or written.
    #[instrument(skip(self, new_entries), fields(path = %self.path.display(), new = new_entries.len()))]
    pub fn build_merge(&self, new_entries: Vec<CatalogEntry>) -> Result<usize, CatalogError> {
        let existing = self.load()?;
        let existing_len = existing.len();
        let merged = merge_keep_first(existing.into_iter().chain(new_entries));
        self.write_all(&merged)?;
        info!(
            rows = merged.len(),
            added = merged.len() - existing_len,
            "catalog build merge persisted"
        );
        Ok(merged.len())
    }

    /// Merges updated statuses into the catalog, keeping the newest row on conflict.
    ///
    /// Returns the number of rows persisted.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] if the catalog cannot be read or written.
    #[instrument(skip(self, updated), fields(path = %self.path.display(), updated = updated.len()))]
    pub fn status_merge(&self, updated: Vec<CatalogEntry>) -> Result<usize, CatalogError> {
        let existing = self.load()?;
        let merged = merge_keep_last(existing.into_iter().chain(updated));
        self.write_all(&merged)?;
        info!(rows = merged.len(), "catalog status merge persisted");
        Ok(merged.len())
    }

    fn write_all(&self, entries: &[CatalogEntry]) -> Result<(), CatalogError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| CatalogError::io(parent, e))?;
        }

        let tmp_path = self.temp_path();
        let file = File::create(&tmp_path).map_err(|e| CatalogError::io(&tmp_path, e))?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        writer
            .write_record(HEADERS)
            .map_err(|e| CatalogError::csv(&tmp_path, e))?;

        for (index, entry) in (0u64..).zip(entries) {
            let row = CatalogRow::from_entry(index, entry).map_err(|source| CatalogError::Status {
                path: tmp_path.clone(),
                id: entry.id.clone(),
                source,
            })?;
            writer
                .serialize(row)
                .map_err(|e| CatalogError::csv(&tmp_path, e))?;
        }

        let file = writer
            .into_inner()
            .map_err(|e| CatalogError::io(&tmp_path, e.into_error()))?;
        file.sync_all().map_err(|e| CatalogError::io(&tmp_path, e))?;
        drop(file);

        fs::rename(&tmp_path, &self.path).map_err(|e| CatalogError::io(&self.path, e))?;
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map_or_else(|| DEFAULT_CATALOG_FILE.into(), |n| n.to_string_lossy().into_owned());
        self.path.with_file_name(format!(".{file_name}.tmp"))
    }
}

/// Dedupes on `(id, title)`, keeping the first occurrence in input order.
pub fn merge_keep_first(rows: impl IntoIterator<Item = CatalogEntry>) -> Vec<CatalogEntry> {
    let mut seen: HashSet<CatalogKey> = HashSet::new();
    rows.into_iter()
        .filter(|entry| seen.insert(entry.key()))
        .collect()
}

/// Dedupes on `(id, title)`, keeping the last occurrence at its position.
pub fn merge_keep_last(rows: impl IntoIterator<Item = CatalogEntry>) -> Vec<CatalogEntry> {
    let rows: Vec<CatalogEntry> = rows.into_iter().collect();
    let mut kept = merge_keep_first(rows.into_iter().rev());
    kept.reverse();
    kept
}
