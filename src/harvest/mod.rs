//! Catalog build pipeline.
//!
//! For each year of the requested range the harvester pages through the
//! metadata service. Every page flows through the same stages:
//!
//! ```text
//! fetch -> normalize -> year/language filter -> classify -> category filter -> build merge
//! ```
//!
//! A page shorter than the page size ends the year. The short page itself is
//! still processed.

use std::ops::RangeInclusive;

use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::catalog::{
    CatalogError, CatalogStore, DEFAULT_DOWNLOAD_BASE_URL, filter_entries, normalize,
};
use crate::classify::{Classifier, DEFAULT_CATEGORIES, expand_categories, filter_by_categories};
use crate::metadata::{MetadataClient, MetadataError, PageRequest, RawRecord, YearWindow};

/// Errors that stop a harvest.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("invalid year range {start}..={end}")]
    InvalidYearRange { start: i32, end: i32 },

    #[error("page size must be at least 1")]
    InvalidPageSize,

    #[error("metadata error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

/// Settings for one harvest run.
#[derive(Debug, Clone)]
pub struct HarvestOptions {
    pub start_year: i32,
    /// Inclusive.
    pub end_year: i32,
    pub language: String,
    /// Offset of the first page in each year.
    pub starting_limit: u64,
    /// Page size, and the step between page offsets.
    pub max_limit: u64,
    /// Category allow-list in hundreds; empty disables the filter.
    pub categories: Vec<u16>,
    pub download_base_url: String,
}

impl Default for HarvestOptions {
    fn default() -> Self {
        Self {
            start_year: 2018,
            end_year: 2019,
            language: "english".to_string(),
            starting_limit: 1,
            max_limit: 10_000,
            categories: DEFAULT_CATEGORIES.to_vec(),
            download_base_url: DEFAULT_DOWNLOAD_BASE_URL.to_string(),
        }
    }
}

impl HarvestOptions {
    fn years(&self) -> RangeInclusive<i32> {
        self.start_year..=self.end_year
    }
}

/// Counts from a harvest run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HarvestReport {
    pub pages: usize,
    pub records_fetched: usize,
    /// Entries that passed every filter and were offered to the catalog.
    pub entries_kept: usize,
    /// Catalog size after the last merge.
    pub catalog_rows: usize,
}

/// Drives the catalog build.
#[derive(Debug)]
pub struct Harvester {
    metadata: MetadataClient,
    classifier: Classifier,
    catalog: CatalogStore,
    options: HarvestOptions,
    allowed_categories: Vec<u16>,
}

impl Harvester {
    /// Creates a harvester.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError`] for an empty year range or a zero page size.
    pub fn new(
        metadata: MetadataClient,
        classifier: Classifier,
        catalog: CatalogStore,
        options: HarvestOptions,
    ) -> Result<Self, HarvestError> {
        if options.start_year > options.end_year {
            return Err(HarvestError::InvalidYearRange {
                start: options.start_year,
                end: options.end_year,
            });
        }
        if options.max_limit == 0 {
            return Err(HarvestError::InvalidPageSize);
        }

        let allowed_categories = expand_categories(&options.categories);
        Ok(Self {
            metadata,
            classifier,
            catalog,
            options,
            allowed_categories,
        })
    }

    /// Harvests every year of the range into the catalog.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError`] if a page cannot be decoded or the catalog
    /// cannot be read or written.
    #[instrument(skip(self), fields(start_year = self.options.start_year, end_year = self.options.end_year))]
    pub async fn run(&self) -> Result<HarvestReport, HarvestError> {
        let mut report = HarvestReport::default();

        for year in self.options.years() {
            let window = YearWindow::for_year(year)?;
            let mut offset = self.options.starting_limit;
            info!(year, "harvesting year");

            loop {
                let request = PageRequest {
                    offset,
                    limit: self.options.max_limit,
                    window,
                };
                let records = self.metadata.fetch_page(&request).await?;
                let fetched = records.len();
                report.pages += 1;
                report.records_fetched += fetched;
                debug!(year, offset, fetched, "page received");

                if fetched > 0 {
                    let (kept, rows) = self.process_page(records).await?;
                    report.entries_kept += kept;
                    if let Some(rows) = rows {
                        report.catalog_rows = rows;
                    }
                }

                if u64::try_from(fetched).unwrap_or(u64::MAX) < self.options.max_limit {
                    break;
                }
                offset = offset.saturating_add(self.options.max_limit);
            }
        }

        info!(
            pages = report.pages,
            records = report.records_fetched,
            kept = report.entries_kept,
            catalog_rows = report.catalog_rows,
            "harvest complete"
        );
        Ok(report)
    }

    /// Runs one page through the pipeline; returns entries kept and the
    /// catalog size when a merge happened.
    async fn process_page(
        &self,
        records: Vec<RawRecord>,
    ) -> Result<(usize, Option<usize>), HarvestError> {
        let entries = normalize(records, &self.options.download_base_url);
        let mut entries = filter_entries(entries, &self.options.years(), &self.options.language);
        if entries.is_empty() {
            return Ok((0, None));
        }

        let codes = self.classifier.resolve_all(&entries).await;
        for entry in &mut entries {
            entry.classification_code = codes.get(&entry.key()).copied().flatten();
        }

        let entries = filter_by_categories(entries, &self.allowed_categories);
        let kept = entries.len();
        if kept == 0 {
            debug!("no entries left after category filter");
            return Ok((0, None));
        }

        let rows = self.catalog.build_merge(entries)?;
        Ok((kept, Some(rows)))
    }
}
