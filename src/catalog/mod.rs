//! Catalog entries, record normalization, and the durable CSV store.
//!
//! Entries are keyed by `(id, title)`. They are created by the harvest
//! pipeline, tagged with a classification code, and afterwards only their
//! transfer status changes.

mod entry;
mod error;
pub mod normalizer;
mod store;

pub use entry::{CatalogEntry, CatalogKey, TIMESTAMP_FORMAT, TransferStatus, status_timestamp};
pub use error::CatalogError;
pub use normalizer::{
    DEFAULT_DOWNLOAD_BASE_URL, ID_GROUP_SENTINEL, build_download_url, coerce_year,
    extract_id_group, filter_entries, normalize,
};
pub use store::{CatalogStore, DEFAULT_CATALOG_FILE, merge_keep_first, merge_keep_last};
