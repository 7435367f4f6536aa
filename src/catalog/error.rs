//! Error types for catalog persistence.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading or writing the catalog file.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// File system error on the catalog or its temporary sibling.
    #[error("IO error on catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed CSV row or header.
    #[error("CSV error in catalog {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A `transfer_status` cell that is not a `[bool, "message"]` array.
    #[error("invalid transfer status for entry {id} in {path}: {source}")]
    Status {
        path: PathBuf,
        id: String,
        #[source]
        source: serde_json::Error,
    },
}

impl CatalogError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }
}
