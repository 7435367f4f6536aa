//! Catalog entry types.

use chrono::Local;
use serde::{Deserialize, Serialize};

/// Timestamp layout used in every status message.
pub const TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// Current local time formatted for status messages.
#[must_use]
pub fn status_timestamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Composite key that identifies an entry in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CatalogKey {
    pub id: String,
    pub title: String,
}

/// Outcome of the most recent transfer attempt for an entry.
///
/// Persisted as a two-element JSON array: `[false,"message"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(bool, String)", into = "(bool, String)")]
pub struct TransferStatus {
    pub succeeded: bool,
    pub message: String,
}

impl TransferStatus {
    /// Status given to every entry when it is first added to the catalog.
    #[must_use]
    pub fn initial(timestamp: &str) -> Self {
        Self::failed(format!("initial link creation @{timestamp}"))
    }

    #[must_use]
    pub fn succeeded(message: impl Into<String>) -> Self {
        Self {
            succeeded: true,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            message: message.into(),
        }
    }
}

impl From<(bool, String)> for TransferStatus {
    fn from((succeeded, message): (bool, String)) -> Self {
        Self { succeeded, message }
    }
}

impl From<TransferStatus> for (bool, String) {
    fn from(status: TransferStatus) -> Self {
        (status.succeeded, status.message)
    }
}

/// One bibliographic record with its derived download link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub id: String,
    pub author: String,
    pub title: String,
    /// Publication year; absent when the source value was missing or invalid.
    pub year: Option<i32>,
    /// Lowercased language name.
    pub language: String,
    pub md5: String,
    pub cover_url: String,
    /// Raw identifier list (ISBNs) from the metadata service.
    pub identifier: String,
    /// Built once during normalization, never rewritten.
    pub download_url: String,
    /// Subject code at tens granularity, e.g. `510`.
    pub classification_code: Option<u16>,
    pub transfer_status: TransferStatus,
}

impl CatalogEntry {
    #[must_use]
    pub fn key(&self) -> CatalogKey {
        CatalogKey {
            id: self.id.clone(),
            title: self.title.clone(),
        }
    }

    /// Returns a copy carrying a new transfer status.
    #[must_use]
    pub fn with_status(&self, status: TransferStatus) -> Self {
        Self {
            transfer_status: status,
            ..self.clone()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_status_serializes_as_json_array() {
        let status = TransferStatus::failed("initial link creation @01/02/2020 10:00:00");
        let json = serde_json::to_string(&status).unwrap();
        assert_eq!(json, r#"[false,"initial link creation @01/02/2020 10:00:00"]"#);

        let parsed: TransferStatus = serde_json::from_str(r#"[true,"ok"]"#).unwrap();
        assert_eq!(parsed, TransferStatus::succeeded("ok"));
    }

    #[test]
    fn test_initial_status_is_not_succeeded() {
        let status = TransferStatus::initial("01/01/2021 00:00:00");
        assert!(!status.succeeded);
        assert_eq!(status.message, "initial link creation @01/01/2021 00:00:00");
    }

    #[test]
    fn test_status_timestamp_layout() {
        let ts = status_timestamp();
        assert!(chrono::NaiveDateTime::parse_from_str(&ts, TIMESTAMP_FORMAT).is_ok(), "{ts}");
    }

    #[test]
    fn test_catalog_key_orders_by_id_then_title() {
        let a = CatalogKey { id: "1".into(), title: "b".into() };
        let b = CatalogKey { id: "1".into(), title: "c".into() };
        let c = CatalogKey { id: "2".into(), title: "a".into() };
        assert!(a < b && b < c);
    }
}
