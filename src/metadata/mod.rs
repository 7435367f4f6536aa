//! Paginated fetcher for the remote metadata service.
//!
//! One call fetches one page of raw records for a publication-date window.
//! The service is polled every second until it answers with a success
//! status; callers advance the offset while pages come back full and stop
//! at the first short page.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::download::{DownloadError, HttpClient, RetryPolicy, classify_error_any_status, run_with_retry};

/// Default metadata service endpoint.
pub const DEFAULT_METADATA_URL: &str = "https://libgen.rs/json.php";

/// Fields requested from the service, in query order.
const REQUESTED_FIELDS: &str = "id,author,title,year,Language,md5,coverurl,identifier";

/// Errors raised by the metadata fetcher.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// The request failed with an error that polling cannot fix.
    #[error("metadata request failed for {url}: {source}")]
    Request {
        /// Page URL.
        url: String,
        /// Underlying HTTP error.
        #[source]
        source: DownloadError,
    },

    /// A success response whose body is not a JSON array of records.
    #[error("metadata response from {url} is not a record list: {source}")]
    Decode {
        /// Page URL.
        url: String,
        /// Underlying decode error.
        #[source]
        source: serde_json::Error,
    },

    /// A year outside the calendar range chrono can represent.
    #[error("year {year} cannot be used as a query window")]
    InvalidYear {
        /// The offending year.
        year: i32,
    },
}

/// One record as returned by the metadata service.
///
/// The service is loose about types (years arrive as strings or numbers,
/// fields go missing), so every field is an optional string here and the
/// normalizer does the coercion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub author: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub year: Option<String>,
    #[serde(default, alias = "Language", deserialize_with = "lenient_string")]
    pub language: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub md5: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub coverurl: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub identifier: Option<String>,
}

/// Accepts a string, a number, or null.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    })
}

/// Record-time window sent as `timefirst` / `timelast`.
///
/// The service selects on when a record was last modified, not on its
/// publication year. Publication years are filtered after normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearWindow {
    pub first: NaiveDate,
    pub last: NaiveDate,
}

impl YearWindow {
    /// Window covering one calendar year: Jan 1 of `year` to Jan 1 of `year + 1`.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError::InvalidYear`] when either date is out of range.
    pub fn for_year(year: i32) -> Result<Self, MetadataError> {
        let first = NaiveDate::from_ymd_opt(year, 1, 1);
        let last = year
            .checked_add(1)
            .and_then(|next| NaiveDate::from_ymd_opt(next, 1, 1));
        match (first, last) {
            (Some(first), Some(last)) => Ok(Self { first, last }),
            _ => Err(MetadataError::InvalidYear { year }),
        }
    }

    /// The calendar year the window starts in.
    #[must_use]
    pub fn year(&self) -> i32 {
        self.first.year()
    }
}

/// Cursor for one page: `limit` records starting at `offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: u64,
    pub limit: u64,
    pub window: YearWindow,
}

/// Client for the metadata service.
#[derive(Debug, Clone)]
pub struct MetadataClient {
    http: HttpClient,
    base_url: String,
    poll_policy: RetryPolicy,
}

impl MetadataClient {
    /// Creates a client against the default endpoint.
    #[must_use]
    pub fn new(http: HttpClient) -> Self {
        Self::with_base_url(http, DEFAULT_METADATA_URL)
    }

    /// Creates a client against a custom endpoint (used by tests and config).
    #[must_use]
    pub fn with_base_url(http: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            poll_policy: RetryPolicy::metadata_poll(),
        }
    }

    /// Replaces the polling policy.
    #[must_use]
    pub fn with_poll_policy(mut self, policy: RetryPolicy) -> Self {
        self.poll_policy = policy;
        self
    }

    /// Builds the query URL for one page.
    #[must_use]
    pub fn page_url(&self, request: &PageRequest) -> String {
        format!(
            "{}?fields={REQUESTED_FIELDS}&limit1={}&limit2={}&mode=last&timefirst={}&timelast={}",
            self.base_url,
            request.offset,
            request.limit,
            request.window.first.format("%Y-%m-%d"),
            request.window.last.format("%Y-%m-%d"),
        )
    }

    /// Fetches one page of raw records.
    ///
    /// Non-success statuses and transport errors are polled under the
    /// client's policy (forever by default). The returned list holds at most
    /// `request.limit` records; a shorter list marks the end of the window.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError::Decode`] if the body is not a record list and
    /// [`MetadataError::Request`] if polling gives up.
    #[instrument(skip(self), fields(offset = request.offset, limit = request.limit, year = request.window.year()))]
    pub async fn fetch_page(&self, request: &PageRequest) -> Result<Vec<RawRecord>, MetadataError> {
        let url = self.page_url(request);

        let (body, attempts) = run_with_retry(
            &self.poll_policy,
            classify_error_any_status,
            &url,
            |_| self.http.fetch_text(&url),
        )
        .await
        .map_err(|(source, _)| MetadataError::Request {
            url: url.clone(),
            source,
        })?;

        let records: Vec<RawRecord> =
            serde_json::from_str(&body).map_err(|source| MetadataError::Decode {
                url: url.clone(),
                source,
            })?;

        debug!(records = records.len(), attempts, "metadata page fetched");
        Ok(records)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_year_window_spans_one_year() {
        let window = YearWindow::for_year(2018).unwrap();
        assert_eq!(window.first.to_string(), "2018-01-01");
        assert_eq!(window.last.to_string(), "2019-01-01");
        assert_eq!(window.year(), 2018);
    }

    #[test]
    fn test_year_window_rejects_out_of_range_year() {
        assert!(matches!(
            YearWindow::for_year(i32::MAX),
            Err(MetadataError::InvalidYear { .. })
        ));
    }

    #[test]
    fn test_page_url_layout() {
        let client = MetadataClient::with_base_url(HttpClient::for_services(), "http://meta.test/json.php");
        let request = PageRequest {
            offset: 1,
            limit: 500,
            window: YearWindow::for_year(2018).unwrap(),
        };
        assert_eq!(
            client.page_url(&request),
            "http://meta.test/json.php?fields=id,author,title,year,Language,md5,coverurl,identifier\
             &limit1=1&limit2=500&mode=last&timefirst=2018-01-01&timelast=2019-01-01"
        );
    }

    #[test]
    fn test_raw_record_accepts_loose_types() {
        let json = r#"[{"id":"7","author":"A","title":"T","year":2019,"Language":"English","md5":"ff","coverurl":null}]"#;
        let records: Vec<RawRecord> = serde_json::from_str(json).unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.year.as_deref(), Some("2019"));
        assert_eq!(record.language.as_deref(), Some("English"));
        assert_eq!(record.coverurl, None);
        assert_eq!(record.identifier, None);
    }
}
