//! Conversion of raw metadata records into catalog entries.
//!
//! Normalization coerces the loosely typed service fields, lowercases the
//! language, stamps the initial transfer status and derives the download URL:
//!
//! ```text
//! <base><id_group>/<md5 lowercase>/<urlencode(truncate("author - title (year)", 200))>.pdf
//! ```

use std::ops::RangeInclusive;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use super::entry::{CatalogEntry, TransferStatus, status_timestamp};
use crate::download::truncate_chars;
use crate::metadata::RawRecord;

/// Default base for document download links.
pub const DEFAULT_DOWNLOAD_BASE_URL: &str = "http://31.42.184.140/main/";

/// Substituted when no id group can be read from the cover reference.
pub const ID_GROUP_SENTINEL: &str = "FIXISSUE";

/// Hard limit on the document segment of the link, in characters.
const LINK_NAME_LIMIT: usize = 200;

#[allow(clippy::expect_used)]
static ID_GROUP_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9]{1,7}").expect("id group regex is valid") // Static pattern, safe to panic
});

/// Converts raw records into catalog entries.
///
/// Every entry of the batch gets the same initial-status timestamp.
#[must_use]
pub fn normalize(records: Vec<RawRecord>, base_url: &str) -> Vec<CatalogEntry> {
    let timestamp = status_timestamp();
    let entries: Vec<CatalogEntry> = records
        .into_iter()
        .map(|record| normalize_record(record, base_url, &timestamp))
        .collect();
    debug!(entries = entries.len(), "records normalized");
    entries
}

fn normalize_record(record: RawRecord, base_url: &str, timestamp: &str) -> CatalogEntry {
    let id = record.id.unwrap_or_default();
    let author = record.author.unwrap_or_default();
    let title = record.title.unwrap_or_default();
    let year = coerce_year(record.year.as_deref());
    let md5 = record.md5.unwrap_or_default();
    let cover_url = record.coverurl.unwrap_or_default();

    let id_group = extract_id_group(&cover_url);
    let download_url = build_download_url(base_url, &id_group, &md5, &author, &title, year);

    CatalogEntry {
        id,
        author,
        title,
        year,
        language: record.language.unwrap_or_default().to_lowercase(),
        md5,
        cover_url,
        identifier: record.identifier.unwrap_or_default(),
        download_url,
        classification_code: None,
        transfer_status: TransferStatus::initial(timestamp),
    }
}

/// Coerces a year field to an integer, flooring numeric strings.
///
/// Missing, non-numeric, and out-of-range values become `None`.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn coerce_year(raw: Option<&str>) -> Option<i32> {
    let value: f64 = raw?.trim().parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    let floored = value.floor();
    if floored < f64::from(i32::MIN) || floored > f64::from(i32::MAX) {
        return None;
    }
    Some(floored as i32)
}

/// Returns the first run of up to seven digits in a cover reference.
///
/// Falls back to [`ID_GROUP_SENTINEL`] and logs the anomaly.
#[must_use]
pub fn extract_id_group(cover_url: &str) -> String {
    if let Some(found) = ID_GROUP_PATTERN.find(cover_url) {
        found.as_str().to_string()
    } else {
        warn!(cover_url, "no id group in cover reference");
        ID_GROUP_SENTINEL.to_string()
    }
}

/// Builds the direct download link for a document.
#[must_use]
pub fn build_download_url(
    base_url: &str,
    id_group: &str,
    md5: &str,
    author: &str,
    title: &str,
    year: Option<i32>,
) -> String {
    let year = year.map_or_else(|| "None".to_string(), |y| y.to_string());
    let name = format!("{author} - {title} ({year})").replace(';', "");
    let encoded = encode_keeping_slashes(truncate_chars(&name, LINK_NAME_LIMIT));
    format!("{base_url}{id_group}/{}/{encoded}.pdf", md5.to_lowercase())
}

/// Percent-encodes each `/`-separated piece and keeps the separators literal.
fn encode_keeping_slashes(name: &str) -> String {
    name.split('/')
        .map(|piece| urlencoding::encode(piece).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Keeps entries whose year lies in `years` and whose language matches.
///
/// The language argument is lowercased before comparison; entries without a
/// year are dropped.
#[must_use]
pub fn filter_entries(
    entries: Vec<CatalogEntry>,
    years: &RangeInclusive<i32>,
    language: &str,
) -> Vec<CatalogEntry> {
    let language = language.to_lowercase();
    let before = entries.len();
    let kept: Vec<CatalogEntry> = entries
        .into_iter()
        .filter(|entry| entry.year.is_some_and(|y| years.contains(&y)))
        .filter(|entry| entry.language == language)
        .collect();
    debug!(before, after = kept.len(), %language, "year/language filter applied");
    kept
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn record(year: &str, language: &str) -> RawRecord {
        RawRecord {
            id: Some("42".into()),
            author: Some("A. Smith".into()),
            title: Some("Intro to Widgets".into()),
            year: Some(year.into()),
            language: Some(language.into()),
            md5: Some("ABC123".into()),
            coverurl: Some("cover/4821/x.jpg".into()),
            identifier: Some("9780306406157".into()),
        }
    }

    #[test]
    fn test_coerce_year() {
        assert_eq!(coerce_year(Some("2020")), Some(2020));
        assert_eq!(coerce_year(Some("2020.7")), Some(2020));
        assert_eq!(coerce_year(Some(" 1999 ")), Some(1999));
        assert_eq!(coerce_year(Some("")), None);
        assert_eq!(coerce_year(Some("19xx")), None);
        assert_eq!(coerce_year(Some("NaN")), None);
        assert_eq!(coerce_year(Some("1e12")), None);
        assert_eq!(coerce_year(None), None);
    }

    #[test]
    fn test_extract_id_group() {
        assert_eq!(extract_id_group("cover/4821/x.jpg"), "4821");
        assert_eq!(extract_id_group("covers/123456789/a.jpg"), "1234567");
        assert_eq!(extract_id_group("no digits here"), ID_GROUP_SENTINEL);
        assert_eq!(extract_id_group(""), ID_GROUP_SENTINEL);
    }

    #[test]
    fn test_download_url_example() {
        let url = build_download_url(
            DEFAULT_DOWNLOAD_BASE_URL,
            "4821",
            "ABC123",
            "A. Smith",
            "Intro to Widgets",
            Some(2020),
        );
        assert_eq!(
            url,
            "http://31.42.184.140/main/4821/abc123/A.%20Smith%20-%20Intro%20to%20Widgets%20%282020%29.pdf"
        );
    }

    #[test]
    fn test_download_url_strips_semicolons_and_missing_year() {
        let url = build_download_url("http://h/", "1", "ff", "A;B", "T", None);
        assert!(url.ends_with("/1/ff/AB%20-%20T%20%28None%29.pdf"), "{url}");
    }

    #[test]
    fn test_download_url_keeps_slashes_in_title() {
        let url = build_download_url("http://h/", "1", "ff", "A", "Input/Output", Some(2020));
        assert_eq!(url, "http://h/1/ff/A%20-%20Input/Output%20%282020%29.pdf");
    }

    #[test]
    fn test_download_url_name_segment_is_truncated() {
        let title = "é".repeat(500);
        let url = build_download_url("http://h/", "1", "ff", "A", &title, Some(2000));
        let segment = url
            .trim_start_matches("http://h/1/ff/")
            .trim_end_matches(".pdf");
        let decoded = urlencoding::decode(segment).unwrap();
        assert_eq!(decoded.chars().count(), 200);
        assert!(decoded.starts_with("A - é"));
    }

    #[test]
    fn test_normalize_example_record() {
        let entries = normalize(vec![record("2020", "English")], DEFAULT_DOWNLOAD_BASE_URL);
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.language, "english");
        assert_eq!(entry.year, Some(2020));
        assert!(
            entry
                .download_url
                .ends_with("/4821/abc123/A.%20Smith%20-%20Intro%20to%20Widgets%20%282020%29.pdf")
        );
        assert!(!entry.transfer_status.succeeded);
        assert!(entry.transfer_status.message.starts_with("initial link creation @"));
        assert_eq!(entry.classification_code, None);
    }

    #[test]
    fn test_normalize_missing_fields_do_not_fail() {
        let entries = normalize(vec![RawRecord::default()], "http://h/");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].year, None);
        assert!(entries[0].download_url.starts_with("http://h/FIXISSUE/"));
    }

    #[test]
    fn test_filter_entries_by_year_and_language() {
        let entries = normalize(
            vec![
                record("2017", "english"),
                record("2018", "English"),
                record("2019.4", "english"),
                record("2020", "english"),
                record("2018", "german"),
                record("", "english"),
            ],
            "http://h/",
        );
        let kept = filter_entries(entries, &(2018..=2019), "ENGLISH");
        let years: Vec<_> = kept.iter().map(|e| e.year).collect();
        assert_eq!(years, vec![Some(2018), Some(2019)]);
    }
}
