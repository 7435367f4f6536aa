//! Lookup keys and the input cleaning applied before a query.

use std::sync::LazyLock;

use regex::Regex;

/// 10- or 13-digit identifier, or the hyphenated `ddd-d-ddd-ddddd-d` form.
#[allow(clippy::expect_used)]
static IDENTIFIER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{10}(\d{3})?|(\d{3}-\d{1}-\d{3}-\d{5}-\d{1})")
        .expect("identifier regex is valid") // Static pattern, safe to panic
});

#[allow(clippy::expect_used)]
static NON_ALPHANUMERIC_RUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^a-zA-Z0-9]+").expect("non-alphanumeric regex is valid") // Static pattern, safe to panic
});

/// Marker left behind by a possessive once punctuation is stripped.
const POSSESSIVE_MARKER: &str = " s ";

/// What a classification query is keyed on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupKey {
    /// Cleaned ISBN, digits only.
    ByIdentifier(String),
    /// Cleaned title phrase.
    ByTitle(String),
    /// Work id taken from a multiple-works response.
    ByWork(String),
}

impl LookupKey {
    /// Query string for this key, without the leading `?`.
    #[must_use]
    pub fn query(&self) -> String {
        match self {
            Self::ByIdentifier(value) => format!("isbn={value}"),
            Self::ByTitle(value) => format!("title={}", urlencoding::encode(value)),
            Self::ByWork(value) => format!("owi={}", urlencoding::encode(value)),
        }
    }
}

/// Extracts the first identifier from a raw identifier field, digits only.
#[must_use]
pub fn format_identifier(raw: &str) -> Option<String> {
    let found = IDENTIFIER_PATTERN.find(raw)?;
    Some(
        found
            .as_str()
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .collect(),
    )
}

/// Cleans a title for a title query.
///
/// Runs of non-alphanumerics collapse to one space. When a possessive marker
/// splits the result, the longer of the first two fragments is kept and its
/// last token dropped, since titles in the source are often cut mid-word.
#[must_use]
pub fn format_title(title: &str) -> String {
    let cleaned = NON_ALPHANUMERIC_RUN.replace_all(title, " ").into_owned();

    let fragments: Vec<&str> = cleaned.split(POSSESSIVE_MARKER).collect();
    let [first, second, ..] = fragments.as_slice() else {
        return cleaned;
    };

    let longer = if first.len() > second.len() { first } else { second };
    let tokens: Vec<&str> = longer.split(' ').collect();
    tokens[..tokens.len().saturating_sub(1)].join(" ")
}
