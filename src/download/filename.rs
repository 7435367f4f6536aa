//! Document naming and filename sanitization.
//!
//! Archive keys and local files share one naming scheme built from the
//! catalog entry: `author - title (year)`, sanitized so the result is a
//! single safe path segment. The `.pdf` extension is appended by the writer.

/// Characters replaced with `_` in document names.
const FORBIDDEN_CHARS: [char; 10] = ['\\', '/', ':', '*', '?', '"', '<', '>', '|', ';'];

/// Fragments removed wherever they appear.
const STRIPPED_FRAGMENTS: [&str; 2] = ["(None) - ", ".pdf"];

/// Prefixes removed from the start of the name, longest first.
const STRIPPED_PREFIXES: [&str; 2] = ["; - ", "; "];

/// Maximum characters kept from author and title when building a name.
const NAME_PART_LIMIT: usize = 100;

/// Builds the sanitized document name for an entry.
///
/// Author and title are each truncated to 100 characters. A missing year
/// renders as `None`.
#[must_use]
pub fn document_name(author: &str, title: &str, year: Option<i32>) -> String {
    let year = year.map_or_else(|| "None".to_string(), |y| y.to_string());
    let raw = format!(
        "{} - {} ({year})",
        truncate_chars(author, NAME_PART_LIMIT),
        truncate_chars(title, NAME_PART_LIMIT)
    );
    sanitize_document_name(&raw)
}

/// Sanitizes a document name for use as an object key or filename.
///
/// Removes every `(None) - ` and `.pdf` fragment, a leading `; - ` or `; `,
/// then replaces each of `\ / : * ? " < > | ;` with `_`. The function is
/// idempotent.
#[must_use]
pub fn sanitize_document_name(name: &str) -> String {
    let mut current = name.to_string();
    // Removing one fragment can splice together another, so run to a fixpoint.
    loop {
        let mut next = current.clone();
        for fragment in STRIPPED_FRAGMENTS {
            next = next.replace(fragment, "");
        }
        if next == current {
            break;
        }
        current = next;
    }

    for prefix in STRIPPED_PREFIXES {
        if let Some(rest) = current.strip_prefix(prefix) {
            current = rest.to_string();
            break;
        }
    }

    current
        .chars()
        .map(|c| if FORBIDDEN_CHARS.contains(&c) { '_' } else { c })
        .collect()
}

/// Returns at most `limit` characters of `value`.
pub(crate) fn truncate_chars(value: &str, limit: usize) -> &str {
    match value.char_indices().nth(limit) {
        Some((index, _)) => &value[..index],
        None => value,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_replaces_every_forbidden_char() {
        let sanitized = sanitize_document_name(r#"a\b/c:d*e?f"g<h>i|j;k"#);
        assert_eq!(sanitized, "a_b_c_d_e_f_g_h_i_j_k");
        assert!(!sanitized.chars().any(|c| FORBIDDEN_CHARS.contains(&c)));
    }

    #[test]
    fn test_sanitize_strips_none_author_prefix() {
        assert_eq!(
            sanitize_document_name("(None) - Intro to Widgets (2020)"),
            "Intro to Widgets (2020)"
        );
    }

    #[test]
    fn test_sanitize_strips_pdf_suffix() {
        assert_eq!(sanitize_document_name("Widgets (2020).pdf"), "Widgets (2020)");
    }

    #[test]
    fn test_sanitize_strips_leading_semicolon_forms() {
        assert_eq!(sanitize_document_name("; - Widgets"), "Widgets");
        assert_eq!(sanitize_document_name("; Widgets"), "Widgets");
        assert_eq!(sanitize_document_name("Smith; Jones"), "Smith_ Jones");
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let inputs = [
            "(None) - A/B: C? (2020).pdf",
            "; - x;y",
            "(No(None) - ne) - Title",
            ".p.pdfdf",
            "plain name (1999)",
            "; ; - nested",
            "",
        ];
        for input in inputs {
            let once = sanitize_document_name(input);
            let twice = sanitize_document_name(&once);
            assert_eq!(once, twice, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn test_sanitize_spliced_fragments_are_removed() {
        assert_eq!(sanitize_document_name("(No(None) - ne) - Title"), "Title");
        assert_eq!(sanitize_document_name("x.p.pdfdf"), "x");
    }

    #[test]
    fn test_document_name_formats_entry() {
        assert_eq!(
            document_name("A. Smith", "Intro to Widgets", Some(2020)),
            "A. Smith - Intro to Widgets (2020)"
        );
    }

    #[test]
    fn test_document_name_truncates_parts() {
        let author = "a".repeat(150);
        let title = "t".repeat(150);
        let name = document_name(&author, &title, Some(2001));
        assert_eq!(name, format!("{} - {} (2001)", "a".repeat(100), "t".repeat(100)));
    }

    #[test]
    fn test_document_name_missing_year() {
        assert_eq!(document_name("X", "Y", None), "X - Y (None)");
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("日本語テキスト", 3), "日本語");
        assert_eq!(truncate_chars("short", 10), "short");
    }
}
