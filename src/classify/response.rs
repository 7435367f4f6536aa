//! Attribute extraction from classification service responses.
//!
//! Only three attributes matter, so they are pulled out with anchored
//! patterns rather than a full XML parse:
//!
//! - `response/@code`
//! - `recommendations/ddc/mostPopular/@sfa`
//! - `works/work[0]/@owi`

use std::sync::LazyLock;

use regex::Regex;

#[allow(clippy::expect_used)]
static RESPONSE_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<response\b[^>]*\bcode="([^"]*)""#).expect("response code regex is valid") // Static pattern, safe to panic
});

#[allow(clippy::expect_used)]
static RECOMMENDATIONS_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<recommendations\b[^>]*>(.*?)</recommendations>")
        .expect("recommendations regex is valid") // Static pattern, safe to panic
});

#[allow(clippy::expect_used)]
static DDC_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<ddc\b[^>]*>(.*?)</ddc>").expect("ddc regex is valid") // Static pattern, safe to panic
});

#[allow(clippy::expect_used)]
static MOST_POPULAR_SFA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<mostPopular\b[^>]*\bsfa="([^"]*)""#).expect("mostPopular regex is valid") // Static pattern, safe to panic
});

#[allow(clippy::expect_used)]
static WORKS_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<works\b[^>]*>(.*?)</works>").expect("works regex is valid") // Static pattern, safe to panic
});

#[allow(clippy::expect_used)]
static WORK_OWI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<work\b[^>]*\bowi="([^"]*)""#).expect("work regex is valid") // Static pattern, safe to panic
});

/// Service response codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ResponseCode {
    /// `2`: one confident match.
    SingleMatch,
    /// `4`: several candidate works.
    MultipleWorks,
    /// `100`: no input.
    MissingInput,
    /// `101`: invalid input.
    InvalidInput,
    /// `102`: no data for the input.
    NotFound,
    /// `200`: unexpected service error.
    ServiceError,
    Unknown(String),
}

impl ResponseCode {
    fn parse(code: &str) -> Self {
        match code {
            "2" => Self::SingleMatch,
            "4" => Self::MultipleWorks,
            "100" => Self::MissingInput,
            "101" => Self::InvalidInput,
            "102" => Self::NotFound,
            "200" => Self::ServiceError,
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// The attributes of one response the resolver acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ClassifyResponse {
    pub code: Option<ResponseCode>,
    pub most_popular_sfa: Option<String>,
    pub first_work_owi: Option<String>,
}

impl ClassifyResponse {
    pub fn parse(body: &str) -> Self {
        let code = RESPONSE_CODE
            .captures(body)
            .map(|c| ResponseCode::parse(&c[1]));

        let most_popular_sfa = RECOMMENDATIONS_BLOCK
            .captures(body)
            .and_then(|rec| DDC_BLOCK.captures(rec.get(1)?.as_str()).and_then(|ddc| ddc.get(1)))
            .and_then(|ddc| MOST_POPULAR_SFA.captures(ddc.as_str()))
            .map(|c| c[1].to_string());

        let first_work_owi = WORKS_BLOCK
            .captures(body)
            .and_then(|works| works.get(1))
            .and_then(|works| WORK_OWI.captures(works.as_str()))
            .map(|c| c[1].to_string());

        Self {
            code,
            most_popular_sfa,
            first_work_owi,
        }
    }

    /// Classification code from the most-popular recommendation, if any.
    pub fn classification_code(&self) -> Option<u16> {
        self.most_popular_sfa.as_deref().and_then(classification_from_sfa)
    }
}

/// Reduces a classification number to tens granularity.
///
/// The first two characters are kept and a `0` appended, so `"512.345"`
/// becomes `510`. Empty values and anything that does not read as a number
/// are `None`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn classification_from_sfa(sfa: &str) -> Option<u16> {
    let prefix: String = sfa.chars().take(2).collect();
    if prefix.is_empty() {
        return None;
    }
    let value: f64 = format!("{prefix}0").parse().ok()?;
    let floored = value.floor();
    if !floored.is_finite() || floored < 0.0 || floored > f64::from(u16::MAX) {
        return None;
    }
    Some(floored as u16)
}
