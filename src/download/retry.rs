//! Retry logic with exponential backoff for transient failures.
//!
//! This module provides the [`RetryPolicy`] and [`FailureType`] types for
//! classifying errors and determining retry behavior, plus
//! [`run_with_retry`], the loop every transfer strategy and the metadata
//! poller drive their requests through.
//!
//! # Overview
//!
//! When an attempt fails, the error is classified into a [`FailureType`]:
//! - [`FailureType::Transient`] - Temporary failures that may succeed on retry
//! - [`FailureType::Permanent`] - Failures that won't succeed regardless of retries
//! - [`FailureType::RateLimited`] - Server or storage throttling (retries with backoff)
//!
//! The [`RetryPolicy`] then determines whether to retry based on failure type
//! and attempt count, calculating exponential backoff delays.
//!
//! # Example
//!
//! ```
//! use harvester_core::download::{
//!     DownloadError, RetryPolicy, FailureType, RetryDecision, classify_error
//! };
//!
//! let policy = RetryPolicy::local_download();
//! let error = DownloadError::http_status("https://example.com/file.pdf", 503);
//! let failure_type = classify_error(&error);
//!
//! match policy.should_retry(failure_type, 1) {
//!     RetryDecision::Retry { delay, attempt } => {
//!         println!("Retrying in {:?} (attempt {})", delay, attempt);
//!     }
//!     RetryDecision::DoNotRetry { reason } => {
//!         println!("Not retrying: {}", reason);
//!     }
//! }
//! ```

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, instrument, warn};

use super::DownloadError;
use super::constants::{
    ARCHIVE_FETCH_ATTEMPTS, FETCH_BACKOFF_BASE, FETCH_BACKOFF_MAX, LOCAL_ATTEMPTS,
    LOCAL_BACKOFF_MULTIPLIER, METADATA_POLL_INTERVAL, MIRROR_FETCH_ATTEMPTS, THROTTLE_ATTEMPTS,
};

/// Default maximum delay cap (32 seconds).
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(32);

/// Classification of failure types.
///
/// Used to determine whether a failed attempt should be retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Temporary failure that may succeed on retry.
    ///
    /// Examples: network timeout, gateway errors, connection refused.
    Transient,

    /// Permanent failure that won't succeed regardless of retries.
    ///
    /// Examples: 404 Not Found, invalid URL, non-throttling storage errors.
    Permanent,

    /// Throttling by the remote side (HTTP 429, object-store slow-down).
    RateLimited,
}

/// Decision on whether to retry a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the specified delay.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// Which attempt number this will be (1-indexed, so first retry is attempt 2).
        attempt: u32,
    },

    /// Do not retry.
    DoNotRetry {
        /// Human-readable reason why retry is not attempted.
        reason: String,
    },
}

/// Configuration for retry behavior with exponential backoff.
///
/// # Delay Calculation
///
/// ```text
/// delay = min(base_delay * multiplier^(attempt - 1), max_delay)
/// ```
///
/// where `attempt` is the 1-indexed attempt that just failed. Each caller
/// owns its policy value, so backoff state never leaks between workers.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt); `None` polls forever.
    max_attempts: Option<u32>,

    /// Delay after the first failed attempt.
    base_delay: Duration,

    /// Maximum delay cap.
    max_delay: Duration,

    /// Multiplier applied each attempt.
    backoff_multiplier: f32,
}

impl RetryPolicy {
    /// Creates a new retry policy with custom settings.
    ///
    /// # Arguments
    ///
    /// * `max_attempts` - Maximum attempts including initial (clamped to >= 1)
    /// * `base_delay` - Delay after the first failure
    /// * `max_delay` - Maximum delay cap
    /// * `backoff_multiplier` - Multiplier for exponential increase
    #[must_use]
    pub fn new(
        max_attempts: u32,
        base_delay: Duration,
        max_delay: Duration,
        backoff_multiplier: f32,
    ) -> Self {
        Self {
            max_attempts: Some(max_attempts.max(1)),
            base_delay,
            max_delay,
            backoff_multiplier,
        }
    }

    /// Creates a policy that retries forever at a fixed interval.
    #[must_use]
    pub fn unbounded(interval: Duration) -> Self {
        Self {
            max_attempts: None,
            base_delay: interval,
            max_delay: interval,
            backoff_multiplier: 1.0,
        }
    }

    /// Archive-mode fetch: 25 attempts, `0.3s * 2^(n-1)` capped at 120s.
    #[must_use]
    pub fn archive_fetch() -> Self {
        Self::new(
            ARCHIVE_FETCH_ATTEMPTS,
            FETCH_BACKOFF_BASE,
            FETCH_BACKOFF_MAX,
            2.0,
        )
    }

    /// Mirror-mode fetch: same curve as archive fetches, 5 attempts.
    #[must_use]
    pub fn mirror_fetch() -> Self {
        Self::new(MIRROR_FETCH_ATTEMPTS, FETCH_BACKOFF_BASE, FETCH_BACKOFF_MAX, 2.0)
    }

    /// Local-mode download: 20 attempts, `1.2^attempt` seconds.
    #[must_use]
    pub fn local_download() -> Self {
        Self::new(
            LOCAL_ATTEMPTS,
            Duration::from_millis(1200),
            Duration::MAX,
            LOCAL_BACKOFF_MULTIPLIER,
        )
    }

    /// Object-store upload on throttling: 3 retries sleeping 1s, 2s, 4s.
    #[must_use]
    pub fn throttled_upload() -> Self {
        Self::new(
            THROTTLE_ATTEMPTS,
            Duration::from_secs(1),
            DEFAULT_MAX_DELAY,
            2.0,
        )
    }

    /// Metadata service: poll every second until a success response arrives.
    #[must_use]
    pub fn metadata_poll() -> Self {
        Self::unbounded(METADATA_POLL_INTERVAL)
    }

    /// Returns the maximum number of attempts configured (`None` = unbounded).
    #[must_use]
    pub fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }

    /// Determines whether to retry a failed attempt.
    ///
    /// # Arguments
    ///
    /// * `failure_type` - Classification of the failure
    /// * `attempt` - The attempt number that just failed (1-indexed)
    #[instrument(level = "trace", skip(self), fields(max_attempts = ?self.max_attempts))]
    pub fn should_retry(&self, failure_type: FailureType, attempt: u32) -> RetryDecision {
        if failure_type == FailureType::Permanent {
            return RetryDecision::DoNotRetry {
                reason: "permanent failure - retry would not help".to_string(),
            };
        }

        if let Some(max) = self.max_attempts
            && attempt >= max
        {
            debug!(attempt, max, "max attempts reached");
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({max}) exhausted"),
            };
        }

        let delay = self.calculate_delay(attempt);

        debug!(
            attempt,
            next_attempt = attempt + 1,
            delay_ms = delay.as_millis(),
            "will retry"
        );

        RetryDecision::Retry {
            delay,
            attempt: attempt.saturating_add(1),
        }
    }

    /// Calculates the delay after a failed attempt, in whole milliseconds.
    ///
    /// Formula: `min(base_delay * multiplier^(attempt - 1), max_delay)`
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    fn calculate_delay(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as f64;
        let multiplier = f64::from(self.backoff_multiplier);
        let exponent = f64::from(attempt.saturating_sub(1));
        let delay_ms = base_ms * multiplier.powf(exponent);

        let capped_ms = delay_ms.min(self.max_delay.as_millis() as f64);

        Duration::from_millis(capped_ms as u64)
    }
}

/// Runs `operation` until it succeeds or `policy` gives up.
///
/// The closure receives the 1-indexed attempt number. On success the value
/// is returned with the number of attempts used; on failure the last error
/// is returned with the number of attempts made.
///
/// # Errors
///
/// Returns `(error, attempts)` when the failure is permanent or attempts run out.
pub async fn run_with_retry<T, E, F, Fut, C>(
    policy: &RetryPolicy,
    classify: C,
    label: &str,
    mut operation: F,
) -> Result<(T, u32), (E, u32)>
where
    E: Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> FailureType,
{
    let mut attempt = 0u32;

    loop {
        attempt = attempt.saturating_add(1);

        match operation(attempt).await {
            Ok(value) => return Ok((value, attempt)),
            Err(error) => match policy.should_retry(classify(&error), attempt) {
                RetryDecision::Retry {
                    delay,
                    attempt: next_attempt,
                } => {
                    warn!(
                        target_label = label,
                        attempt = next_attempt,
                        max_attempts = ?policy.max_attempts(),
                        delay_ms = delay.as_millis(),
                        error = %error,
                        "retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::DoNotRetry { reason } => {
                    debug!(target_label = label, %reason, "not retrying");
                    return Err((error, attempt));
                }
            },
        }
    }
}

/// Classifies a download error for fetches that retry only the gateway set.
///
/// | Error | Type |
/// |-------|------|
/// | HTTP 500, 502, 503, 504 | Transient |
/// | HTTP 429 | `RateLimited` |
/// | Other HTTP statuses | Permanent |
/// | Timeout | Transient |
/// | Network (most) | Transient |
/// | Network (TLS) | Permanent |
/// | IO | Permanent |
/// | `InvalidUrl` | Permanent |
#[instrument(level = "trace")]
pub fn classify_error(error: &DownloadError) -> FailureType {
    match error {
        DownloadError::HttpStatus { status, .. } => classify_http_status(*status),
        DownloadError::Timeout { .. } => FailureType::Transient,
        DownloadError::Network { source, .. } => {
            if is_tls_error(source) {
                FailureType::Permanent
            } else {
                FailureType::Transient
            }
        }
        DownloadError::Io { .. } | DownloadError::InvalidUrl { .. } => FailureType::Permanent,
    }
}

/// Classifies a download error for pollers that retry on any non-success status.
///
/// Used by local-mode downloads and the metadata poller: every HTTP status
/// is transient, everything else follows [`classify_error`].
#[must_use]
pub fn classify_error_any_status(error: &DownloadError) -> FailureType {
    match error {
        DownloadError::HttpStatus { .. } => FailureType::Transient,
        other => classify_error(other),
    }
}

#[allow(clippy::match_same_arms)]
fn classify_http_status(status: u16) -> FailureType {
    match status {
        500 | 502 | 503 | 504 => FailureType::Transient,
        429 => FailureType::RateLimited,
        _ => FailureType::Permanent,
    }
}

/// Checks if a reqwest error is a TLS/certificate error.
fn is_tls_error(error: &reqwest::Error) -> bool {
    let error_string = error.to_string().to_lowercase();
    error_string.contains("certificate")
        || error_string.contains("tls")
        || error_string.contains("ssl")
        || error_string.contains("handshake")
}
