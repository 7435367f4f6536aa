//! Constants for the download module (timeouts, retry budgets).

use std::time::Duration;

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (5 minutes for large documents).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Attempts for archive-mode document fetches.
pub const ARCHIVE_FETCH_ATTEMPTS: u32 = 25;

/// Base delay for archive and mirror fetch backoff.
pub const FETCH_BACKOFF_BASE: Duration = Duration::from_millis(300);

/// Upper bound on a single fetch backoff delay.
pub const FETCH_BACKOFF_MAX: Duration = Duration::from_secs(120);

/// Attempts for local-mode streamed downloads.
pub const LOCAL_ATTEMPTS: u32 = 20;

/// Growth factor for local-mode backoff (`1.2^attempt` seconds).
pub const LOCAL_BACKOFF_MULTIPLIER: f32 = 1.2;

/// Attempts for mirror-mode fetches from the bucket.
pub const MIRROR_FETCH_ATTEMPTS: u32 = 5;

/// Upload attempts on object-store throttling (initial + 3 retries).
pub const THROTTLE_ATTEMPTS: u32 = 4;

/// Fixed poll interval for the metadata service.
pub const METADATA_POLL_INTERVAL: Duration = Duration::from_secs(1);
