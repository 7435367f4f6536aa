//! Counters shared by the workers of one transfer run.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Live counters updated from concurrent transfer tasks.
#[derive(Debug, Default)]
pub(crate) struct TransferStats {
    attempted: AtomicUsize,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
    retried: AtomicUsize,
}

impl TransferStats {
    pub fn increment_attempted(&self) {
        self.attempted.fetch_add(1, Ordering::SeqCst);
    }

    pub fn increment_succeeded(&self) {
        self.succeeded.fetch_add(1, Ordering::SeqCst);
    }

    pub fn increment_failed(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }

    /// Records the retries behind a finished attempt (`attempts - 1`).
    pub fn add_retries_from_attempts(&self, attempts: u32) {
        let retries = usize::try_from(attempts.saturating_sub(1)).unwrap_or(usize::MAX);
        self.retried.fetch_add(retries, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> TransferReport {
        TransferReport {
            attempted: self.attempted.load(Ordering::SeqCst),
            succeeded: self.succeeded.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
            retried: self.retried.load(Ordering::SeqCst),
        }
    }
}

/// Summary of a transfer run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferReport {
    /// Items picked up by a worker.
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Extra attempts made across all items.
    pub retried: usize,
}
