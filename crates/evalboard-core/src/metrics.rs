//! Global atomic counters for dashboard reads.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. before the CLI exits).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters, no allocations and no locking.
pub struct Metrics {
    fetches_issued: AtomicU64,
    fetch_failures: AtomicU64,
    rows_loaded: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            fetches_issued: AtomicU64::new(0),
            fetch_failures: AtomicU64::new(0),
            rows_loaded: AtomicU64::new(0),
        }
    }

    /// Count one read issued against a row source.
    pub fn inc_fetches(&self) {
        self.fetches_issued.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "fetches_issued", "counter incremented");
    }

    /// Count one failed read.
    pub fn inc_failures(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "fetch_failures", "counter incremented");
    }

    /// Add `rows` to the rows-loaded counter.
    pub fn add_rows(&self, rows: u64) {
        self.rows_loaded.fetch_add(rows, Ordering::Relaxed);
        tracing::trace!(metric = "rows_loaded", rows, "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            fetches_issued = self.fetches_issued(),
            fetch_failures = self.fetch_failures(),
            rows_loaded = self.rows_loaded(),
        );
    }

    pub fn fetches_issued(&self) -> u64 {
        self.fetches_issued.load(Ordering::Relaxed)
    }

    pub fn fetch_failures(&self) -> u64 {
        self.fetch_failures.load(Ordering::Relaxed)
    }

    pub fn rows_loaded(&self) -> u64 {
        self.rows_loaded.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.fetches_issued.store(0, Ordering::Relaxed);
        self.fetch_failures.store(0, Ordering::Relaxed);
        self.rows_loaded.store(0, Ordering::Relaxed);
    }
}
