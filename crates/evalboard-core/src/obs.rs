//! Structured observability hooks for page loads and store reads.
//!
//! This module provides:
//! - Page-scoped tracing spans, either as a `PageSpan` RAII guard for
//!   synchronous work or via [`page_span`] for instrumenting futures
//! - Emission functions for load outcomes and individual fetches
//!
//! Events are emitted at `info!` level, failures at `warn!`.

use tracing::{info, warn, Span};

/// Span covering one page load. Attach it to async work with
/// `tracing::Instrument::instrument`.
pub fn page_span(page: &str) -> Span {
    tracing::info_span!("evalboard.page", page = %page)
}

/// RAII guard that enters a page-scoped span until dropped.
///
/// Only hold this in synchronous code; across an `.await` use
/// [`page_span`] with `instrument` instead.
pub struct PageSpan {
    _span: tracing::span::EnteredSpan,
}

impl PageSpan {
    /// Create and enter a span tagged with the page name.
    pub fn enter(page: &str) -> Self {
        Self {
            _span: page_span(page).entered(),
        }
    }
}

/// Emit event: a page settled with data (or an explicit empty state).
pub fn emit_page_loaded(page: &str, state: &str, duration_ms: u64) {
    info!(
        event = "page.loaded",
        page = %page,
        state = %state,
        duration_ms = duration_ms,
    );
}

/// Emit event: a page settled in its error or not-found state.
pub fn emit_page_failed(page: &str, error: &dyn std::fmt::Display) {
    warn!(event = "page.failed", page = %page, error = %error);
}

/// Emit event: one read against a relation finished.
pub fn emit_fetch_finished(relation: &str, rows: usize, duration_ms: u64, success: bool) {
    info!(
        event = "fetch.finished",
        relation = %relation,
        rows = rows,
        duration_ms = duration_ms,
        success = success,
    );
}
