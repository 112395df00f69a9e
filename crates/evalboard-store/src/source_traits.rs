//! Row source trait definition for evalboard
//!
//! `RowSource` is the minimal read contract the dashboard needs from a data
//! store: query the agent-performance, test-results, skills and daily
//! metrics relations, and check reachability.
//!
//! Implementations:
//! - [`MemoryRowSource`](crate::memory::MemoryRowSource): in-memory fixture
//! - [`PostgrestSource`](crate::postgrest::PostgrestSource): remote PostgREST API
//!
//! Any store that can honour a [`ReadQuery`] can be plugged in without
//! touching the aggregation code.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::query::ReadQuery;
use crate::schema::{AgentMetricsRow, AgentPerformanceRow, SkillRow, TestResultRow};

/// Result type for row source operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Read-only access to the dashboard's relations.
///
/// Guarantees:
/// - Reads are idempotent and side-effect free.
/// - Filters are AND-ed; ordering and pagination apply after filtering.
/// - An empty result is `Ok(vec![])`, never an error.
#[async_trait]
pub trait RowSource: Send + Sync {
    /// Query the agent-performance relation.
    async fn agent_rows(&self, query: &ReadQuery) -> StoreResult<Vec<AgentPerformanceRow>>;

    /// Query the test-results-history relation.
    async fn test_rows(&self, query: &ReadQuery) -> StoreResult<Vec<TestResultRow>>;

    /// Query the versioned skills relation.
    async fn skill_rows(&self, query: &ReadQuery) -> StoreResult<Vec<SkillRow>>;

    /// Query the daily agent metrics relation.
    async fn metric_rows(&self, query: &ReadQuery) -> StoreResult<Vec<AgentMetricsRow>>;

    /// Cheap reachability probe.
    async fn ping(&self) -> StoreResult<()>;

    /// Short human-readable description, safe to log.
    fn describe(&self) -> String;
}
