//! Dashboard data source.
//!
//! [`DashboardSource`] is the one read surface pages load from. The
//! production implementation, [`DashboardService`], runs the aggregation
//! over any [`RowSource`], so the in-memory fixture and the remote store
//! share every line of page logic.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use evalboard_store::{
    AgentMetricsRow, AgentPerformanceRow, AgentStatus, Direction, ReadQuery, RowSource,
    SkillRow, StoreResult, TestResultRow,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::aggregate::{bucket_weekly, compute_stats, trend_window_start, WeekStart};
use crate::domain::{
    AgentDetail, AgentView, DashboardError, DashboardStats, Result, ScoreHistoryPoint,
    TestResultDetail,
};
use crate::mapper::{to_agent_view, to_agent_views};
use crate::metrics::METRICS;
use crate::obs::emit_fetch_finished;

/// Default page size of the agent listing.
pub const DEFAULT_AGENT_LIMIT: usize = 100;

/// Default page size of the test history.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Default number of recent tests on the agent detail page.
pub const DEFAULT_AGENT_TESTS_LIMIT: usize = 20;

/// Default trailing window of the daily agent metrics.
pub const DEFAULT_METRICS_DAYS: u32 = 30;

/// Rows per request when the overview reads every agent.
///
/// PostgREST caps each response at its `max-rows` setting (1000 on
/// Supabase). The stats read stops at the first short page, so this must
/// not exceed the server cap.
pub const STATS_PAGE_SIZE: usize = 1000;

/// Listing options for [`DashboardSource::fetch_agents`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentListQuery {
    pub status: Option<AgentStatus>,
    pub limit: usize,
    pub offset: usize,
}

impl Default for AgentListQuery {
    fn default() -> Self {
        Self {
            status: None,
            limit: DEFAULT_AGENT_LIMIT,
            offset: 0,
        }
    }
}

impl AgentListQuery {
    pub fn with_status(mut self, status: AgentStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }
}

/// Offset-based page of rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub offset: usize,
    pub limit: usize,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first(DEFAULT_HISTORY_LIMIT)
    }
}

impl PageRequest {
    /// The first `limit` rows.
    pub fn first(limit: usize) -> Self {
        Self { offset: 0, limit }
    }

    /// Inclusive `(from, to)` row bounds, `None` for an empty page.
    ///
    /// `to` saturates at `usize::MAX`.
    pub fn bounds(&self) -> Option<(usize, usize)> {
        (self.limit > 0).then(|| (self.offset, self.offset.saturating_add(self.limit - 1)))
    }

    fn apply(&self, query: ReadQuery) -> ReadQuery {
        match self.bounds() {
            Some((from, to)) => query.range(from, to),
            None => query,
        }
    }
}

/// Overall health of the configured data store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Degraded => write!(f, "degraded"),
        }
    }
}

/// Result of a reachability probe. Producing one never fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    /// Log-safe description of the source.
    pub source: String,
    pub latency_ms: u64,
    pub connected: bool,
    pub error: Option<String>,
}

/// Read surface of the dashboard.
#[async_trait]
pub trait DashboardSource: Send + Sync {
    /// Overview headline figures over every agent.
    async fn fetch_stats(&self) -> Result<DashboardStats>;

    /// Weekly score trend over the trailing window.
    async fn fetch_history(&self) -> Result<Vec<ScoreHistoryPoint>>;

    /// Agent listing, most recently tested first.
    async fn fetch_agents(&self, query: &AgentListQuery) -> Result<Vec<AgentView>>;

    /// Test rows, newest first.
    async fn fetch_test_results(&self, page: PageRequest) -> Result<Vec<TestResultRow>>;

    /// One agent with its test count and latest test.
    async fn fetch_agent(&self, agent_id: &str) -> Result<AgentDetail>;

    /// One page of an agent's tests, newest first.
    async fn fetch_agent_tests(
        &self,
        agent_id: &str,
        page: PageRequest,
    ) -> Result<Vec<TestResultRow>>;

    /// One test result with its breakdown.
    async fn fetch_test_result(&self, test_id: &str) -> Result<TestResultDetail>;

    /// Latest skill version of an agent.
    async fn fetch_agent_skill(&self, agent_id: &str) -> Result<SkillRow>;

    /// Daily metrics of an agent for the last `days` calendar days,
    /// oldest first. An unknown agent yields no rows.
    async fn fetch_agent_metrics(&self, agent_id: &str, days: u32)
        -> Result<Vec<AgentMetricsRow>>;

    /// Check that the underlying store answers. Failures are reported as
    /// [`HealthStatus::Degraded`], never as an error.
    async fn health_check(&self) -> HealthReport;

    /// Log-safe description of where rows come from.
    fn describe(&self) -> String;
}

/// [`DashboardSource`] over any [`RowSource`].
#[derive(Clone)]
pub struct DashboardService {
    rows: Arc<dyn RowSource>,
    now: Option<DateTime<Utc>>,
    week_start: WeekStart,
    stats_page_size: usize,
}

impl DashboardService {
    pub fn new(rows: Arc<dyn RowSource>) -> Self {
        Self {
            rows,
            now: None,
            week_start: WeekStart::default(),
            stats_page_size: STATS_PAGE_SIZE,
        }
    }

    /// Pin the clock used for the trend window.
    pub fn with_fixed_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    pub fn with_week_start(mut self, week_start: WeekStart) -> Self {
        self.week_start = week_start;
        self
    }

    pub fn week_start(&self) -> WeekStart {
        self.week_start
    }

    /// Page size of the stats read. Zero is treated as one.
    pub fn with_stats_page_size(mut self, size: usize) -> Self {
        self.stats_page_size = size.max(1);
        self
    }

    pub fn stats_page_size(&self) -> usize {
        self.stats_page_size
    }

    pub fn row_source(&self) -> &Arc<dyn RowSource> {
        &self.rows
    }

    fn now(&self) -> DateTime<Utc> {
        self.now.unwrap_or_else(Utc::now)
    }

    async fn agents(&self, query: &ReadQuery) -> Result<Vec<AgentPerformanceRow>> {
        Ok(tracked("agents", self.rows.agent_rows(query)).await?)
    }

    async fn tests(&self, query: &ReadQuery) -> Result<Vec<TestResultRow>> {
        Ok(tracked("tests", self.rows.test_rows(query)).await?)
    }

    async fn skills(&self, query: &ReadQuery) -> Result<Vec<SkillRow>> {
        Ok(tracked("skills", self.rows.skill_rows(query)).await?)
    }

    async fn metrics(&self, query: &ReadQuery) -> Result<Vec<AgentMetricsRow>> {
        Ok(tracked("metrics", self.rows.metric_rows(query)).await?)
    }

    /// Every agent row, read in stable `id` order one page at a time.
    async fn all_agents(&self) -> Result<Vec<AgentPerformanceRow>> {
        let mut agents = Vec::new();
        let mut page = PageRequest::first(self.stats_page_size);
        loop {
            let query = page.apply(ReadQuery::new().order_by("id", Direction::Asc));
            let rows = self.agents(&query).await?;
            let fetched = rows.len();
            agents.extend(rows);
            if fetched < page.limit {
                break;
            }
            page.offset = page.offset.saturating_add(fetched);
        }
        debug!(agents = agents.len(), "agent rows collected");
        Ok(agents)
    }
}

/// Await one read, updating counters and emitting a fetch event.
async fn tracked<T, F>(relation: &str, fetch: F) -> StoreResult<Vec<T>>
where
    F: Future<Output = StoreResult<Vec<T>>>,
{
    METRICS.inc_fetches();
    let started = Instant::now();
    let result = fetch.await;
    let duration_ms = started.elapsed().as_millis() as u64;
    match &result {
        Ok(rows) => {
            METRICS.add_rows(rows.len() as u64);
            emit_fetch_finished(relation, rows.len(), duration_ms, true);
        }
        Err(_) => {
            METRICS.inc_failures();
            emit_fetch_finished(relation, 0, duration_ms, false);
        }
    }
    result
}

#[async_trait]
impl DashboardSource for DashboardService {
    async fn fetch_stats(&self) -> Result<DashboardStats> {
        let agents = self.all_agents().await?;
        Ok(compute_stats(&agents))
    }

    async fn fetch_history(&self) -> Result<Vec<ScoreHistoryPoint>> {
        let query = ReadQuery::new()
            .since("tested_at", trend_window_start(self.now()))
            .order_by("tested_at", Direction::Asc);
        let tests = self.tests(&query).await?;
        Ok(bucket_weekly(&tests, self.week_start))
    }

    async fn fetch_agents(&self, list: &AgentListQuery) -> Result<Vec<AgentView>> {
        if list.limit == 0 {
            return Ok(Vec::new());
        }
        let mut query = ReadQuery::new();
        if let Some(status) = list.status {
            query = query.eq("status", status.as_str());
        }
        let query = PageRequest {
            offset: list.offset,
            limit: list.limit,
        }
        .apply(query.order_by("last_test_at", Direction::Desc));

        let agents = self.agents(&query).await?;
        Ok(to_agent_views(&agents))
    }

    async fn fetch_test_results(&self, page: PageRequest) -> Result<Vec<TestResultRow>> {
        if page.limit == 0 {
            return Ok(Vec::new());
        }
        let query = page.apply(ReadQuery::new().order_by("tested_at", Direction::Desc));
        self.tests(&query).await
    }

    async fn fetch_agent(&self, agent_id: &str) -> Result<AgentDetail> {
        let agent_query = ReadQuery::new().eq("id", agent_id).limit(1);
        let tests_query = ReadQuery::new()
            .eq("agent_version_id", agent_id)
            .order_by("tested_at", Direction::Desc);

        let (agents, tests) =
            tokio::try_join!(self.agents(&agent_query), self.tests(&tests_query))?;

        let row = agents
            .into_iter()
            .next()
            .ok_or_else(|| DashboardError::AgentNotFound(agent_id.to_string()))?;
        debug!(agent_id = %agent_id, tests = tests.len(), "agent detail loaded");

        Ok(AgentDetail {
            view: to_agent_view(&row),
            row,
            total_tests: tests.len(),
            latest_test: tests.into_iter().next(),
        })
    }

    async fn fetch_agent_tests(
        &self,
        agent_id: &str,
        page: PageRequest,
    ) -> Result<Vec<TestResultRow>> {
        if page.limit == 0 {
            return Ok(Vec::new());
        }
        let query = page.apply(
            ReadQuery::new()
                .eq("agent_version_id", agent_id)
                .order_by("tested_at", Direction::Desc),
        );
        self.tests(&query).await
    }

    async fn fetch_test_result(&self, test_id: &str) -> Result<TestResultDetail> {
        let query = ReadQuery::new().eq("id", test_id).limit(1);
        let row = self
            .tests(&query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DashboardError::TestResultNotFound(test_id.to_string()))?;
        Ok(TestResultDetail::from_row(row))
    }

    async fn fetch_agent_skill(&self, agent_id: &str) -> Result<SkillRow> {
        let query = ReadQuery::new()
            .eq("agent_version_id", agent_id)
            .order_by("version", Direction::Desc)
            .limit(1);
        let skill = self
            .skills(&query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DashboardError::SkillNotFound(agent_id.to_string()))?;
        debug!(agent_id = %agent_id, version = skill.version, "skill loaded");
        Ok(skill)
    }

    async fn fetch_agent_metrics(
        &self,
        agent_id: &str,
        days: u32,
    ) -> Result<Vec<AgentMetricsRow>> {
        let first_day = (self.now() - Duration::days(i64::from(days))).date_naive();
        let query = ReadQuery::new()
            .eq("agent_version_id", agent_id)
            .gte("data", first_day.to_string())
            .order_by("data", Direction::Asc);
        self.metrics(&query).await
    }

    async fn health_check(&self) -> HealthReport {
        let started = Instant::now();
        let result = self.rows.ping().await;
        let latency_ms = started.elapsed().as_millis() as u64;
        match result {
            Ok(()) => HealthReport {
                status: HealthStatus::Healthy,
                source: self.rows.describe(),
                latency_ms,
                connected: true,
                error: None,
            },
            Err(e) => HealthReport {
                status: HealthStatus::Degraded,
                source: self.rows.describe(),
                latency_ms,
                connected: false,
                error: Some(e.to_string()),
            },
        }
    }

    fn describe(&self) -> String {
        self.rows.describe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_bounds_are_inclusive() {
        assert_eq!(PageRequest::first(10).bounds(), Some((0, 9)));
        assert_eq!(
            PageRequest {
                offset: 20,
                limit: 5
            }
            .bounds(),
            Some((20, 24))
        );
        assert_eq!(PageRequest::first(0).bounds(), None);
    }

    #[test]
    fn page_bounds_saturate_instead_of_overflowing() {
        let far = PageRequest {
            offset: usize::MAX,
            limit: DEFAULT_AGENT_LIMIT,
        };
        assert_eq!(far.bounds(), Some((usize::MAX, usize::MAX)));
        let query = far.apply(ReadQuery::new());
        assert_eq!(query.offset, Some(usize::MAX));
        assert_eq!(query.limit, Some(1));
    }

    #[tokio::test]
    async fn huge_offsets_yield_empty_pages() {
        let now = Utc::now();
        let rows: Arc<dyn RowSource> = Arc::new(evalboard_store::MemoryRowSource::demo(now));
        let service = DashboardService::new(rows).with_fixed_now(now);

        let agents = service
            .fetch_agents(&AgentListQuery::default().with_offset(usize::MAX))
            .await
            .unwrap();
        assert!(agents.is_empty());

        let far = PageRequest {
            offset: usize::MAX,
            limit: 10,
        };
        assert!(service.fetch_test_results(far).await.unwrap().is_empty());
        assert!(service.fetch_agent_tests("any", far).await.unwrap().is_empty());
    }

    #[test]
    fn list_query_defaults() {
        let q = AgentListQuery::default();
        assert_eq!(q.limit, DEFAULT_AGENT_LIMIT);
        assert_eq!(q.offset, 0);
        assert!(q.status.is_none());
    }
}
