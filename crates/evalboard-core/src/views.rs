//! Page view state.
//!
//! Every page owns a [`ViewState`] and moves through
//! `Idle -> Loading -> {Ready, Empty, NotFound, Failed}`. A load launches
//! all of the page's fetches together and settles once they all finish;
//! the first failure settles the whole page. The only way out of a
//! terminal state is a full [`reload`](OverviewPage::reload).

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use evalboard_store::{AgentMetricsRow, SkillRow, TestResultRow};
use serde::Serialize;
use tracing::Instrument;

use crate::domain::{
    AgentDetail, AgentView, DashboardStats, Result, ScoreHistoryPoint, TestResultDetail,
};
use crate::filter::TestFilter;
use crate::obs::{emit_page_failed, emit_page_loaded, page_span};
use crate::source::{
    AgentListQuery, DashboardSource, PageRequest, DEFAULT_AGENT_TESTS_LIMIT,
    DEFAULT_METRICS_DAYS,
};

/// Lifecycle of one page's data.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "state", content = "data", rename_all = "snake_case")]
pub enum ViewState<T> {
    #[default]
    Idle,
    Loading,
    Ready(T),
    /// Loaded fine but there is nothing to show.
    Empty,
    NotFound {
        what: String,
    },
    Failed {
        message: String,
    },
}

impl<T: EmptyState> ViewState<T> {
    /// Terminal state for a finished load.
    pub fn settle(result: Result<T>) -> Self {
        match result {
            Ok(data) if data.is_empty_state() => ViewState::Empty,
            Ok(data) => ViewState::Ready(data),
            Err(e) => match e.missing_subject() {
                Some(what) => ViewState::NotFound { what },
                None => ViewState::Failed {
                    message: e.to_string(),
                },
            },
        }
    }
}

impl<T> ViewState<T> {
    pub fn label(&self) -> &'static str {
        match self {
            ViewState::Idle => "idle",
            ViewState::Loading => "loading",
            ViewState::Ready(_) => "ready",
            ViewState::Empty => "empty",
            ViewState::NotFound { .. } => "not_found",
            ViewState::Failed { .. } => "failed",
        }
    }

    pub fn is_settled(&self) -> bool {
        !matches!(self, ViewState::Idle | ViewState::Loading)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, ViewState::Loading)
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            ViewState::Ready(data) => Some(data),
            _ => None,
        }
    }

    pub fn into_data(self) -> Option<T> {
        match self {
            ViewState::Ready(data) => Some(data),
            _ => None,
        }
    }

    /// User-facing error message for failed loads.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            ViewState::Failed { message } => Some(message),
            _ => None,
        }
    }
}

/// Whether loaded data should render as the explicit empty state.
pub trait EmptyState {
    fn is_empty_state(&self) -> bool;
}

impl<T> EmptyState for Vec<T> {
    fn is_empty_state(&self) -> bool {
        self.is_empty()
    }
}

impl EmptyState for AgentDetail {
    fn is_empty_state(&self) -> bool {
        false
    }
}

impl EmptyState for TestResultDetail {
    fn is_empty_state(&self) -> bool {
        false
    }
}

impl EmptyState for SkillRow {
    fn is_empty_state(&self) -> bool {
        false
    }
}

/// Holds a page's state and drives one load through it.
#[derive(Debug)]
struct Loader<T> {
    page: &'static str,
    state: ViewState<T>,
}

impl<T: EmptyState> Loader<T> {
    fn new(page: &'static str) -> Self {
        Self {
            page,
            state: ViewState::Idle,
        }
    }

    async fn run<F>(&mut self, fetch: F) -> &ViewState<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.state = ViewState::Loading;
        let started = Instant::now();
        let span = page_span(self.page);
        let result = fetch.instrument(span).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        self.state = ViewState::settle(result);
        match &self.state {
            ViewState::NotFound { what } => {
                emit_page_failed(self.page, &format!("{what} not found"))
            }
            ViewState::Failed { message } => emit_page_failed(self.page, message),
            settled => emit_page_loaded(self.page, settled.label(), duration_ms),
        }
        &self.state
    }
}

/// Overview page data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
    pub stats: DashboardStats,
    pub trend: Vec<ScoreHistoryPoint>,
}

impl EmptyState for Overview {
    fn is_empty_state(&self) -> bool {
        self.stats.total_agents == 0 && self.trend.is_empty()
    }
}

/// Headline stats and the weekly trend.
pub struct OverviewPage {
    source: Arc<dyn DashboardSource>,
    loader: Loader<Overview>,
}

impl OverviewPage {
    pub fn new(source: Arc<dyn DashboardSource>) -> Self {
        Self {
            source,
            loader: Loader::new("overview"),
        }
    }

    pub fn state(&self) -> &ViewState<Overview> {
        &self.loader.state
    }

    pub async fn load(&mut self) -> &ViewState<Overview> {
        let source = &self.source;
        self.loader
            .run(async {
                let (stats, trend) =
                    tokio::try_join!(source.fetch_stats(), source.fetch_history())?;
                Ok(Overview { stats, trend })
            })
            .await
    }

    pub async fn reload(&mut self) -> &ViewState<Overview> {
        self.load().await
    }
}

/// Agent listing.
pub struct AgentsPage {
    source: Arc<dyn DashboardSource>,
    query: AgentListQuery,
    loader: Loader<Vec<AgentView>>,
}

impl AgentsPage {
    pub fn new(source: Arc<dyn DashboardSource>, query: AgentListQuery) -> Self {
        Self {
            source,
            query,
            loader: Loader::new("agents"),
        }
    }

    pub fn query(&self) -> &AgentListQuery {
        &self.query
    }

    pub fn state(&self) -> &ViewState<Vec<AgentView>> {
        &self.loader.state
    }

    pub async fn load(&mut self) -> &ViewState<Vec<AgentView>> {
        let source = &self.source;
        let query = self.query;
        self.loader
            .run(async move { source.fetch_agents(&query).await })
            .await
    }

    pub async fn reload(&mut self) -> &ViewState<Vec<AgentView>> {
        self.load().await
    }
}

/// Agent detail page data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentPage {
    pub detail: AgentDetail,
    pub recent_tests: Vec<TestResultRow>,
}

impl EmptyState for AgentPage {
    fn is_empty_state(&self) -> bool {
        false
    }
}

/// One agent and a page of its tests.
pub struct AgentDetailPage {
    source: Arc<dyn DashboardSource>,
    agent_id: String,
    tests: PageRequest,
    loader: Loader<AgentPage>,
}

impl AgentDetailPage {
    pub fn new(source: Arc<dyn DashboardSource>, agent_id: impl Into<String>) -> Self {
        Self {
            source,
            agent_id: agent_id.into(),
            tests: PageRequest::first(DEFAULT_AGENT_TESTS_LIMIT),
            loader: Loader::new("agent_detail"),
        }
    }

    pub fn with_tests_limit(mut self, limit: usize) -> Self {
        self.tests.limit = limit;
        self
    }

    /// Skip the `offset` newest tests.
    pub fn with_tests_offset(mut self, offset: usize) -> Self {
        self.tests.offset = offset;
        self
    }

    pub fn state(&self) -> &ViewState<AgentPage> {
        &self.loader.state
    }

    pub async fn load(&mut self) -> &ViewState<AgentPage> {
        let source = &self.source;
        let agent_id = self.agent_id.as_str();
        let tests = self.tests;
        self.loader
            .run(async move {
                let (detail, recent_tests) = tokio::try_join!(
                    source.fetch_agent(agent_id),
                    source.fetch_agent_tests(agent_id, tests)
                )?;
                Ok(AgentPage {
                    detail,
                    recent_tests,
                })
            })
            .await
    }

    pub async fn reload(&mut self) -> &ViewState<AgentPage> {
        self.load().await
    }
}

/// Latest skill version of one agent.
pub struct SkillPage {
    source: Arc<dyn DashboardSource>,
    agent_id: String,
    loader: Loader<SkillRow>,
}

impl SkillPage {
    pub fn new(source: Arc<dyn DashboardSource>, agent_id: impl Into<String>) -> Self {
        Self {
            source,
            agent_id: agent_id.into(),
            loader: Loader::new("agent_skill"),
        }
    }

    pub fn state(&self) -> &ViewState<SkillRow> {
        &self.loader.state
    }

    pub async fn load(&mut self) -> &ViewState<SkillRow> {
        let source = &self.source;
        let agent_id = self.agent_id.as_str();
        self.loader
            .run(async move { source.fetch_agent_skill(agent_id).await })
            .await
    }

    pub async fn reload(&mut self) -> &ViewState<SkillRow> {
        self.load().await
    }
}

/// Daily metrics of one agent over a trailing window.
pub struct AgentMetricsPage {
    source: Arc<dyn DashboardSource>,
    agent_id: String,
    days: u32,
    loader: Loader<Vec<AgentMetricsRow>>,
}

impl AgentMetricsPage {
    pub fn new(source: Arc<dyn DashboardSource>, agent_id: impl Into<String>) -> Self {
        Self {
            source,
            agent_id: agent_id.into(),
            days: DEFAULT_METRICS_DAYS,
            loader: Loader::new("agent_metrics"),
        }
    }

    pub fn with_days(mut self, days: u32) -> Self {
        self.days = days;
        self
    }

    pub fn state(&self) -> &ViewState<Vec<AgentMetricsRow>> {
        &self.loader.state
    }

    pub async fn load(&mut self) -> &ViewState<Vec<AgentMetricsRow>> {
        let source = &self.source;
        let agent_id = self.agent_id.as_str();
        let days = self.days;
        self.loader
            .run(async move { source.fetch_agent_metrics(agent_id, days).await })
            .await
    }

    pub async fn reload(&mut self) -> &ViewState<Vec<AgentMetricsRow>> {
        self.load().await
    }
}

/// Test history with client-side search and filters.
///
/// Changing the filter never refetches; it only changes [`visible`](Self::visible).
pub struct TestHistoryPage {
    source: Arc<dyn DashboardSource>,
    page: PageRequest,
    filter: TestFilter,
    loader: Loader<Vec<TestResultRow>>,
}

impl TestHistoryPage {
    pub fn new(source: Arc<dyn DashboardSource>, page: PageRequest) -> Self {
        Self {
            source,
            page,
            filter: TestFilter::default(),
            loader: Loader::new("test_history"),
        }
    }

    pub fn filter(&self) -> &TestFilter {
        &self.filter
    }

    pub fn set_filter(&mut self, filter: TestFilter) {
        self.filter = filter;
    }

    pub fn state(&self) -> &ViewState<Vec<TestResultRow>> {
        &self.loader.state
    }

    /// Loaded rows passing the current filter, newest first.
    pub fn visible(&self) -> Vec<TestResultRow> {
        match self.loader.state.data() {
            Some(rows) => self.filter.apply(rows),
            None => Vec::new(),
        }
    }

    pub async fn load(&mut self) -> &ViewState<Vec<TestResultRow>> {
        let source = &self.source;
        let page = self.page;
        self.loader
            .run(async move { source.fetch_test_results(page).await })
            .await
    }

    pub async fn reload(&mut self) -> &ViewState<Vec<TestResultRow>> {
        self.load().await
    }
}

/// A single test result.
pub struct TestDetailPage {
    source: Arc<dyn DashboardSource>,
    test_id: String,
    loader: Loader<TestResultDetail>,
}

impl TestDetailPage {
    pub fn new(source: Arc<dyn DashboardSource>, test_id: impl Into<String>) -> Self {
        Self {
            source,
            test_id: test_id.into(),
            loader: Loader::new("test_detail"),
        }
    }

    pub fn state(&self) -> &ViewState<TestResultDetail> {
        &self.loader.state
    }

    pub async fn load(&mut self) -> &ViewState<TestResultDetail> {
        let source = &self.source;
        let test_id = self.test_id.as_str();
        self.loader
            .run(async move { source.fetch_test_result(test_id).await })
            .await
    }

    pub async fn reload(&mut self) -> &ViewState<TestResultDetail> {
        self.load().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DashboardError;
    use evalboard_store::StoreError;

    #[test]
    fn settle_maps_results_to_terminal_states() {
        let ready: ViewState<Vec<u8>> = ViewState::settle(Ok(vec![1]));
        assert_eq!(ready, ViewState::Ready(vec![1]));

        let empty: ViewState<Vec<u8>> = ViewState::settle(Ok(vec![]));
        assert_eq!(empty, ViewState::Empty);

        let missing: ViewState<Vec<u8>> =
            ViewState::settle(Err(DashboardError::AgentNotFound("a-9".to_string())));
        assert_eq!(
            missing,
            ViewState::NotFound {
                what: "agent a-9".to_string()
            }
        );

        let failed: ViewState<Vec<u8>> = ViewState::settle(Err(StoreError::Http {
            status: 503,
            body: "down".to_string(),
        }
        .into()));
        assert!(failed.error_message().is_some());
        assert!(failed.is_settled());
    }

    #[test]
    fn idle_and_loading_are_not_settled() {
        assert!(!ViewState::<Vec<u8>>::Idle.is_settled());
        assert!(!ViewState::<Vec<u8>>::Loading.is_settled());
        assert_eq!(ViewState::<Vec<u8>>::default(), ViewState::Idle);
    }

    #[test]
    fn serializes_with_state_tag() {
        let state: ViewState<Vec<u8>> = ViewState::Failed {
            message: "boom".to_string(),
        };
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["state"], "failed");
        assert_eq!(value["data"]["message"], "boom");
    }
}
