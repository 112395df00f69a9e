//! evalboard core library
//!
//! Turns agent and test rows into what the dashboard pages show: overview
//! stats, the weekly score trend, agent listings and details, skills,
//! daily metrics, and the filterable test history. Pages load through [`DashboardSource`] and
//! settle into a [`ViewState`].

pub mod aggregate;
pub mod config;
pub mod domain;
pub mod filter;
pub mod mapper;
pub mod metrics;
pub mod obs;
pub mod source;
pub mod telemetry;
pub mod views;

pub use aggregate::{
    bucket_weekly, compute_stats, round1, trend_window_start, WeekStart, MAX_TREND_POINTS,
    TREND_WINDOW_DAYS,
};
pub use config::{DashboardConfig, SourceKind};
pub use domain::{
    classify_score, is_passing, AgentDetail, AgentView, DashboardError, DashboardStats,
    DimensionScore, Result, ScoreHistoryPoint, TestBreakdown, TestResultDetail, TestStatus,
    PASS_THRESHOLD, WARNING_THRESHOLD,
};
pub use filter::{ScoreBand, StatusFilter, TestFilter};
pub use mapper::{to_agent_view, to_agent_views};
pub use source::{
    AgentListQuery, DashboardService, DashboardSource, HealthReport, HealthStatus, PageRequest,
    DEFAULT_AGENT_LIMIT, DEFAULT_AGENT_TESTS_LIMIT, DEFAULT_HISTORY_LIMIT, DEFAULT_METRICS_DAYS,
    STATS_PAGE_SIZE,
};
pub use views::{
    AgentDetailPage, AgentMetricsPage, AgentPage, AgentsPage, EmptyState, Overview, OverviewPage,
    SkillPage, TestDetailPage, TestHistoryPage, ViewState,
};

pub use metrics::METRICS;
pub use obs::{emit_fetch_finished, emit_page_failed, emit_page_loaded, page_span, PageSpan};
pub use telemetry::init_tracing;

/// evalboard version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
