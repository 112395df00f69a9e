//! DashboardService behaviour over the in-memory row source.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use evalboard_core::{
    AgentListQuery, DashboardError, DashboardService, DashboardSource, HealthStatus, PageRequest,
    ScoreHistoryPoint, TestStatus, WeekStart, DEFAULT_METRICS_DAYS, MAX_TREND_POINTS,
};
use evalboard_store::timestamp::parse_timestamp;
use evalboard_store::{
    AgentMetricsRow, AgentPerformanceRow, AgentStatus, MemoryRowSource, ReadQuery, RowSource,
    SkillRow, StoreError, StoreResult, TestResultRow,
};
use serde_json::json;

fn now() -> DateTime<Utc> {
    parse_timestamp("2024-06-30T12:00:00Z").unwrap()
}

fn demo_service() -> DashboardService {
    let rows: Arc<dyn RowSource> = Arc::new(MemoryRowSource::demo(now()));
    DashboardService::new(rows).with_fixed_now(now())
}

fn test_row(id: &str, score: f64, tested_at: &str) -> TestResultRow {
    serde_json::from_value(json!({
        "id": id,
        "agent_version_id": "a-1",
        "agent_name": "Lead Qualifier",
        "agent_version": "1.0.0",
        "overall_score": score,
        "tested_at": tested_at,
    }))
    .unwrap()
}

/// Truncates every agent read to `max_rows`, the way a PostgREST server
/// applies its `max-rows` setting.
struct Capped {
    inner: MemoryRowSource,
    max_rows: usize,
    agent_reads: AtomicUsize,
}

#[async_trait]
impl RowSource for Capped {
    async fn agent_rows(&self, query: &ReadQuery) -> StoreResult<Vec<AgentPerformanceRow>> {
        self.agent_reads.fetch_add(1, Ordering::SeqCst);
        let mut rows = self.inner.agent_rows(query).await?;
        rows.truncate(self.max_rows);
        Ok(rows)
    }

    async fn test_rows(&self, query: &ReadQuery) -> StoreResult<Vec<TestResultRow>> {
        self.inner.test_rows(query).await
    }

    async fn skill_rows(&self, query: &ReadQuery) -> StoreResult<Vec<SkillRow>> {
        self.inner.skill_rows(query).await
    }

    async fn metric_rows(&self, query: &ReadQuery) -> StoreResult<Vec<AgentMetricsRow>> {
        self.inner.metric_rows(query).await
    }

    async fn ping(&self) -> StoreResult<()> {
        self.inner.ping().await
    }

    fn describe(&self) -> String {
        "capped".to_string()
    }
}

fn failing_service() -> DashboardService {
    let rows: Arc<dyn RowSource> =
        Arc::new(MemoryRowSource::new().failing("connection refused"));
    DashboardService::new(rows)
}

#[tokio::test]
async fn stats_over_demo_agents() {
    let stats = demo_service().fetch_stats().await.unwrap();
    assert_eq!(stats.total_agents, 6);
    // scored: 9.1, 7.6, 5.8, 8.4, 6.9
    assert_eq!(stats.average_score, 7.6);
    assert_eq!(stats.pass_rate, 40.0);
    assert_eq!(stats.tests_run, 105);
}

#[tokio::test]
async fn stats_page_through_capped_responses() {
    let capped = Arc::new(Capped {
        inner: MemoryRowSource::demo(now()),
        max_rows: 2,
        agent_reads: AtomicUsize::new(0),
    });
    let rows: Arc<dyn RowSource> = capped.clone();
    let service = DashboardService::new(rows).with_stats_page_size(2);

    let stats = service.fetch_stats().await.unwrap();
    assert_eq!(stats.total_agents, 6);
    assert_eq!(stats.average_score, 7.6);
    assert_eq!(stats.pass_rate, 40.0);
    assert_eq!(stats.tests_run, 105);
    // three full pages and the empty one that ends the read
    assert_eq!(capped.agent_reads.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn stats_over_empty_source_are_zero() {
    let rows: Arc<dyn RowSource> = Arc::new(MemoryRowSource::new());
    let stats = DashboardService::new(rows).fetch_stats().await.unwrap();
    assert_eq!(stats.total_agents, 0);
    assert_eq!(stats.average_score, 0.0);
    assert_eq!(stats.pass_rate, 0.0);
}

#[tokio::test]
async fn history_is_bounded_ascending_and_sunday_aligned() {
    let points = demo_service().fetch_history().await.unwrap();
    assert!(!points.is_empty());
    assert!(points.len() <= MAX_TREND_POINTS);
    assert!(points.windows(2).all(|w| w[0].week_start < w[1].week_start));
    assert!(points.iter().all(|p| p.week_start.weekday() == Weekday::Sun));
    assert!(points
        .iter()
        .all(|p| (0.0..=10.0).contains(&p.average_score)));
}

#[tokio::test]
async fn history_window_includes_its_lower_bound() {
    // now - 30d is Friday 2024-05-31T12:00Z; its Sunday week starts 2024-05-26
    let rows: Arc<dyn RowSource> = Arc::new(MemoryRowSource::new().with_tests(vec![
        test_row("on-boundary", 6.0, "2024-05-31T12:00:00Z"),
        test_row("just-before", 2.0, "2024-05-31T11:59:59Z"),
        test_row("same-week", 9.0, "2024-06-01T09:00:00Z"),
        test_row("later-week", 8.0, "2024-06-20T08:00:00Z"),
    ]));
    let service = DashboardService::new(rows).with_fixed_now(now());

    let points = service.fetch_history().await.unwrap();
    assert_eq!(
        points,
        vec![
            ScoreHistoryPoint {
                week_start: NaiveDate::from_ymd_opt(2024, 5, 26).unwrap(),
                average_score: 7.5,
            },
            ScoreHistoryPoint {
                week_start: NaiveDate::from_ymd_opt(2024, 6, 16).unwrap(),
                average_score: 8.0,
            },
        ]
    );
}

#[tokio::test]
async fn history_honours_monday_weeks() {
    let points = demo_service()
        .with_week_start(WeekStart::Monday)
        .fetch_history()
        .await
        .unwrap();
    assert!(points.iter().all(|p| p.week_start.weekday() == Weekday::Mon));
}

#[tokio::test]
async fn agents_are_listed_most_recent_first() {
    let agents = demo_service()
        .fetch_agents(&AgentListQuery::default())
        .await
        .unwrap();
    let names: Vec<&str> = agents.iter().map(|a| a.name.as_str()).collect();
    // never-tested agents carry a null last_test_at, which sorts first descending
    assert_eq!(
        names,
        vec![
            "Retention Coach",
            "Lead Qualifier",
            "Onboarding Guide",
            "Support Triage",
            "Billing Assistant",
            "Scheduling Agent",
        ]
    );
    assert_eq!(agents[0].score, 0.0);
    assert_eq!(
        agents[0].last_evaluation,
        now() - chrono::Duration::days(3)
    );
}

#[tokio::test]
async fn agents_can_be_filtered_and_paged() {
    let service = demo_service();
    let active = service
        .fetch_agents(&AgentListQuery::default().with_status(AgentStatus::Active))
        .await
        .unwrap();
    assert_eq!(active.len(), 3);
    assert!(active.iter().all(|a| a.status == AgentStatus::Active));

    let page = service
        .fetch_agents(&AgentListQuery::default().with_limit(2).with_offset(1))
        .await
        .unwrap();
    let names: Vec<&str> = page.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["Lead Qualifier", "Onboarding Guide"]);

    let none = service
        .fetch_agents(&AgentListQuery::default().with_limit(0))
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_results_are_newest_first_and_paged() {
    let service = demo_service();
    let all = service
        .fetch_test_results(PageRequest::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 35);
    assert!(all.windows(2).all(|w| w[0].tested_at >= w[1].tested_at));

    let page = service
        .fetch_test_results(PageRequest {
            offset: 5,
            limit: 10,
        })
        .await
        .unwrap();
    assert_eq!(page.len(), 10);
    assert_eq!(page[0], all[5]);
}

#[tokio::test]
async fn agent_detail_counts_tests() {
    let service = demo_service();
    let agents = service
        .fetch_agents(&AgentListQuery::default())
        .await
        .unwrap();
    let lead = agents
        .iter()
        .find(|a| a.name == "Lead Qualifier")
        .unwrap();

    let detail = service.fetch_agent(&lead.id).await.unwrap();
    assert_eq!(detail.view, *lead);
    assert_eq!(detail.total_tests, 7);
    let latest = detail.latest_test.unwrap();
    assert_eq!(latest.overall_score, 9.1);
    assert_eq!(Some(latest.tested_at), detail.row.last_test_at);

    let recent = service
        .fetch_agent_tests(&lead.id, PageRequest::first(3))
        .await
        .unwrap();
    assert_eq!(recent.len(), 3);
    assert_eq!(recent[0].id, latest.id);

    let older = service
        .fetch_agent_tests(
            &lead.id,
            PageRequest {
                offset: 2,
                limit: 10,
            },
        )
        .await
        .unwrap();
    assert_eq!(older.len(), 5);
    assert_eq!(older[0], recent[2]);
}

#[tokio::test]
async fn skill_is_the_latest_version() {
    let service = demo_service();
    let agents = service
        .fetch_agents(&AgentListQuery::default())
        .await
        .unwrap();
    // demo agents carry one to three skill versions by position
    let triage = agents.iter().find(|a| a.name == "Support Triage").unwrap();
    let skill = service.fetch_agent_skill(&triage.id).await.unwrap();
    assert_eq!(skill.agent_version_id, triage.id);
    assert_eq!(skill.version, 2);
    assert!(skill.instructions.contains("v2"));

    let coach = agents.iter().find(|a| a.name == "Retention Coach").unwrap();
    let err = service.fetch_agent_skill(&coach.id).await.unwrap_err();
    assert!(matches!(err, DashboardError::SkillNotFound(ref id) if *id == coach.id));
}

#[tokio::test]
async fn metrics_cover_the_trailing_days_oldest_first() {
    let service = demo_service();
    let agents = service
        .fetch_agents(&AgentListQuery::default())
        .await
        .unwrap();
    let lead = agents.iter().find(|a| a.name == "Lead Qualifier").unwrap();

    let metrics = service
        .fetch_agent_metrics(&lead.id, DEFAULT_METRICS_DAYS)
        .await
        .unwrap();
    let first_day = (now() - Duration::days(30)).date_naive();
    assert_eq!(metrics.len(), 31);
    assert_eq!(metrics[0].day, first_day);
    assert_eq!(metrics.last().unwrap().day, now().date_naive());
    assert!(metrics.windows(2).all(|w| w[0].day < w[1].day));
    assert!(metrics.iter().all(|m| m.agent_version_id == lead.id));
    assert!(metrics.iter().all(|m| m.number("conversations").is_some()));

    let week = service.fetch_agent_metrics(&lead.id, 6).await.unwrap();
    assert_eq!(week.len(), 7);

    let none = service.fetch_agent_metrics("no-such-agent", 30).await.unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn untested_agent_has_no_latest_test() {
    let service = demo_service();
    let agents = service
        .fetch_agents(&AgentListQuery::default().with_status(AgentStatus::Testing))
        .await
        .unwrap();
    let detail = service.fetch_agent(&agents[0].id).await.unwrap();
    assert_eq!(detail.total_tests, 0);
    assert!(detail.latest_test.is_none());
}

#[tokio::test]
async fn missing_agent_is_not_found() {
    let err = demo_service().fetch_agent("no-such-agent").await.unwrap_err();
    assert!(matches!(err, DashboardError::AgentNotFound(ref id) if id == "no-such-agent"));
}

#[tokio::test]
async fn test_result_detail_includes_breakdown() {
    let service = demo_service();
    let tests = service
        .fetch_test_results(PageRequest::first(1))
        .await
        .unwrap();
    let detail = service.fetch_test_result(&tests[0].id).await.unwrap();
    assert_eq!(detail.row, tests[0]);
    assert_eq!(detail.breakdown.dimensions.len(), 5);
    assert_eq!(detail.breakdown.dimensions[0].name, "completeness");
    assert!(!detail.breakdown.recommendations.is_empty());

    let err = service.fetch_test_result("missing").await.unwrap_err();
    assert!(matches!(err, DashboardError::TestResultNotFound(_)));
}

#[tokio::test]
async fn low_scores_classify_as_failed() {
    let service = demo_service();
    let agents = service
        .fetch_agents(&AgentListQuery::default().with_status(AgentStatus::NeedsImprovement))
        .await
        .unwrap();
    let detail = service.fetch_agent(&agents[0].id).await.unwrap();
    let latest = detail.latest_test.unwrap();
    let test = service.fetch_test_result(&latest.id).await.unwrap();
    assert_eq!(test.status, TestStatus::Failed);
    assert!(!test.breakdown.failures.is_empty());
}

#[tokio::test]
async fn store_failures_surface_verbatim() {
    let err = failing_service().fetch_stats().await.unwrap_err();
    assert!(matches!(err, DashboardError::Fetch(StoreError::Connection(_))));
    assert_eq!(
        err.to_string(),
        "connection to data store failed: connection refused"
    );

    let err = failing_service().fetch_agent("a").await.unwrap_err();
    assert!(matches!(err, DashboardError::Fetch(_)));
}

#[tokio::test]
async fn health_check_reports_without_failing() {
    let healthy = demo_service().health_check().await;
    assert_eq!(healthy.status, HealthStatus::Healthy);
    assert!(healthy.connected);
    assert!(healthy.error.is_none());
    assert_eq!(healthy.source, "built-in demo fixture");

    let degraded = failing_service().health_check().await;
    assert_eq!(degraded.status, HealthStatus::Degraded);
    assert!(!degraded.connected);
    assert!(degraded.error.unwrap().contains("connection refused"));
}
