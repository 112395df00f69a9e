//! evalboard - AI agent evaluation dashboard CLI
//!
//! Renders the dashboard pages in the terminal.
//!
//! ## Commands
//!
//! - `overview`: headline stats and the weekly score trend
//! - `agents`: agent listing
//! - `agent`: one agent with its recent tests
//! - `skill`: latest skill version of an agent
//! - `metrics`: daily metrics of an agent
//! - `tests`: searchable test history
//! - `test`: one test result with its breakdown
//! - `health`: data source reachability

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, Level};

use evalboard_core::{
    classify_score, AgentDetailPage, AgentListQuery, AgentMetricsPage, AgentPage, AgentView,
    AgentsPage, DashboardConfig, DashboardSource, HealthReport, HealthStatus, Overview,
    OverviewPage, PageRequest, ScoreBand, SkillPage, SourceKind, StatusFilter, TestDetailPage,
    TestFilter, TestHistoryPage, TestResultDetail, ViewState, METRICS,
};
use evalboard_store::{AgentMetricsRow, AgentStatus, SkillRow, TestResultRow};

#[derive(Parser)]
#[command(name = "evalboard")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "AI agent evaluation dashboard", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output and JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Data source: fixture or remote
    #[arg(long, global = true, env = "EVALBOARD_SOURCE")]
    source: Option<SourceKind>,

    /// JSON fixture file for the fixture source
    #[arg(long, global = true, env = "EVALBOARD_FIXTURE")]
    fixture: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show headline stats and the weekly score trend
    Overview,

    /// List agents, most recently tested first
    Agents {
        /// Only agents with this status
        #[arg(short, long)]
        status: Option<AgentStatus>,

        /// Maximum number of agents to show
        #[arg(short, long, default_value = "100")]
        limit: usize,

        /// Number of agents to skip
        #[arg(long, default_value = "0")]
        offset: usize,
    },

    /// Show one agent and its recent tests
    Agent {
        /// Agent id
        id: String,

        /// Number of recent tests to show
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// Number of newest tests to skip
        #[arg(long, default_value = "0")]
        offset: usize,
    },

    /// Show the latest skill version of an agent
    Skill {
        /// Agent id
        id: String,
    },

    /// Show daily metrics of an agent
    Metrics {
        /// Agent id
        id: String,

        /// Trailing window in days
        #[arg(short, long, default_value = "30")]
        days: u32,
    },

    /// Search the test history
    Tests {
        /// Case-insensitive substring of the agent name
        #[arg(short, long)]
        query: Option<String>,

        /// all, passed, warning or failed
        #[arg(short, long, default_value = "all")]
        status: StatusFilter,

        /// all, high, medium or low
        #[arg(short, long, default_value = "all")]
        band: ScoreBand,

        /// Number of most recent tests to load
        #[arg(short, long, default_value = "100")]
        limit: usize,
    },

    /// Show one test result with its breakdown
    Test {
        /// Test result id
        id: String,
    },

    /// Check that the data source is reachable
    Health,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    evalboard_core::init_tracing(cli.json, level);

    let mut config =
        DashboardConfig::from_env().context("Failed to read dashboard configuration")?;
    if let Some(kind) = cli.source {
        config = config.with_source(kind);
    }
    if let Some(path) = &cli.fixture {
        config = config.with_fixture(path);
    }

    let service = config
        .build_service()
        .await
        .context("Failed to open data source")?;
    debug!(source = %service.describe(), "using data source");
    let source: Arc<dyn DashboardSource> = Arc::new(service);

    let ok = match cli.command {
        Commands::Overview => cmd_overview(source, cli.json).await?,
        Commands::Agents {
            status,
            limit,
            offset,
        } => {
            let mut query = AgentListQuery::default().with_limit(limit).with_offset(offset);
            if let Some(status) = status {
                query = query.with_status(status);
            }
            cmd_agents(source, query, cli.json).await?
        }
        Commands::Agent { id, limit, offset } => {
            let tests = PageRequest { offset, limit };
            cmd_agent(source, &id, tests, cli.json).await?
        }
        Commands::Skill { id } => cmd_skill(source, &id, cli.json).await?,
        Commands::Metrics { id, days } => cmd_metrics(source, &id, days, cli.json).await?,
        Commands::Tests {
            query,
            status,
            band,
            limit,
        } => {
            let mut filter = TestFilter::new().with_status(status).with_band(band);
            if let Some(query) = query {
                filter = filter.with_query(query);
            }
            cmd_tests(source, filter, limit, cli.json).await?
        }
        Commands::Test { id } => cmd_test(source, &id, cli.json).await?,
        Commands::Health => cmd_health(source, cli.json).await?,
    };

    METRICS.flush();
    Ok(if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn cmd_overview(source: Arc<dyn DashboardSource>, json: bool) -> Result<bool> {
    let mut page = OverviewPage::new(source);
    let state = page.load().await;
    report(
        state,
        json,
        "overview",
        "No agents found. Nothing has been evaluated yet.",
        render_overview,
    )
}

async fn cmd_agents(
    source: Arc<dyn DashboardSource>,
    query: AgentListQuery,
    json: bool,
) -> Result<bool> {
    let mut page = AgentsPage::new(source, query);
    let state = page.load().await;
    report(
        state,
        json,
        "agents",
        "No agents found.",
        |agents| render_agents(agents),
    )
}

async fn cmd_agent(
    source: Arc<dyn DashboardSource>,
    id: &str,
    tests: PageRequest,
    json: bool,
) -> Result<bool> {
    let mut page = AgentDetailPage::new(source, id)
        .with_tests_limit(tests.limit)
        .with_tests_offset(tests.offset);
    let state = page.load().await;
    report(state, json, "agent", "No data for this agent.", render_agent)
}

async fn cmd_skill(source: Arc<dyn DashboardSource>, id: &str, json: bool) -> Result<bool> {
    let mut page = SkillPage::new(source, id);
    let state = page.load().await;
    report(state, json, "skill", "No skill recorded.", render_skill)
}

async fn cmd_metrics(
    source: Arc<dyn DashboardSource>,
    id: &str,
    days: u32,
    json: bool,
) -> Result<bool> {
    let mut page = AgentMetricsPage::new(source, id).with_days(days);
    let state = page.load().await;
    let empty = format!("No metrics recorded in the last {} days.", days);
    report(state, json, "metrics", &empty, |rows| render_metrics(rows))
}

/// JSON shape of the `tests` command.
#[derive(Serialize)]
struct TestsOutput<'a> {
    loaded: usize,
    filter: &'a TestFilter,
    tests: Vec<TestResultRow>,
}

async fn cmd_tests(
    source: Arc<dyn DashboardSource>,
    filter: TestFilter,
    limit: usize,
    json: bool,
) -> Result<bool> {
    let mut page = TestHistoryPage::new(source, PageRequest::first(limit));
    page.set_filter(filter);
    page.load().await;

    let Some(loaded) = page.state().data() else {
        return report(
            page.state(),
            json,
            "tests",
            "No test results found.",
            |rows| render_tests(rows),
        );
    };

    let visible = page.visible();
    if json {
        let output = TestsOutput {
            loaded: loaded.len(),
            filter: page.filter(),
            tests: visible,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if visible.is_empty() {
        println!(
            "No tests match the current filters ({} loaded).",
            loaded.len()
        );
    } else {
        println!("{}", render_tests(&visible));
        println!("\n{} of {} loaded tests shown", visible.len(), loaded.len());
    }
    Ok(true)
}

async fn cmd_test(source: Arc<dyn DashboardSource>, id: &str, json: bool) -> Result<bool> {
    let mut page = TestDetailPage::new(source, id);
    let state = page.load().await;
    report(state, json, "test", "No data for this test.", render_test)
}

async fn cmd_health(source: Arc<dyn DashboardSource>, json: bool) -> Result<bool> {
    let report = source.health_check().await;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", render_health(&report));
    }
    Ok(report.status == HealthStatus::Healthy)
}

/// Print a settled page. `Ok(false)` means the page failed to load.
fn report<T, F>(
    state: &ViewState<T>,
    json: bool,
    page: &str,
    empty_message: &str,
    render: F,
) -> Result<bool>
where
    T: Serialize,
    F: Fn(&T) -> String,
{
    if json {
        println!("{}", serde_json::to_string_pretty(state)?);
        return Ok(settled_ok(state));
    }

    match state {
        ViewState::Ready(data) => println!("{}", render(data)),
        ViewState::Empty => println!("{}", empty_message),
        ViewState::NotFound { what } => eprintln!("Not found: {}", what),
        ViewState::Failed { message } => eprintln!("{}", render_failure(page, message)),
        ViewState::Idle | ViewState::Loading => {
            anyhow::bail!("{} page did not finish loading", page)
        }
    }
    Ok(settled_ok(state))
}

fn settled_ok<T>(state: &ViewState<T>) -> bool {
    matches!(state, ViewState::Ready(_) | ViewState::Empty)
}

fn render_failure(page: &str, message: &str) -> String {
    format!(
        "Failed to load {}: {}\nRe-run the command to reload.",
        page, message
    )
}

fn render_overview(overview: &Overview) -> String {
    let stats = &overview.stats;
    let mut out = String::new();
    out.push_str("Overview\n");
    out.push_str("========\n");
    out.push_str(&format!("agents:        {}\n", stats.total_agents));
    out.push_str(&format!("average score: {:.1}\n", stats.average_score));
    out.push_str(&format!("tests run:     {}\n", stats.tests_run));
    out.push_str(&format!("pass rate:     {:.1}%\n", stats.pass_rate));

    out.push_str("\nWeekly score trend\n");
    if overview.trend.is_empty() {
        out.push_str("  no tests in the last 30 days\n");
    }
    for point in &overview.trend {
        out.push_str(&format!(
            "  {}  {:>4.1}  {}\n",
            point.week_start,
            point.average_score,
            bar(point.average_score)
        ));
    }

    out.trim_end().to_string()
}

fn render_agents(agents: &[AgentView]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<36}  {:<24}  {:<10}  {:<17}  {:>5}  {}\n",
        "ID", "NAME", "VERSION", "STATUS", "SCORE", "LAST EVALUATION"
    ));
    for agent in agents {
        out.push_str(&format!(
            "{:<36}  {:<24}  {:<10}  {:<17}  {:>5.1}  {}\n",
            agent.id,
            truncate(&agent.name, 24),
            truncate(&agent.version, 10),
            agent.status,
            agent.score,
            agent.last_evaluation.format("%Y-%m-%d %H:%M")
        ));
    }
    out.trim_end().to_string()
}

fn render_agent(page: &AgentPage) -> String {
    let detail = &page.detail;
    let row = &detail.row;
    let mut out = String::new();
    out.push_str(&format!("{} v{}\n", detail.view.name, detail.view.version));
    out.push_str(&format!("id:              {}\n", detail.view.id));
    out.push_str(&format!("status:          {}\n", detail.view.status));
    out.push_str(&format!(
        "approved:        {}\n",
        if row.framework_approved { "yes" } else { "no" }
    ));
    out.push_str(&format!(
        "last evaluation: {}\n",
        detail.view.last_evaluation.format("%Y-%m-%d %H:%M")
    ));
    match row.last_test_score {
        Some(score) => out.push_str(&format!(
            "last score:      {:.1} ({})\n",
            score,
            classify_score(score)
        )),
        None => out.push_str("last score:      not tested\n"),
    }
    out.push_str(&format!("tests recorded:  {}\n", detail.total_tests));
    out.push_str(&format!(
        "last 7 days:     {} conversations, {} resolved, {} escalations\n",
        row.conversations_7d, row.resolved_7d, row.escalations_7d
    ));

    out.push_str("\nRecent tests\n");
    if page.recent_tests.is_empty() {
        out.push_str("  none\n");
    } else {
        out.push_str(&render_tests(&page.recent_tests));
        out.push('\n');
    }
    out.trim_end().to_string()
}

fn render_skill(skill: &SkillRow) -> String {
    let mut out = String::new();
    out.push_str(&format!("Skill v{}\n", skill.version));
    out.push_str(&format!("id:      {}\n", skill.id));
    out.push_str(&format!("agent:   {}\n", skill.agent_version_id));
    if let Some(synced) = skill.last_synced_at {
        out.push_str(&format!("synced:  {}\n", synced.format("%Y-%m-%d %H:%M")));
    }
    if let Some(path) = &skill.local_file_path {
        out.push_str(&format!("file:    {}\n", path));
    }
    let cases = skill
        .test_cases
        .as_ref()
        .and_then(|v| v.as_array())
        .map_or(0, Vec::len);
    out.push_str(&format!("cases:   {}\n", cases));

    for (title, body) in [
        ("Instructions", Some(&skill.instructions)),
        ("Examples", skill.examples.as_ref()),
        ("Rubric", skill.rubric.as_ref()),
    ] {
        let Some(body) = body.filter(|b| !b.trim().is_empty()) else {
            continue;
        };
        out.push_str(&format!("\n{}\n", title));
        for line in body.lines() {
            out.push_str(&format!("  {}\n", line));
        }
    }
    out.trim_end().to_string()
}

fn render_metrics(rows: &[AgentMetricsRow]) -> String {
    let columns: BTreeSet<&str> = rows
        .iter()
        .flat_map(|r| r.values.keys().map(String::as_str))
        .filter(|c| *c != "id")
        .collect();

    let mut out = format!("{:<10}", "DAY");
    for column in &columns {
        out.push_str(&format!("  {:>12}", truncate(column, 12)));
    }
    out.push('\n');
    for row in rows {
        out.push_str(&row.day.to_string());
        for column in &columns {
            let cell = match row.values.get(*column) {
                Some(serde_json::Value::Number(n)) => n.to_string(),
                Some(serde_json::Value::String(s)) => s.clone(),
                Some(serde_json::Value::Null) | None => "-".to_string(),
                Some(other) => other.to_string(),
            };
            out.push_str(&format!("  {:>12}", truncate(&cell, 12)));
        }
        out.push('\n');
    }
    out.trim_end().to_string()
}

fn render_tests(tests: &[TestResultRow]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<36}  {:<16}  {:<24}  {:>5}  {:<7}  {:>8}\n",
        "ID", "TESTED AT", "AGENT", "SCORE", "STATUS", "DURATION"
    ));
    for test in tests {
        out.push_str(&format!(
            "{:<36}  {:<16}  {:<24}  {:>5.1}  {:<7}  {:>7.1}s\n",
            test.id,
            test.tested_at.format("%Y-%m-%d %H:%M").to_string(),
            truncate(&test.agent_name, 24),
            test.overall_score,
            classify_score(test.overall_score),
            test.test_duration_ms as f64 / 1000.0
        ));
    }
    out.trim_end().to_string()
}

fn render_test(detail: &TestResultDetail) -> String {
    let row = &detail.row;
    let breakdown = &detail.breakdown;
    let mut out = String::new();
    out.push_str(&format!("Test {}\n", row.id));
    out.push_str(&format!(
        "agent:     {} v{}\n",
        row.agent_name, row.agent_version
    ));
    out.push_str(&format!(
        "tested at: {}\n",
        row.tested_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out.push_str(&format!(
        "score:     {:.1} ({})\n",
        row.overall_score, detail.status
    ));
    out.push_str(&format!(
        "duration:  {:.1}s\n",
        row.test_duration_ms as f64 / 1000.0
    ));
    if let Some(model) = &row.evaluator_model {
        out.push_str(&format!("evaluator: {}\n", model));
    }
    if let Some(url) = &row.report_url {
        out.push_str(&format!("report:    {}\n", url));
    }

    if breakdown.is_empty() {
        out.push_str("\nNo evaluation breakdown recorded.\n");
        return out.trim_end().to_string();
    }

    if !breakdown.dimensions.is_empty() {
        out.push_str("\nScores\n");
        for dim in &breakdown.dimensions {
            out.push_str(&format!(
                "  {:<14} {:>4.1}  {:<7}  {}\n",
                dim.name,
                dim.score,
                dim.status,
                bar(dim.score)
            ));
        }
    }

    for (title, items) in [
        ("Strengths", &breakdown.strengths),
        ("Weaknesses", &breakdown.weaknesses),
        ("Failures", &breakdown.failures),
        ("Warnings", &breakdown.warnings),
        ("Recommendations", &breakdown.recommendations),
    ] {
        if items.is_empty() {
            continue;
        }
        out.push_str(&format!("\n{}\n", title));
        for item in items {
            out.push_str(&format!("  - {}\n", item));
        }
    }

    out.trim_end().to_string()
}

fn render_health(report: &HealthReport) -> String {
    let mut out = format!(
        "status:    {}\nsource:    {}\nconnected: {}\nlatency:   {} ms",
        report.status,
        report.source,
        if report.connected { "yes" } else { "no" },
        report.latency_ms
    );
    if let Some(error) = &report.error {
        out.push_str(&format!("\nerror:     {}", error));
    }
    out
}

/// Ten-cell bar for a 0-10 score.
fn bar(score: f64) -> String {
    let filled = score.clamp(0.0, 10.0).round() as usize;
    format!("{}{}", "#".repeat(filled), ".".repeat(10 - filled))
}

/// Truncate a string for display
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
