//! In-memory row source
//!
//! `MemoryRowSource` evaluates [`ReadQuery`] values against rows held in
//! memory. It backs the offline fixture mode of the dashboard and the test
//! suites of every crate above this one.

use std::cmp::Ordering as CmpOrdering;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::StoreError;
use crate::fixture::{demo_fixture, Fixture};
use crate::query::{Direction, Filter, ReadQuery};
use crate::schema::{
    AgentMetricsRow, AgentPerformanceRow, SkillRow, TestResultRow, AGENT_COLUMNS,
    AGENT_METRICS_TABLE, AGENT_PERFORMANCE_VIEW, METRIC_COLUMNS, SKILLS_TABLE, SKILL_COLUMNS,
    TEST_COLUMNS, TEST_RESULTS_VIEW,
};
use crate::source_traits::{RowSource, StoreResult};
use crate::timestamp::parse_timestamp;

/// In-memory row source backed by one row vector per relation.
///
/// Comparison rules mirror what Postgres does for the column types involved:
/// numbers compare numerically, timestamps chronologically, everything else
/// as text. Nulls never satisfy `eq`/`gte` and sort as the largest value
/// (last ascending, first descending).
#[derive(Debug, Clone, Default)]
pub struct MemoryRowSource {
    agents: Vec<AgentPerformanceRow>,
    tests: Vec<TestResultRow>,
    skills: Vec<SkillRow>,
    metrics: Vec<AgentMetricsRow>,
    failure: Option<String>,
    label: Option<String>,
}

impl MemoryRowSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_agents(mut self, agents: Vec<AgentPerformanceRow>) -> Self {
        self.agents = agents;
        self
    }

    pub fn with_tests(mut self, tests: Vec<TestResultRow>) -> Self {
        self.tests = tests;
        self
    }

    pub fn with_skills(mut self, skills: Vec<SkillRow>) -> Self {
        self.skills = skills;
        self
    }

    pub fn with_metrics(mut self, metrics: Vec<AgentMetricsRow>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Make every read fail with a connection error carrying `message`.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    pub fn from_fixture(fixture: Fixture) -> Self {
        Self::new()
            .with_agents(fixture.agents)
            .with_tests(fixture.tests)
            .with_skills(fixture.skills)
            .with_metrics(fixture.metrics)
    }

    /// Load rows from a JSON fixture file.
    pub async fn from_fixture_file(path: &Path) -> StoreResult<Self> {
        let fixture = Fixture::load(path).await?;
        let mut source = Self::from_fixture(fixture);
        source.label = Some(format!("fixture file {}", path.display()));
        Ok(source)
    }

    /// Built-in demo dataset anchored at `now`.
    pub fn demo(now: DateTime<Utc>) -> Self {
        let mut source = Self::from_fixture(demo_fixture(now));
        source.label = Some("built-in demo fixture".to_string());
        source
    }

    fn check_failure(&self) -> StoreResult<()> {
        match &self.failure {
            Some(message) => Err(StoreError::Connection(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RowSource for MemoryRowSource {
    async fn agent_rows(&self, query: &ReadQuery) -> StoreResult<Vec<AgentPerformanceRow>> {
        self.check_failure()?;
        run_query(AGENT_PERFORMANCE_VIEW, AGENT_COLUMNS, &self.agents, query)
    }

    async fn test_rows(&self, query: &ReadQuery) -> StoreResult<Vec<TestResultRow>> {
        self.check_failure()?;
        run_query(TEST_RESULTS_VIEW, TEST_COLUMNS, &self.tests, query)
    }

    async fn skill_rows(&self, query: &ReadQuery) -> StoreResult<Vec<SkillRow>> {
        self.check_failure()?;
        run_query(SKILLS_TABLE, SKILL_COLUMNS, &self.skills, query)
    }

    async fn metric_rows(&self, query: &ReadQuery) -> StoreResult<Vec<AgentMetricsRow>> {
        self.check_failure()?;
        run_query(AGENT_METRICS_TABLE, METRIC_COLUMNS, &self.metrics, query)
    }

    async fn ping(&self) -> StoreResult<()> {
        self.check_failure()
    }

    fn describe(&self) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| "in-memory rows".to_string())
    }
}

fn run_query<T: Serialize + Clone>(
    relation: &str,
    known_columns: &[&str],
    rows: &[T],
    query: &ReadQuery,
) -> StoreResult<Vec<T>> {
    if let Some(column) = query.columns().find(|c| !known_columns.contains(c)) {
        return Err(StoreError::UnknownColumn {
            relation: relation.to_string(),
            column: column.to_string(),
        });
    }

    let mut encoded: Vec<(Map<String, Value>, &T)> = Vec::with_capacity(rows.len());
    for row in rows {
        match serde_json::to_value(row) {
            Ok(Value::Object(map)) => encoded.push((map, row)),
            Ok(other) => {
                return Err(StoreError::Decode {
                    relation: relation.to_string(),
                    detail: format!("row encoded as non-object: {other}"),
                })
            }
            Err(e) => {
                return Err(StoreError::Decode {
                    relation: relation.to_string(),
                    detail: e.to_string(),
                })
            }
        }
    }

    encoded.retain(|(map, _)| query.filters.iter().all(|f| matches_filter(map, f)));

    if let Some(order) = &query.order {
        encoded.sort_by(|(a, _), (b, _)| {
            let ord = compare_values(field(a, &order.column), field(b, &order.column));
            match order.direction {
                Direction::Asc => ord,
                Direction::Desc => ord.reverse(),
            }
        });
    }

    let offset = query.offset.unwrap_or(0);
    let limit = query.limit.unwrap_or(usize::MAX);
    Ok(encoded
        .into_iter()
        .skip(offset)
        .take(limit)
        .map(|(_, row)| row.clone())
        .collect())
}

fn field<'a>(map: &'a Map<String, Value>, column: &str) -> &'a Value {
    map.get(column).unwrap_or(&Value::Null)
}

fn matches_filter(map: &Map<String, Value>, filter: &Filter) -> bool {
    let value = field(map, filter.column());
    match filter {
        Filter::NotNull { .. } => !value.is_null(),
        Filter::Eq { value: literal, .. } => {
            compare_literal(value, literal) == Some(CmpOrdering::Equal)
        }
        Filter::Gte { value: literal, .. } => matches!(
            compare_literal(value, literal),
            Some(CmpOrdering::Greater | CmpOrdering::Equal)
        ),
    }
}

fn compare_literal(value: &Value, literal: &str) -> Option<CmpOrdering> {
    match value {
        Value::Null => None,
        Value::Bool(b) => literal.parse::<bool>().ok().map(|l| b.cmp(&l)),
        Value::Number(n) => {
            let literal: f64 = literal.parse().ok()?;
            n.as_f64()?.partial_cmp(&literal)
        }
        Value::String(s) => match (parse_timestamp(s), parse_timestamp(literal)) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => Some(s.as_str().cmp(literal)),
        },
        Value::Array(_) | Value::Object(_) => None,
    }
}

fn compare_values(a: &Value, b: &Value) -> CmpOrdering {
    match (a, b) {
        (Value::Null, Value::Null) => CmpOrdering::Equal,
        (Value::Null, _) => CmpOrdering::Greater,
        (_, Value::Null) => CmpOrdering::Less,
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(CmpOrdering::Equal),
        (Value::String(x), Value::String(y)) => match (parse_timestamp(x), parse_timestamp(y)) {
            (Some(p), Some(q)) => p.cmp(&q),
            _ => x.cmp(y),
        },
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => CmpOrdering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn agent(id: &str, score: Option<f64>, last_test_at: Option<&str>) -> AgentPerformanceRow {
        serde_json::from_value(json!({
            "id": id,
            "name": format!("agent-{id}"),
            "version": "1.0.0",
            "status": "active",
            "created_at": "2024-01-01",
            "last_test_at": last_test_at,
            "last_test_score": score,
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn not_null_and_order_desc_puts_nulls_first() {
        let source = MemoryRowSource::new().with_agents(vec![
            agent("a", Some(7.0), Some("2024-02-01")),
            agent("b", None, None),
            agent("c", Some(9.0), Some("2024-03-01")),
        ]);

        let rows = source
            .agent_rows(&ReadQuery::new().order_by("last_test_at", Direction::Desc))
            .await
            .unwrap();
        let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);

        let rows = source
            .agent_rows(&ReadQuery::new().not_null("last_test_score"))
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn gte_compares_timestamps_chronologically() {
        let source = MemoryRowSource::new().with_agents(vec![
            agent("a", Some(7.0), Some("2024-02-01T00:00:00+00:00")),
            agent("b", Some(8.0), Some("2024-02-10")),
        ]);
        let rows = source
            .agent_rows(&ReadQuery::new().gte("last_test_at", "2024-02-05T00:00:00.000Z"))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "b");
    }

    #[tokio::test]
    async fn eq_compares_numbers_numerically() {
        let source = MemoryRowSource::new().with_agents(vec![agent("a", Some(8.0), None)]);
        let rows = source
            .agent_rows(&ReadQuery::new().eq("last_test_score", "8"))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn range_pages_after_ordering() {
        let source = MemoryRowSource::new().with_agents(
            (0..10)
                .map(|i| agent(&format!("{i}"), Some(i as f64), None))
                .collect(),
        );
        let rows = source
            .agent_rows(
                &ReadQuery::new()
                    .order_by("last_test_score", Direction::Asc)
                    .range(3, 5),
            )
            .await
            .unwrap();
        let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "4", "5"]);
    }

    #[tokio::test]
    async fn range_past_the_end_is_empty() {
        let source = MemoryRowSource::new().with_agents(vec![agent("a", Some(7.0), None)]);
        let rows = source
            .agent_rows(&ReadQuery::new().range(usize::MAX, usize::MAX))
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn metric_days_compare_as_dates() {
        let metric = |day: &str| -> AgentMetricsRow {
            serde_json::from_value(json!({
                "agent_version_id": "a",
                "data": day,
                "conversations": 3
            }))
            .unwrap()
        };
        let source = MemoryRowSource::new().with_metrics(vec![
            metric("2024-06-03"),
            metric("2024-05-31"),
            metric("2024-06-01"),
        ]);
        let rows = source
            .metric_rows(
                &ReadQuery::new()
                    .gte("data", "2024-06-01")
                    .order_by("data", Direction::Asc),
            )
            .await
            .unwrap();
        let days: Vec<String> = rows.iter().map(|r| r.day.to_string()).collect();
        assert_eq!(days, vec!["2024-06-01", "2024-06-03"]);
    }

    #[tokio::test]
    async fn unknown_column_is_rejected_even_without_rows() {
        let source = MemoryRowSource::new();
        let err = source
            .test_rows(&ReadQuery::new().eq("agent_idd", "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownColumn { .. }));
    }

    #[tokio::test]
    async fn failing_source_errors_on_every_read() {
        let source = MemoryRowSource::demo(Utc::now()).failing("store offline");
        assert!(source.ping().await.is_err());
        let err = source.agent_rows(&ReadQuery::new()).await.unwrap_err();
        assert!(err.to_string().contains("store offline"));
    }
}
