//! Row shapes of the two relations the dashboard reads.
//!
//! - `AgentPerformanceRow`: one row per agent (`vw_agent_performance`)
//! - `TestResultRow`: one row per test execution (`vw_test_results_history`)
//! - `SkillRow`: one row per skill version of an agent (`agenttest_skills`)
//! - `AgentMetricsRow`: one row per agent and day (`agent_metrics`)
//!
//! Field names match the remote columns so the same names can be used in
//! [`ReadQuery`](crate::ReadQuery) filters against either source.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::timestamp;

/// Default relation name for per-agent rows.
pub const AGENT_PERFORMANCE_VIEW: &str = "vw_agent_performance";
/// Default relation name for per-test rows.
pub const TEST_RESULTS_VIEW: &str = "vw_test_results_history";

/// Default relation name for versioned agent skills.
pub const SKILLS_TABLE: &str = "agenttest_skills";
/// Default relation name for daily agent metrics.
pub const AGENT_METRICS_TABLE: &str = "agent_metrics";

/// Columns of [`AgentPerformanceRow`], in declaration order.
pub const AGENT_COLUMNS: &[&str] = &[
    "id",
    "name",
    "version",
    "status",
    "is_active",
    "framework_approved",
    "created_at",
    "last_test_at",
    "last_test_score",
    "total_tests",
    "conversations_7d",
    "resolved_7d",
    "escalations_7d",
];

/// Columns of [`TestResultRow`], in declaration order.
pub const TEST_COLUMNS: &[&str] = &[
    "id",
    "agent_version_id",
    "agent_name",
    "agent_version",
    "overall_score",
    "test_duration_ms",
    "tested_at",
    "report_url",
    "evaluator_model",
    "test_details",
];

/// Columns of [`SkillRow`], in declaration order.
pub const SKILL_COLUMNS: &[&str] = &[
    "id",
    "agent_version_id",
    "version",
    "instructions",
    "examples",
    "rubric",
    "test_cases",
    "local_file_path",
    "last_synced_at",
    "created_at",
];

/// Typed columns of [`AgentMetricsRow`]. Only these can be filtered or
/// ordered on by the in-memory source.
pub const METRIC_COLUMNS: &[&str] = &["agent_version_id", "data"];

/// Lifecycle status of an agent version as stored remotely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Active,
    Inactive,
    NeedsImprovement,
    Testing,
    Archived,
    /// Any status string this build does not know about.
    #[serde(other)]
    Unknown,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Active => "active",
            AgentStatus::Inactive => "inactive",
            AgentStatus::NeedsImprovement => "needs_improvement",
            AgentStatus::Testing => "testing",
            AgentStatus::Archived => "archived",
            AgentStatus::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for AgentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(AgentStatus::Active),
            "inactive" => Ok(AgentStatus::Inactive),
            "needs_improvement" => Ok(AgentStatus::NeedsImprovement),
            "testing" => Ok(AgentStatus::Testing),
            "archived" => Ok(AgentStatus::Archived),
            other => Err(format!("unknown agent status: {other}")),
        }
    }
}

/// One row of the agent-performance view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentPerformanceRow {
    pub id: String,
    pub name: String,
    /// Semantic version label; numeric versions are rendered as strings.
    #[serde(deserialize_with = "version_string")]
    pub version: String,
    pub status: AgentStatus,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub framework_approved: bool,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "timestamp::deserialize_option")]
    pub last_test_at: Option<DateTime<Utc>>,
    /// Most recent overall score, 0-10.
    #[serde(default)]
    pub last_test_score: Option<f64>,
    /// Cumulative number of test executions.
    #[serde(default)]
    pub total_tests: Option<u64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub conversations_7d: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub resolved_7d: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub escalations_7d: u64,
}

/// One row of the test-results-history view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResultRow {
    pub id: String,
    pub agent_version_id: String,
    pub agent_name: String,
    #[serde(deserialize_with = "version_string")]
    pub agent_version: String,
    /// Overall score, 0-10.
    pub overall_score: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub test_duration_ms: u64,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub tested_at: DateTime<Utc>,
    #[serde(default)]
    pub report_url: Option<String>,
    #[serde(default)]
    pub evaluator_model: Option<String>,
    /// Raw evaluation payload (dimension scores, strengths, ...).
    #[serde(default)]
    pub test_details: Option<serde_json::Value>,
}

/// One version of an agent's skill (instructions, examples, rubric).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillRow {
    pub id: String,
    pub agent_version_id: String,
    /// Monotonic per agent, starting at 1.
    pub version: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub instructions: String,
    #[serde(default)]
    pub examples: Option<String>,
    #[serde(default)]
    pub rubric: Option<String>,
    #[serde(default)]
    pub test_cases: Option<serde_json::Value>,
    #[serde(default)]
    pub local_file_path: Option<String>,
    #[serde(default, deserialize_with = "timestamp::deserialize_option")]
    pub last_synced_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "timestamp::deserialize_option")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Daily metrics of one agent.
///
/// Only the key columns are typed; every other column is kept as-is in
/// `values`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentMetricsRow {
    pub agent_version_id: String,
    /// Calendar day the metrics cover.
    #[serde(rename = "data", deserialize_with = "timestamp::deserialize_date")]
    pub day: NaiveDate,
    #[serde(flatten)]
    pub values: serde_json::Map<String, serde_json::Value>,
}

impl AgentMetricsRow {
    /// Numeric metric by column name.
    pub fn number(&self, column: &str) -> Option<f64> {
        self.values.get(column).and_then(serde_json::Value::as_f64)
    }
}

fn version_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected version string or number, got {other}"
        ))),
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn agent_row_tolerates_nulls_and_numeric_version() {
        let row: AgentPerformanceRow = serde_json::from_value(json!({
            "id": "a1",
            "name": "Support Bot",
            "version": 3,
            "status": "needs_improvement",
            "is_active": true,
            "framework_approved": null,
            "created_at": "2024-01-01",
            "last_test_at": null,
            "last_test_score": null,
            "total_tests": null,
            "conversations_7d": null,
            "resolved_7d": 4,
            "escalations_7d": null
        }))
        .unwrap();

        assert_eq!(row.version, "3");
        assert_eq!(row.status, AgentStatus::NeedsImprovement);
        assert!(!row.framework_approved);
        assert!(row.last_test_at.is_none());
        assert!(row.last_test_score.is_none());
        assert_eq!(row.conversations_7d, 0);
        assert_eq!(row.resolved_7d, 4);
    }

    #[test]
    fn column_lists_match_serialized_fields() {
        let agent: AgentPerformanceRow = serde_json::from_value(json!({
            "id": "a1",
            "name": "n",
            "version": "1.0.0",
            "status": "active",
            "created_at": "2024-01-01"
        }))
        .unwrap();
        let value = serde_json::to_value(&agent).unwrap();
        let mut keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort_unstable();
        let mut expected = AGENT_COLUMNS.to_vec();
        expected.sort_unstable();
        assert_eq!(keys, expected);

        let test: TestResultRow = serde_json::from_value(json!({
            "id": "t1",
            "agent_version_id": "a1",
            "agent_name": "n",
            "agent_version": "1.0.0",
            "overall_score": 7.0,
            "tested_at": "2024-01-01"
        }))
        .unwrap();
        let value = serde_json::to_value(&test).unwrap();
        let mut keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort_unstable();
        let mut expected = TEST_COLUMNS.to_vec();
        expected.sort_unstable();
        assert_eq!(keys, expected);
    }

    #[test]
    fn skill_row_tolerates_missing_optionals() {
        let skill: SkillRow = serde_json::from_value(json!({
            "id": "s1",
            "agent_version_id": "a1",
            "version": 2,
            "instructions": null,
            "last_synced_at": "2024-05-01 10:00:00+00"
        }))
        .unwrap();
        assert_eq!(skill.version, 2);
        assert!(skill.instructions.is_empty());
        assert!(skill.rubric.is_none());
        assert!(skill.last_synced_at.is_some());

        let value = serde_json::to_value(&skill).unwrap();
        let mut keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort_unstable();
        let mut expected = SKILL_COLUMNS.to_vec();
        expected.sort_unstable();
        assert_eq!(keys, expected);
    }

    #[test]
    fn metrics_row_keeps_untyped_columns() {
        let row: AgentMetricsRow = serde_json::from_value(json!({
            "agent_version_id": "a1",
            "data": "2024-06-01",
            "conversations": 42,
            "avg_sentiment": 7.5
        }))
        .unwrap();
        assert_eq!(row.day, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert_eq!(row.number("conversations"), Some(42.0));
        assert_eq!(row.number("avg_sentiment"), Some(7.5));
        assert_eq!(row.number("missing"), None);

        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value["data"], "2024-06-01");
        assert_eq!(value["conversations"], 42);
    }

    #[test]
    fn metrics_day_accepts_timestamps() {
        let row: AgentMetricsRow = serde_json::from_value(json!({
            "agent_version_id": "a1",
            "data": "2024-06-01T23:30:00+00:00"
        }))
        .unwrap();
        assert_eq!(row.day, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert!(row.values.is_empty());
    }

    #[test]
    fn unknown_status_does_not_fail_decoding() {
        let status: AgentStatus = serde_json::from_value(json!("paused")).unwrap();
        assert_eq!(status, AgentStatus::Unknown);
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("Active".parse::<AgentStatus>().unwrap(), AgentStatus::Active);
        assert!("paused".parse::<AgentStatus>().is_err());
    }

    #[test]
    fn test_row_round_trips_through_json() {
        let row: TestResultRow = serde_json::from_value(json!({
            "id": "t1",
            "agent_version_id": "a1",
            "agent_name": "Support Bot",
            "agent_version": "1.2.0",
            "overall_score": 8.5,
            "test_duration_ms": 1200,
            "tested_at": "2024-05-01T10:00:00Z"
        }))
        .unwrap();
        assert!(row.test_details.is_none());

        let back: TestResultRow =
            serde_json::from_value(serde_json::to_value(&row).unwrap()).unwrap();
        assert_eq!(back, row);
    }
}
