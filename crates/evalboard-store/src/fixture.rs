//! Fixture datasets for the in-memory source.
//!
//! A fixture is a JSON document
//! `{"agents": [...], "tests": [...], "skills": [...], "metrics": [...]}`
//! whose entries use the same shape as the remote rows. Every key is
//! optional. [`demo_fixture`] builds a
//! deterministic dataset relative to a reference instant so charts always
//! have recent data to show.

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::error::StoreError;
use crate::schema::{AgentMetricsRow, AgentPerformanceRow, AgentStatus, SkillRow, TestResultRow};
use crate::source_traits::StoreResult;

/// Rows for every relation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub agents: Vec<AgentPerformanceRow>,
    #[serde(default)]
    pub tests: Vec<TestResultRow>,
    #[serde(default)]
    pub skills: Vec<SkillRow>,
    #[serde(default)]
    pub metrics: Vec<AgentMetricsRow>,
}

impl Fixture {
    /// Parse a fixture document.
    pub fn from_json(raw: &str) -> StoreResult<Self> {
        serde_json::from_str(raw).map_err(|e| StoreError::Fixture(e.to_string()))
    }

    /// Read and parse a fixture file.
    pub async fn load(path: &Path) -> StoreResult<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| StoreError::Fixture(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&raw)
    }
}

struct DemoAgent {
    name: &'static str,
    version: &'static str,
    status: AgentStatus,
    score: Option<f64>,
    approved: bool,
    age_days: i64,
}

const DEMO_AGENTS: &[DemoAgent] = &[
    DemoAgent {
        name: "Lead Qualifier",
        version: "2.1.0",
        status: AgentStatus::Active,
        score: Some(9.1),
        approved: true,
        age_days: 120,
    },
    DemoAgent {
        name: "Support Triage",
        version: "1.4.2",
        status: AgentStatus::Active,
        score: Some(7.6),
        approved: false,
        age_days: 90,
    },
    DemoAgent {
        name: "Billing Assistant",
        version: "0.9.0",
        status: AgentStatus::NeedsImprovement,
        score: Some(5.8),
        approved: false,
        age_days: 60,
    },
    DemoAgent {
        name: "Onboarding Guide",
        version: "3.0.0",
        status: AgentStatus::Active,
        score: Some(8.4),
        approved: true,
        age_days: 200,
    },
    DemoAgent {
        name: "Retention Coach",
        version: "1.0.0",
        status: AgentStatus::Testing,
        score: None,
        approved: false,
        age_days: 3,
    },
    DemoAgent {
        name: "Scheduling Agent",
        version: "2.0.1",
        status: AgentStatus::Inactive,
        score: Some(6.9),
        approved: false,
        age_days: 150,
    },
];

const TESTS_PER_AGENT: i64 = 7;
const METRIC_DAYS: i64 = 35;
const DRIFT: [f64; 3] = [0.0, -0.4, 0.3];
const DIMENSIONS: [(&str, f64); 5] = [
    ("completeness", 0.3),
    ("tone", 0.5),
    ("engagement", -0.2),
    ("compliance", 0.1),
    ("conversion", -0.6),
];

/// Deterministic demo dataset anchored at `now`.
///
/// Unscored agents get no test, skill or metric rows. Every other agent gets
/// a test roughly every six days, newest first, with the newest matching
/// its last score, one to three skill versions, and a metrics row for each
/// of the last 35 days.
pub fn demo_fixture(now: DateTime<Utc>) -> Fixture {
    let mut fixture = Fixture::default();

    for (i, demo) in DEMO_AGENTS.iter().enumerate() {
        let agent_id = Uuid::from_u128(0xa9e0_0000 + i as u128).to_string();
        let offset = Duration::hours(3 * i as i64) + Duration::days(i as i64 % 3);
        let tests: Vec<TestResultRow> = match demo.score {
            None => Vec::new(),
            Some(base) => (0..TESTS_PER_AGENT)
                .map(|j| {
                    let score = (base - 0.15 * j as f64 + DRIFT[j as usize % DRIFT.len()])
                        .clamp(0.0, 10.0);
                    let score = (score * 100.0).round() / 100.0;
                    TestResultRow {
                        id: Uuid::from_u128(0x7e57_0000 + (i as u128) * 100 + j as u128)
                            .to_string(),
                        agent_version_id: agent_id.clone(),
                        agent_name: demo.name.to_string(),
                        agent_version: demo.version.to_string(),
                        overall_score: score,
                        test_duration_ms: 4_000 + 750 * j as u64 + 310 * i as u64,
                        tested_at: now - offset - Duration::days(6 * j),
                        report_url: Some(format!("https://reports.example.com/{agent_id}/{j}")),
                        evaluator_model: Some("claude-opus-4".to_string()),
                        test_details: Some(demo_details(score)),
                    }
                })
                .collect(),
        };

        if demo.score.is_some() {
            fixture.skills.extend(demo_skills(i, &agent_id, now));
            fixture.metrics.extend(demo_metrics(i, &agent_id, now));
        }

        let last = tests.first();
        fixture.agents.push(AgentPerformanceRow {
            id: agent_id.clone(),
            name: demo.name.to_string(),
            version: demo.version.to_string(),
            status: demo.status,
            is_active: demo.status == AgentStatus::Active,
            framework_approved: demo.approved,
            created_at: now - Duration::days(demo.age_days),
            last_test_at: last.map(|t| t.tested_at),
            last_test_score: last.map(|t| t.overall_score),
            total_tests: Some(tests.len() as u64 * 3),
            conversations_7d: 40 + 17 * i as u64,
            resolved_7d: 31 + 11 * i as u64,
            escalations_7d: (i as u64 * 2) % 5,
        });
        fixture.tests.extend(tests);
    }

    fixture
}

fn demo_skills(i: usize, agent_id: &str, now: DateTime<Utc>) -> Vec<SkillRow> {
    let versions = (i % 3 + 1) as u32;
    (1..=versions)
        .map(|version| {
            let synced = now - Duration::days(14 * (versions - version) as i64 + 1);
            SkillRow {
                id: Uuid::from_u128(0x5c11_0000 + (i as u128) * 10 + version as u128)
                    .to_string(),
                agent_version_id: agent_id.to_string(),
                version,
                instructions: format!(
                    "# Instructions v{version}\n\nGreet the customer, confirm intent, answer briefly."
                ),
                examples: Some("Customer: Hi\nAgent: Hello! How can I help today?".to_string()),
                rubric: (version > 1).then(|| "Score tone, accuracy and next steps.".to_string()),
                test_cases: Some(json!([{ "input": "I want a refund", "expect": "policy link" }])),
                local_file_path: None,
                last_synced_at: Some(synced),
                created_at: Some(synced),
            }
        })
        .collect()
}

fn demo_metrics(i: usize, agent_id: &str, now: DateTime<Utc>) -> Vec<AgentMetricsRow> {
    (0..METRIC_DAYS)
        .map(|d| {
            let conversations = 5 + (i as i64 * 3 + d) % 7;
            let escalations = d % 2;
            let resolved = conversations - escalations - d % 3;
            let mut values = serde_json::Map::new();
            values.insert("conversations".to_string(), json!(conversations));
            values.insert("resolved".to_string(), json!(resolved));
            values.insert("escalations".to_string(), json!(escalations));
            AgentMetricsRow {
                agent_version_id: agent_id.to_string(),
                day: (now - Duration::days(d)).date_naive(),
                values,
            }
        })
        .collect()
}

fn demo_details(overall: f64) -> serde_json::Value {
    let scores: serde_json::Map<String, serde_json::Value> = DIMENSIONS
        .iter()
        .map(|(name, delta)| {
            let s = ((overall + delta).clamp(0.0, 10.0) * 10.0).round() / 10.0;
            (name.to_string(), json!(s))
        })
        .collect();
    let failures: Vec<&str> = if overall < 6.0 {
        vec!["Quoted a refund policy that does not exist"]
    } else {
        Vec::new()
    };
    json!({
        "overall_score": overall,
        "scores": scores,
        "strengths": ["Consistent greeting", "Asks clarifying questions"],
        "weaknesses": ["Long answers on simple questions"],
        "failures": failures,
        "warnings": [],
        "recommendations": ["Trim responses to three sentences"]
    })
}
