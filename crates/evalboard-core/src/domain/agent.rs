//! Read-side agent shapes handed to presentation code.

use chrono::{DateTime, Utc};
use evalboard_store::{AgentPerformanceRow, AgentStatus, TestResultRow};
use serde::{Deserialize, Serialize};

/// Simplified agent shape for listings.
///
/// Lossy: built by [`to_agent_view`](crate::mapper::to_agent_view) for
/// display only. There is intentionally no way back to a row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentView {
    pub id: String,
    pub name: String,
    pub version: String,
    pub status: AgentStatus,
    /// Last test time, or creation time for never-tested agents.
    pub last_evaluation: DateTime<Utc>,
    /// Last score, 0 for never-tested agents.
    pub score: f64,
}

/// Everything the agent detail page shows about one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDetail {
    pub view: AgentView,
    /// Full row, for fields the listing drops (approval, 7-day counters).
    pub row: AgentPerformanceRow,
    /// Number of test rows recorded for the agent.
    pub total_tests: usize,
    pub latest_test: Option<TestResultRow>,
}
