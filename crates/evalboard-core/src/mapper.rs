//! Row to view mapping for agent listings.

use evalboard_store::AgentPerformanceRow;

use crate::domain::AgentView;

/// Map an agent performance row to the listing shape.
///
/// Never-tested agents fall back to their creation time and a score of 0.
pub fn to_agent_view(row: &AgentPerformanceRow) -> AgentView {
    AgentView {
        id: row.id.clone(),
        name: row.name.clone(),
        version: row.version.clone(),
        status: row.status,
        last_evaluation: row.last_test_at.unwrap_or(row.created_at),
        score: row.last_test_score.unwrap_or(0.0),
    }
}

/// Map a batch of rows, preserving order.
pub fn to_agent_views(rows: &[AgentPerformanceRow]) -> Vec<AgentView> {
    rows.iter().map(to_agent_view).collect()
}
