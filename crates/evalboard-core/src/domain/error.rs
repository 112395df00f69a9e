//! Dashboard error taxonomy.

use evalboard_store::StoreError;

/// Errors produced while loading dashboard data.
///
/// Aggregation never fails; only the upstream fetch and lookups by id can.
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    /// The data store could not be read. Rendered verbatim to the user.
    #[error(transparent)]
    Fetch(#[from] StoreError),

    #[error("agent not found: {0}")]
    AgentNotFound(String),

    #[error("test result not found: {0}")]
    TestResultNotFound(String),

    /// The agent has no skill version recorded.
    #[error("no skill found for agent {0}")]
    SkillNotFound(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl DashboardError {
    /// What could not be found, for not-found terminal states.
    pub fn missing_subject(&self) -> Option<String> {
        match self {
            DashboardError::AgentNotFound(id) => Some(format!("agent {id}")),
            DashboardError::TestResultNotFound(id) => Some(format!("test result {id}")),
            DashboardError::SkillNotFound(id) => Some(format!("skill for agent {id}")),
            _ => None,
        }
    }
}

/// Result type for dashboard operations.
pub type Result<T> = std::result::Result<T, DashboardError>;
