//! Domain models for evalboard.
//!
//! Derived, read-only shapes built from store rows:
//! - `TestStatus`: pass / warning / fail badge of a score
//! - `DashboardStats`, `ScoreHistoryPoint`: overview figures
//! - `AgentView`, `AgentDetail`: agent listing and detail shapes
//! - `TestResultDetail`, `TestBreakdown`: single test detail

pub mod agent;
pub mod error;
pub mod stats;
pub mod status;
pub mod test_result;

// Re-export main types and errors
pub use agent::{AgentDetail, AgentView};
pub use error::{DashboardError, Result};
pub use stats::{DashboardStats, ScoreHistoryPoint};
pub use status::{classify_score, is_passing, TestStatus, PASS_THRESHOLD, WARNING_THRESHOLD};
pub use test_result::{DimensionScore, TestBreakdown, TestResultDetail, KNOWN_DIMENSIONS};
