//! Derived overview figures.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Headline numbers of the overview page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    /// Every agent row, scored or not.
    pub total_agents: usize,
    /// Mean last score over scored agents, one decimal; 0 when none.
    pub average_score: f64,
    /// Sum of per-agent cumulative test counters.
    pub tests_run: u64,
    /// Percentage of scored agents at or above the pass threshold, one
    /// decimal; 0 when none.
    pub pass_rate: f64,
}

/// One point of the weekly score trend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreHistoryPoint {
    pub week_start: NaiveDate,
    pub average_score: f64,
}
