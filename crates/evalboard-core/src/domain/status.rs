//! Pass / warning / fail classification of 0-10 scores.
//!
//! This is the only place the thresholds live. Stats, filters, badges and
//! dimension breakdowns all go through [`classify_score`].

use serde::{Deserialize, Serialize};

/// Scores at or above this pass.
pub const PASS_THRESHOLD: f64 = 8.0;

/// Scores at or above this (and below [`PASS_THRESHOLD`]) warn.
pub const WARNING_THRESHOLD: f64 = 6.0;

/// Badge derived from a test's overall score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Passed,
    Warning,
    Failed,
}

impl TestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestStatus::Passed => "passed",
            TestStatus::Warning => "warning",
            TestStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for TestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Classify a score. Lower bounds are closed; NaN classifies as failed.
pub fn classify_score(score: f64) -> TestStatus {
    if score >= PASS_THRESHOLD {
        TestStatus::Passed
    } else if score >= WARNING_THRESHOLD {
        TestStatus::Warning
    } else {
        TestStatus::Failed
    }
}

/// `true` when the score meets the pass threshold.
pub fn is_passing(score: f64) -> bool {
    classify_score(score) == TestStatus::Passed
}
