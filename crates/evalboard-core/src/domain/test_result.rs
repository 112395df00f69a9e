//! Test result detail and the per-dimension breakdown of its evaluation.

use evalboard_store::TestResultRow;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::status::{classify_score, TestStatus};

/// Rubric dimensions in display order. Extra dimensions found in a payload
/// follow these, alphabetically.
pub const KNOWN_DIMENSIONS: [&str; 5] = [
    "completeness",
    "tone",
    "engagement",
    "compliance",
    "conversion",
];

/// Score of one rubric dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionScore {
    pub name: String,
    pub score: f64,
    pub status: TestStatus,
}

/// Structured view of a test's `test_details` payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestBreakdown {
    pub dimensions: Vec<DimensionScore>,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub failures: Vec<String>,
    pub warnings: Vec<String>,
    pub recommendations: Vec<String>,
}

impl TestBreakdown {
    /// Parse an evaluation payload. Anything missing or malformed is
    /// skipped; a payload that is not an object yields an empty breakdown.
    pub fn from_details(details: Option<&Value>) -> Self {
        let Some(Value::Object(obj)) = details else {
            return Self::default();
        };

        let mut dimensions = Vec::new();
        if let Some(Value::Object(scores)) = obj.get("scores") {
            let mut names: Vec<&String> = scores.keys().collect();
            let rank = |name: &str| {
                KNOWN_DIMENSIONS
                    .iter()
                    .position(|known| *known == name)
                    .unwrap_or(KNOWN_DIMENSIONS.len())
            };
            names.sort_by(|a, b| {
                rank(a.as_str())
                    .cmp(&rank(b.as_str()))
                    .then_with(|| a.cmp(b))
            });
            for name in names {
                if let Some(score) = scores.get(name).and_then(Value::as_f64) {
                    dimensions.push(DimensionScore {
                        name: name.clone(),
                        score,
                        status: classify_score(score),
                    });
                }
            }
        }

        let list = |key: &str| -> Vec<String> {
            obj.get(key)
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default()
        };

        Self {
            dimensions,
            strengths: list("strengths"),
            weaknesses: list("weaknesses"),
            failures: list("failures"),
            warnings: list("warnings"),
            recommendations: list("recommendations"),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
            && self.strengths.is_empty()
            && self.weaknesses.is_empty()
            && self.failures.is_empty()
            && self.warnings.is_empty()
            && self.recommendations.is_empty()
    }
}

/// A single test result with its derived badge and breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResultDetail {
    pub row: TestResultRow,
    pub status: TestStatus,
    pub breakdown: TestBreakdown,
}

impl TestResultDetail {
    pub fn from_row(row: TestResultRow) -> Self {
        let status = classify_score(row.overall_score);
        let breakdown = TestBreakdown::from_details(row.test_details.as_ref());
        Self {
            row,
            status,
            breakdown,
        }
    }
}
