//! Test-history search and filtering.
//!
//! Three independent criteria, AND-ed: agent-name substring, status badge
//! and score band. Each criterion is a pure predicate on a single row, so
//! the order in which they are applied never changes the result.

use evalboard_store::TestResultRow;
use serde::{Deserialize, Serialize};

use crate::domain::{classify_score, TestStatus, PASS_THRESHOLD};

/// Lower bound of the medium score band.
pub const MEDIUM_BAND_FLOOR: f64 = 7.0;

/// Status filter over [`TestStatus`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Passed,
    Warning,
    Failed,
}

impl StatusFilter {
    pub fn matches(self, score: f64) -> bool {
        let status = classify_score(score);
        match self {
            StatusFilter::All => true,
            StatusFilter::Passed => status == TestStatus::Passed,
            StatusFilter::Warning => status == TestStatus::Warning,
            StatusFilter::Failed => status == TestStatus::Failed,
        }
    }
}

impl std::str::FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "passed" => Ok(StatusFilter::Passed),
            "warning" => Ok(StatusFilter::Warning),
            "failed" => Ok(StatusFilter::Failed),
            other => Err(format!("unknown status filter: {other}")),
        }
    }
}

/// Score band filter: high >= 8, medium 7 to 8, low < 7.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreBand {
    #[default]
    All,
    High,
    Medium,
    Low,
}

impl ScoreBand {
    pub fn matches(self, score: f64) -> bool {
        match self {
            ScoreBand::All => true,
            ScoreBand::High => score >= PASS_THRESHOLD,
            ScoreBand::Medium => (MEDIUM_BAND_FLOOR..PASS_THRESHOLD).contains(&score),
            ScoreBand::Low => score < MEDIUM_BAND_FLOOR,
        }
    }
}

impl std::str::FromStr for ScoreBand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(ScoreBand::All),
            "high" => Ok(ScoreBand::High),
            "medium" => Ok(ScoreBand::Medium),
            "low" => Ok(ScoreBand::Low),
            other => Err(format!("unknown score band: {other}")),
        }
    }
}

/// Combined filter for the test history view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestFilter {
    /// Case-insensitive substring of the agent name; blank means no filter.
    pub query: Option<String>,
    pub status: StatusFilter,
    pub band: ScoreBand,
}

impl TestFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_status(mut self, status: StatusFilter) -> Self {
        self.status = status;
        self
    }

    pub fn with_band(mut self, band: ScoreBand) -> Self {
        self.band = band;
        self
    }

    /// `true` when no criterion restricts anything.
    pub fn is_pass_through(&self) -> bool {
        self.needle().is_none() && self.status == StatusFilter::All && self.band == ScoreBand::All
    }

    fn needle(&self) -> Option<String> {
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase)
    }

    /// Row-level predicate combining all criteria.
    pub fn matches(&self, row: &TestResultRow) -> bool {
        let name_ok = match self.needle() {
            Some(needle) => row.agent_name.to_lowercase().contains(&needle),
            None => true,
        };
        name_ok && self.status.matches(row.overall_score) && self.band.matches(row.overall_score)
    }

    /// Matching rows, most recent first.
    pub fn apply(&self, rows: &[TestResultRow]) -> Vec<TestResultRow> {
        let mut out: Vec<TestResultRow> =
            rows.iter().filter(|row| self.matches(row)).cloned().collect();
        out.sort_by(|a, b| b.tested_at.cmp(&a.tested_at));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(id: &str, name: &str, score: f64, ts: &str) -> TestResultRow {
        serde_json::from_value(json!({
            "id": id,
            "agent_version_id": format!("agent-{name}"),
            "agent_name": name,
            "agent_version": "1.0.0",
            "overall_score": score,
            "tested_at": ts,
        }))
        .unwrap()
    }

    fn sample() -> Vec<TestResultRow> {
        vec![
            row("t1", "Lead Qualifier", 9.2, "2024-06-01T10:00:00Z"),
            row("t2", "Support Triage", 7.4, "2024-06-03T10:00:00Z"),
            row("t3", "Billing Assistant", 5.1, "2024-06-02T10:00:00Z"),
            row("t4", "lead qualifier", 6.5, "2024-06-04T10:00:00Z"),
            row("t5", "Support Triage", 8.0, "2024-05-30T10:00:00Z"),
        ]
    }

    fn ids(rows: &[TestResultRow]) -> Vec<&str> {
        rows.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn pass_through_keeps_everything_newest_first() {
        let filter = TestFilter::new().with_query("   ");
        assert!(filter.is_pass_through());
        assert_eq!(ids(&filter.apply(&sample())), vec!["t4", "t2", "t3", "t1", "t5"]);
    }

    #[test]
    fn query_is_case_insensitive_substring() {
        let filter = TestFilter::new().with_query("LEAD");
        assert_eq!(ids(&filter.apply(&sample())), vec!["t4", "t1"]);
    }

    #[test]
    fn status_uses_classifier_thresholds() {
        let warning = TestFilter::new().with_status(StatusFilter::Warning);
        assert_eq!(ids(&warning.apply(&sample())), vec!["t4", "t2"]);
        let passed = TestFilter::new().with_status(StatusFilter::Passed);
        assert_eq!(ids(&passed.apply(&sample())), vec!["t1", "t5"]);
    }

    #[test]
    fn bands_partition_scores() {
        assert!(ScoreBand::High.matches(8.0));
        assert!(ScoreBand::Medium.matches(7.0));
        assert!(ScoreBand::Medium.matches(7.99));
        assert!(!ScoreBand::Medium.matches(8.0));
        assert!(ScoreBand::Low.matches(6.99));
        assert!(!ScoreBand::Low.matches(7.0));
    }

    #[test]
    fn criteria_are_anded() {
        let filter = TestFilter::new()
            .with_query("support")
            .with_status(StatusFilter::Warning)
            .with_band(ScoreBand::Medium);
        assert_eq!(ids(&filter.apply(&sample())), vec!["t2"]);
    }

    #[test]
    fn criteria_commute() {
        let rows = sample();
        let q = TestFilter::new().with_query("triage");
        let s = TestFilter::new().with_status(StatusFilter::Passed);
        let b = TestFilter::new().with_band(ScoreBand::High);

        let qsb = b.apply(&s.apply(&q.apply(&rows)));
        let bqs = s.apply(&q.apply(&b.apply(&rows)));
        let sbq = q.apply(&b.apply(&s.apply(&rows)));
        let combined = TestFilter::new()
            .with_query("triage")
            .with_status(StatusFilter::Passed)
            .with_band(ScoreBand::High)
            .apply(&rows);

        assert_eq!(qsb, bqs);
        assert_eq!(bqs, sbq);
        assert_eq!(sbq, combined);
        assert_eq!(ids(&combined), vec!["t5"]);
    }

    #[test]
    fn matches_agrees_with_apply() {
        let filter = TestFilter::new().with_query("lead").with_band(ScoreBand::Low);
        let rows = sample();
        let via_matches: Vec<&str> = rows
            .iter()
            .filter(|r| filter.matches(r))
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(via_matches, vec!["t4"]);
        assert_eq!(ids(&filter.apply(&rows)), vec!["t4"]);
    }

    #[test]
    fn apply_keeps_exactly_the_matching_rows() {
        let rows = sample();
        for query in [None, Some("lead"), Some(" SUPPORT "), Some("nobody")] {
            for status in [
                StatusFilter::All,
                StatusFilter::Passed,
                StatusFilter::Warning,
                StatusFilter::Failed,
            ] {
                for band in [ScoreBand::All, ScoreBand::High, ScoreBand::Medium, ScoreBand::Low] {
                    let mut filter = TestFilter::new().with_status(status).with_band(band);
                    if let Some(query) = query {
                        filter = filter.with_query(query);
                    }
                    let mut expected: Vec<&str> = rows
                        .iter()
                        .filter(|r| filter.matches(r))
                        .map(|r| r.id.as_str())
                        .collect();
                    let applied = filter.apply(&rows);
                    let mut got = ids(&applied);
                    expected.sort_unstable();
                    got.sort_unstable();
                    assert_eq!(got, expected, "{filter:?}");
                }
            }
        }
    }

    #[test]
    fn parses_filter_names() {
        assert_eq!("Warning".parse::<StatusFilter>().unwrap(), StatusFilter::Warning);
        assert_eq!("low".parse::<ScoreBand>().unwrap(), ScoreBand::Low);
        assert!("sometimes".parse::<StatusFilter>().is_err());
    }
}
