//! Overview aggregation: headline stats and the weekly score trend.
//!
//! Both functions are total. Empty input, all-null scores and sparse weeks
//! produce zeros or fewer points, never an error or NaN.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use evalboard_store::{AgentPerformanceRow, TestResultRow};
use serde::{Deserialize, Serialize};

use crate::domain::{is_passing, DashboardStats, ScoreHistoryPoint};

/// Days of test history the trend chart covers.
pub const TREND_WINDOW_DAYS: i64 = 30;

/// Most recent weekly buckets kept in the trend.
pub const MAX_TREND_POINTS: usize = 5;

/// Round half away from zero to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Compute the overview headline figures from agent rows.
pub fn compute_stats(agents: &[AgentPerformanceRow]) -> DashboardStats {
    let scores: Vec<f64> = agents.iter().filter_map(|a| a.last_test_score).collect();
    let tests_run = agents.iter().map(|a| a.total_tests.unwrap_or(0)).sum();

    if scores.is_empty() {
        return DashboardStats {
            total_agents: agents.len(),
            average_score: 0.0,
            tests_run,
            pass_rate: 0.0,
        };
    }

    let scored = scores.len() as f64;
    let mean = scores.iter().sum::<f64>() / scored;
    let passing = scores.iter().filter(|s| is_passing(**s)).count() as f64;

    DashboardStats {
        total_agents: agents.len(),
        average_score: round1(mean),
        tests_run,
        pass_rate: round1(passing / scored * 100.0),
    }
}

/// Which weekday opens a trend bucket.
///
/// The dashboard has always bucketed with Sunday as day zero; that is the
/// default and is pinned here rather than taken from any locale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    #[default]
    Sunday,
    Monday,
}

impl WeekStart {
    /// First day of the week containing `date`.
    pub fn week_of(self, date: NaiveDate) -> NaiveDate {
        let offset = match self {
            WeekStart::Sunday => date.weekday().num_days_from_sunday(),
            WeekStart::Monday => date.weekday().num_days_from_monday(),
        };
        date - Duration::days(i64::from(offset))
    }
}

impl std::str::FromStr for WeekStart {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sunday" | "sun" => Ok(WeekStart::Sunday),
            "monday" | "mon" => Ok(WeekStart::Monday),
            other => Err(format!("week start must be sunday or monday, got {other}")),
        }
    }
}

/// Lower bound of the trend query window.
pub fn trend_window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::days(TREND_WINDOW_DAYS)
}

/// Group test rows into weekly buckets (by UTC calendar date) and average
/// each bucket's overall score.
///
/// Output is ascending by week and keeps only the last
/// [`MAX_TREND_POINTS`] buckets. Weeks without rows are absent.
pub fn bucket_weekly(tests: &[TestResultRow], week_start: WeekStart) -> Vec<ScoreHistoryPoint> {
    let mut buckets: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
    for test in tests {
        let week = week_start.week_of(test.tested_at.date_naive());
        let entry = buckets.entry(week).or_insert((0.0, 0));
        entry.0 += test.overall_score;
        entry.1 += 1;
    }

    let skip = buckets.len().saturating_sub(MAX_TREND_POINTS);
    buckets
        .into_iter()
        .skip(skip)
        .map(|(week_start, (sum, count))| ScoreHistoryPoint {
            week_start,
            average_score: round1(sum / count as f64),
        })
        .collect()
}
