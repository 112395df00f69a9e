//! Data source selection.
//!
//! Reads:
//! - EVALBOARD_SOURCE (optional, `fixture` or `remote`; default `remote`
//!   when SUPABASE_URL is set, else `fixture`)
//! - EVALBOARD_FIXTURE (optional, JSON fixture file; built-in demo data
//!   when unset)
//! - EVALBOARD_WEEK_START (optional, `sunday` or `monday`; default `sunday`)
//! - EVALBOARD_STATS_PAGE_SIZE (optional, rows per stats request; default
//!   1000, keep it at or below the server's `max-rows`)
//! - SUPABASE_URL, SUPABASE_KEY and the remaining remote settings, see
//!   [`RemoteConfig::from_env`]

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use evalboard_store::{MemoryRowSource, PostgrestSource, RemoteConfig, RowSource};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::aggregate::WeekStart;
use crate::domain::{DashboardError, Result};
use crate::source::{DashboardService, STATS_PAGE_SIZE};

/// Which [`RowSource`] implementation backs the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Fixture,
    Remote,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Fixture => write!(f, "fixture"),
            SourceKind::Remote => write!(f, "remote"),
        }
    }
}

impl std::str::FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixture" | "memory" => Ok(SourceKind::Fixture),
            "remote" | "supabase" => Ok(SourceKind::Remote),
            other => Err(format!("source must be fixture or remote, got {other}")),
        }
    }
}

/// Dashboard configuration.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub source: SourceKind,
    pub fixture_path: Option<PathBuf>,
    /// Present whenever SUPABASE_URL was set, even if the fixture is selected.
    pub remote: Option<RemoteConfig>,
    pub week_start: WeekStart,
    pub stats_page_size: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::Fixture,
            fixture_path: None,
            remote: None,
            week_start: WeekStart::default(),
            stats_page_size: STATS_PAGE_SIZE,
        }
    }
}

impl DashboardConfig {
    /// Fixture-backed configuration (demo data unless a path is set).
    pub fn fixture() -> Self {
        Self::default()
    }

    /// Remote configuration for an explicit endpoint.
    pub fn remote(config: RemoteConfig) -> Self {
        Self {
            source: SourceKind::Remote,
            remote: Some(config),
            ..Self::default()
        }
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable lookup.
    pub fn from_vars<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let has_url = var("SUPABASE_URL").is_some_and(|v| !v.trim().is_empty());
        let remote = if has_url {
            Some(RemoteConfig::from_vars(&var).map_err(|e| DashboardError::Config(e.to_string()))?)
        } else {
            None
        };

        let source = match var("EVALBOARD_SOURCE").filter(|v| !v.trim().is_empty()) {
            Some(raw) => raw.parse().map_err(DashboardError::Config)?,
            None if has_url => SourceKind::Remote,
            None => SourceKind::Fixture,
        };

        let week_start = match var("EVALBOARD_WEEK_START").filter(|v| !v.trim().is_empty()) {
            Some(raw) => raw.parse().map_err(DashboardError::Config)?,
            None => WeekStart::default(),
        };

        let stats_page_size = match var("EVALBOARD_STATS_PAGE_SIZE") {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(size) if size > 0 => size,
                _ => {
                    return Err(DashboardError::Config(format!(
                        "EVALBOARD_STATS_PAGE_SIZE must be a positive number, got {raw}"
                    )))
                }
            },
            None => STATS_PAGE_SIZE,
        };

        Ok(Self {
            source,
            fixture_path: var("EVALBOARD_FIXTURE")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            remote,
            week_start,
            stats_page_size,
        })
    }

    pub fn with_source(mut self, source: SourceKind) -> Self {
        self.source = source;
        self
    }

    pub fn with_fixture(mut self, path: impl Into<PathBuf>) -> Self {
        self.fixture_path = Some(path.into());
        self
    }

    pub fn with_week_start(mut self, week_start: WeekStart) -> Self {
        self.week_start = week_start;
        self
    }

    /// Instantiate the configured row source.
    pub async fn build_source(&self) -> Result<Arc<dyn RowSource>> {
        let source: Arc<dyn RowSource> = match self.source {
            SourceKind::Remote => {
                let remote = self.remote.clone().ok_or_else(|| {
                    DashboardError::Config(
                        "remote source selected but SUPABASE_URL is not set".to_string(),
                    )
                })?;
                let client =
                    PostgrestSource::new(remote).map_err(|e| DashboardError::Config(e.to_string()))?;
                Arc::new(client)
            }
            SourceKind::Fixture => match &self.fixture_path {
                Some(path) => Arc::new(MemoryRowSource::from_fixture_file(path).await?),
                None => Arc::new(MemoryRowSource::demo(Utc::now())),
            },
        };
        info!(kind = %self.source, source = %source.describe(), "data source ready");
        Ok(source)
    }

    /// Row source wrapped in a [`DashboardService`].
    pub async fn build_service(&self) -> Result<DashboardService> {
        let rows = self.build_source().await?;
        Ok(DashboardService::new(rows)
            .with_week_start(self.week_start)
            .with_stats_page_size(self.stats_page_size))
    }
}
