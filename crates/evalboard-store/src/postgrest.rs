//! PostgREST Source - remote row access
//!
//! Reads the dashboard relations over a PostgREST endpoint (the REST layer
//! Supabase exposes under `/rest/v1`). Every request carries the project
//! key both as `apikey` and as a bearer token.
//!
//! No retries are attempted here; a failed request is returned to the
//! caller as-is.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::Url;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};

use crate::error::StoreError;
use crate::query::ReadQuery;
use crate::schema::{
    AgentMetricsRow, AgentPerformanceRow, SkillRow, TestResultRow, AGENT_METRICS_TABLE,
    AGENT_PERFORMANCE_VIEW, SKILLS_TABLE, TEST_RESULTS_VIEW,
};
use crate::source_traits::{RowSource, StoreResult};

/// Configuration for a PostgREST / Supabase endpoint
#[derive(Clone)]
pub struct RemoteConfig {
    /// Project URL (e.g., "https://xyz.supabase.co")
    pub url: String,
    /// API key sent as `apikey` and bearer token
    pub api_key: String,
    /// Relation holding one row per agent (default: "vw_agent_performance")
    pub agents_view: String,
    /// Relation holding one row per test run (default: "vw_test_results_history")
    pub tests_view: String,
    /// Relation holding skill versions (default: "agenttest_skills")
    pub skills_table: String,
    /// Relation holding daily agent metrics (default: "agent_metrics")
    pub metrics_table: String,
    /// Transport timeout; `None` leaves the client default in place
    pub timeout: Option<Duration>,
}

impl std::fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("url", &mask_url(&self.url))
            .field("api_key", &"***")
            .field("agents_view", &self.agents_view)
            .field("tests_view", &self.tests_view)
            .field("skills_table", &self.skills_table)
            .field("metrics_table", &self.metrics_table)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl RemoteConfig {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            agents_view: AGENT_PERFORMANCE_VIEW.to_string(),
            tests_view: TEST_RESULTS_VIEW.to_string(),
            skills_table: SKILLS_TABLE.to_string(),
            metrics_table: AGENT_METRICS_TABLE.to_string(),
            timeout: None,
        }
    }

    /// Set custom agents relation
    pub fn with_agents_view(mut self, view: impl Into<String>) -> Self {
        self.agents_view = view.into();
        self
    }

    /// Set custom tests relation
    pub fn with_tests_view(mut self, view: impl Into<String>) -> Self {
        self.tests_view = view.into();
        self
    }

    /// Set custom skills relation
    pub fn with_skills_table(mut self, table: impl Into<String>) -> Self {
        self.skills_table = table.into();
        self
    }

    /// Set custom metrics relation
    pub fn with_metrics_table(mut self, table: impl Into<String>) -> Self {
        self.metrics_table = table.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Create from environment variables
    ///
    /// Reads:
    /// - SUPABASE_URL (required)
    /// - SUPABASE_KEY (required)
    /// - EVALBOARD_AGENTS_VIEW (optional, default: "vw_agent_performance")
    /// - EVALBOARD_TESTS_VIEW (optional, default: "vw_test_results_history")
    /// - EVALBOARD_SKILLS_TABLE (optional, default: "agenttest_skills")
    /// - EVALBOARD_METRICS_TABLE (optional, default: "agent_metrics")
    /// - EVALBOARD_HTTP_TIMEOUT_SECS (optional)
    pub fn from_env() -> StoreResult<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable lookup.
    pub fn from_vars<F>(var: F) -> StoreResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = var("SUPABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| StoreError::Config("SUPABASE_URL not set".to_string()))?;
        let api_key = var("SUPABASE_KEY")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| StoreError::Config("SUPABASE_KEY not set".to_string()))?;

        let mut config = Self::new(url, api_key);
        if let Some(view) = var("EVALBOARD_AGENTS_VIEW") {
            config = config.with_agents_view(view);
        }
        if let Some(view) = var("EVALBOARD_TESTS_VIEW") {
            config = config.with_tests_view(view);
        }
        if let Some(table) = var("EVALBOARD_SKILLS_TABLE") {
            config = config.with_skills_table(table);
        }
        if let Some(table) = var("EVALBOARD_METRICS_TABLE") {
            config = config.with_metrics_table(table);
        }
        if let Some(raw) = var("EVALBOARD_HTTP_TIMEOUT_SECS") {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                StoreError::Config(format!("EVALBOARD_HTTP_TIMEOUT_SECS is not a number: {raw}"))
            })?;
            config = config.with_timeout(Duration::from_secs(secs));
        }
        Ok(config)
    }

    /// URL safe for logs (`scheme://host/...`).
    pub fn masked_url(&self) -> String {
        mask_url(&self.url)
    }
}

/// Reduce a URL to its scheme and authority so it can be logged.
pub fn mask_url(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => match parsed.host_str() {
            Some(host) => match parsed.port() {
                Some(port) => format!("{}://{}:{}/...", parsed.scheme(), host, port),
                None => format!("{}://{}/...", parsed.scheme(), host),
            },
            None => format!("{}://...", parsed.scheme()),
        },
        Err(_) => String::new(),
    }
}

/// Remote row source speaking the PostgREST query dialect
#[derive(Clone)]
pub struct PostgrestSource {
    config: RemoteConfig,
    base: Url,
    http: reqwest::Client,
}

impl PostgrestSource {
    /// Build a client for `config`. No request is made until the first read.
    pub fn new(config: RemoteConfig) -> StoreResult<Self> {
        let base = Url::parse(config.url.trim_end_matches('/'))
            .map_err(|e| StoreError::Config(format!("invalid SUPABASE_URL: {e}")))?;

        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&config.api_key)
            .map_err(|_| StoreError::Config("API key contains invalid characters".to_string()))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|_| StoreError::Config("API key contains invalid characters".to_string()))?;
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("evalboard/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| StoreError::Connection(format!("failed to build HTTP client: {e}")))?;

        info!(url = %config.masked_url(), "PostgREST source initialized");
        Ok(Self { config, base, http })
    }

    /// Build from `SUPABASE_*` environment variables.
    pub fn from_env() -> StoreResult<Self> {
        Self::new(RemoteConfig::from_env()?)
    }

    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    fn relation_url(&self, relation: &str) -> StoreResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::Config("SUPABASE_URL cannot be a base URL".to_string()))?
            .pop_if_empty()
            .extend(["rest", "v1", relation]);
        Ok(url)
    }

    #[instrument(skip_all, fields(relation = %relation))]
    async fn select<T: DeserializeOwned>(
        &self,
        relation: &str,
        query: &ReadQuery,
    ) -> StoreResult<Vec<T>> {
        let url = self.relation_url(relation)?;
        let mut params = vec![("select".to_string(), "*".to_string())];
        params.extend(query.to_postgrest_params());

        let started = Instant::now();
        let response = self.http.get(url).query(&params).send().await.map_err(|e| {
            warn!(error = %e, "request failed");
            StoreError::Connection(e.to_string())
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            warn!(error = %e, "failed to read response body");
            StoreError::Connection(e.to_string())
        })?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "store rejected query");
            return Err(StoreError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let rows: Vec<T> = serde_json::from_str(&body).map_err(|e| StoreError::Decode {
            relation: relation.to_string(),
            detail: e.to_string(),
        })?;

        debug!(
            rows = rows.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "rows fetched"
        );
        Ok(rows)
    }
}

#[async_trait]
impl RowSource for PostgrestSource {
    async fn agent_rows(&self, query: &ReadQuery) -> StoreResult<Vec<AgentPerformanceRow>> {
        self.select(&self.config.agents_view, query).await
    }

    async fn test_rows(&self, query: &ReadQuery) -> StoreResult<Vec<TestResultRow>> {
        self.select(&self.config.tests_view, query).await
    }

    async fn skill_rows(&self, query: &ReadQuery) -> StoreResult<Vec<SkillRow>> {
        self.select(&self.config.skills_table, query).await
    }

    async fn metric_rows(&self, query: &ReadQuery) -> StoreResult<Vec<AgentMetricsRow>> {
        self.select(&self.config.metrics_table, query).await
    }

    async fn ping(&self) -> StoreResult<()> {
        let url = self.relation_url(&self.config.agents_view)?;
        let response = self
            .http
            .get(url)
            .query(&[("select", "id"), ("limit", "1")])
            .send()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(StoreError::Http {
                status: status.as_u16(),
                body,
            })
        }
    }

    fn describe(&self) -> String {
        format!("PostgREST at {}", self.config.masked_url())
    }
}
