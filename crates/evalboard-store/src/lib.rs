//! evalboard-store: row sources for the evaluation dashboard
//!
//! This crate provides the read side of the data layer: the row shapes of the
//! relations the dashboard consumes, a small query model, and the
//! `RowSource` contract with two implementations.
//!
//! ## Layer 0 - Data Access
//!
//! Focus: faithful, side-effect free reads. No aggregation happens here.
//!
//! ## Key Components
//!
//! - `RowSource`: read contract (agent, test, skill and metric rows, ping)
//! - `ReadQuery`: eq / not-null / gte filters, ordering, offset pagination
//! - `MemoryRowSource`: in-memory fixture source (demo data, JSON files, tests)
//! - `PostgrestSource`: remote source over a PostgREST / Supabase endpoint

mod error;
pub mod fixture;
pub mod memory;
pub mod postgrest;
pub mod query;
mod schema;
pub mod source_traits;
pub mod timestamp;

pub use error::StoreError;
pub use fixture::{demo_fixture, Fixture};
pub use memory::MemoryRowSource;
pub use postgrest::{mask_url, PostgrestSource, RemoteConfig};
pub use query::{Direction, Filter, Ordering, ReadQuery};
pub use schema::{
    AgentMetricsRow, AgentPerformanceRow, AgentStatus, SkillRow, TestResultRow,
    AGENT_COLUMNS, AGENT_METRICS_TABLE, AGENT_PERFORMANCE_VIEW, METRIC_COLUMNS, SKILLS_TABLE,
    SKILL_COLUMNS, TEST_COLUMNS, TEST_RESULTS_VIEW,
};
pub use source_traits::{RowSource, StoreResult};
