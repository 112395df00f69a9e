//! Minimal read-query model shared by every row source.
//!
//! Only what the dashboard needs: equality, non-null and lower-bound
//! filters, a single ordering column, and offset/limit pagination. The
//! PostgREST adapter turns a query into URL parameters; the in-memory
//! source evaluates it directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timestamp::format_timestamp;

/// Sort direction for [`ReadQuery::order_by`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }
}

/// A single row predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Filter {
    /// `column = value`
    Eq { column: String, value: String },
    /// `column IS NOT NULL`
    NotNull { column: String },
    /// `column >= value`
    Gte { column: String, value: String },
}

impl Filter {
    pub fn column(&self) -> &str {
        match self {
            Filter::Eq { column, .. } | Filter::NotNull { column } | Filter::Gte { column, .. } => {
                column
            }
        }
    }
}

/// Ordering clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ordering {
    pub column: String,
    pub direction: Direction,
}

/// Read query against one relation.
///
/// Filters are AND-ed. Builder methods consume and return `self`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadQuery {
    pub filters: Vec<Filter>,
    pub order: Option<Ordering>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl ReadQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push(Filter::Eq {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    pub fn not_null(mut self, column: impl Into<String>) -> Self {
        self.filters.push(Filter::NotNull {
            column: column.into(),
        });
        self
    }

    pub fn gte(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push(Filter::Gte {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    /// Lower-bound filter on a timestamp column.
    pub fn since(self, column: impl Into<String>, at: DateTime<Utc>) -> Self {
        self.gte(column, format_timestamp(&at))
    }

    pub fn order_by(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.order = Some(Ordering {
            column: column.into(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Inclusive row range `from..=to`, the way PostgREST pages results.
    pub fn range(self, from: usize, to: usize) -> Self {
        let count = to.saturating_sub(from).saturating_add(1);
        self.offset(from).limit(count)
    }

    /// Render as PostgREST query parameters (without `select`).
    pub fn to_postgrest_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::with_capacity(self.filters.len() + 3);
        for filter in &self.filters {
            let rendered = match filter {
                Filter::Eq { value, .. } => format!("eq.{value}"),
                Filter::NotNull { .. } => "not.is.null".to_string(),
                Filter::Gte { value, .. } => format!("gte.{value}"),
            };
            params.push((filter.column().to_string(), rendered));
        }
        if let Some(order) = &self.order {
            params.push((
                "order".to_string(),
                format!("{}.{}", order.column, order.direction.as_str()),
            ));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(offset) = self.offset {
            params.push(("offset".to_string(), offset.to_string()));
        }
        params
    }

    /// Every column this query references.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.filters
            .iter()
            .map(Filter::column)
            .chain(self.order.iter().map(|o| o.column.as_str()))
    }
}
