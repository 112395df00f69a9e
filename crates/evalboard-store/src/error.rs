//! Error types for evalboard-store

use thiserror::Error;

/// Errors raised while reading rows from a [`RowSource`](crate::RowSource).
///
/// Every variant renders to a message that is safe to show to a user
/// verbatim; credentials never appear in it.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Transport-level failure (DNS, TLS, connection reset, client timeout)
    #[error("connection to data store failed: {0}")]
    Connection(String),

    /// The store answered with a non-success status
    #[error("data store returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Response body could not be decoded into rows
    #[error("failed to decode rows from {relation}: {detail}")]
    Decode { relation: String, detail: String },

    /// A query referenced a column the relation does not have
    #[error("unknown column `{column}` on {relation}")]
    UnknownColumn { relation: String, column: String },

    /// Fixture file could not be read or parsed
    #[error("fixture error: {0}")]
    Fixture(String),

    /// Missing or invalid source configuration
    #[error("invalid store configuration: {0}")]
    Config(String),
}

impl StoreError {
    /// `true` when the store itself could not be reached, as opposed to a
    /// reachable store rejecting or mangling the request.
    pub fn is_connection(&self) -> bool {
        matches!(self, StoreError::Connection(_))
    }
}
