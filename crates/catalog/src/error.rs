// Copyright (c) 2025 pg-sql-lsp contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Error types for Catalog operations
//!
//! [`ExecuteError`] is the contract of the query-execution collaborator.
//! [`CatalogError`] covers catalog loading, and [`ConfigError`] connection
//! configuration.

use serde::Serialize;
use thiserror::Error;

/// Result type alias for Catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors raised by a [`QueryExecutor`](crate::QueryExecutor)
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
pub enum ExecuteError {
    /// The engine rejected the statement
    ///
    /// `position` is the engine's 1-based character offset into the submitted
    /// text, when it reported one.
    #[error("{message}")]
    Engine {
        message: String,
        position: Option<usize>,
    },

    /// The connection itself failed; nothing more can be executed on it
    #[error("Connection failure: {0}")]
    Connection(String),
}

impl ExecuteError {
    pub fn engine(message: impl Into<String>, position: Option<usize>) -> Self {
        Self::Engine {
            message: message.into(),
            position,
        }
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}

/// Errors that can occur during Catalog operations
#[derive(Debug, Error, Clone, Serialize)]
pub enum CatalogError {
    /// Failed to connect to the database
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Query execution failed
    #[error("Query execution failed: {0}")]
    QueryFailed(String),

    /// A metadata query did not return an expected column
    #[error("Column '{column}' missing from {query} result")]
    MissingColumn { query: &'static str, column: String },

    /// A metadata row could not be interpreted
    #[error("Invalid {query} row: {reason}")]
    InvalidRow { query: &'static str, reason: String },

    /// Failed to serialize or deserialize schema data
    #[error("Failed to serialize schema data: {0}")]
    SerializationError(String),

    /// Invalid catalog configuration
    #[error("Invalid catalog configuration: {0}")]
    ConfigurationError(String),

    /// No connection has been configured yet
    #[error("No database connection configured")]
    NotConnected,
}

impl From<ExecuteError> for CatalogError {
    fn from(err: ExecuteError) -> Self {
        match err {
            ExecuteError::Engine { message, .. } => Self::QueryFailed(message),
            ExecuteError::Connection(message) => Self::ConnectionFailed(message),
        }
    }
}

impl From<ConfigError> for CatalogError {
    fn from(err: ConfigError) -> Self {
        Self::ConfigurationError(err.to_string())
    }
}

/// Connection configuration errors
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
pub enum ConfigError {
    /// Neither a connection string nor any connection field was given
    #[error("No connection parameters given")]
    MissingConnection,

    /// Connection string or SSL mode is malformed
    #[error("Invalid connection string: {0}")]
    InvalidConnectionString(String),

    /// Pool settings are out of range
    #[error("Invalid pool configuration: {0}")]
    InvalidPoolConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execute_error_conversion() {
        let err: CatalogError = ExecuteError::engine("relation does not exist", Some(15)).into();
        assert!(matches!(err, CatalogError::QueryFailed(ref m) if m == "relation does not exist"));

        let err: CatalogError = ExecuteError::Connection("reset by peer".into()).into();
        assert!(matches!(err, CatalogError::ConnectionFailed(_)));
    }

    #[test]
    fn test_engine_error_displays_message_only() {
        let err = ExecuteError::engine("column \"bad_col\" does not exist", Some(16));
        assert_eq!(err.to_string(), "column \"bad_col\" does not exist");
        assert!(!err.is_connection());
    }
}
