// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Error types for the uplink replicator.
//!
//! This module defines the error types used throughout the replicator.
//! Errors are categorized by the operation that produced them (liveness
//! check, query, write, configuration) and include context to help with
//! debugging.
//!
//! # Error Categories
//!
//! | Error Type | Retryable | Description |
//! |------------|-----------|-------------|
//! | `Connectivity` | Yes | Store unreachable, connection refused, timeout |
//! | `Query` | No | Malformed or store-rejected query |
//! | `Write` | No | Malformed points or store-rejected write |
//! | `Config` | No | Configuration invalid |
//! | `InvalidState` | No | Engine state machine violation |
//! | `Shutdown` | No | Engine is shutting down |
//!
//! # Retry Behavior
//!
//! Use [`ReplicationError::is_retryable()`] to determine if an operation
//! should be retried. Only connectivity failures are transient: the
//! connectivity monitor pings the store on a fixed interval until it
//! answers. Every other error is surfaced immediately and terminates the
//! process; an external supervisor owns restarts.

use thiserror::Error;

/// Result type alias for replication operations.
pub type Result<T> = std::result::Result<T, ReplicationError>;

/// Errors that can occur during replication.
///
/// Each variant includes context about where the error occurred.
/// Use [`is_retryable()`](Self::is_retryable) to check if the operation
/// should be retried.
#[derive(Error, Debug)]
pub enum ReplicationError {
    /// Store unreachable over the network.
    ///
    /// Occurs when a ping, query, or write cannot reach the store at all
    /// (connection refused, DNS failure, timeout). Retryable: the
    /// connectivity monitor recovers from these by pinging on a fixed
    /// interval.
    #[error("Connectivity error ({endpoint}): {message}")]
    Connectivity {
        endpoint: String,
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// Query rejected by the store or malformed.
    ///
    /// Occurs when the store answers a fetch query with an error (bad
    /// statement, unknown database) or the response body cannot be
    /// decoded. Not retryable: the statement is wrong at the source.
    #[error("Query error ({statement}): {message}")]
    Query { statement: String, message: String },

    /// Write rejected by the store or malformed.
    ///
    /// Occurs when a batched point write is refused (bad line protocol,
    /// retention policy violation, unknown database). Not retryable: the
    /// batch is wrong at the source, and a blind retry could double-write.
    #[error("Write error ({endpoint}): {message}")]
    Write { endpoint: String, message: String },

    /// Invalid or missing configuration.
    ///
    /// Occurs during startup if the configuration document is malformed.
    /// Not retryable: fix the configuration and restart.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Engine state machine violation.
    ///
    /// Occurs when an operation is attempted in the wrong state
    /// (e.g., calling `run()` on an engine that already ran).
    /// Not retryable: indicates a bug in the caller.
    #[error("Invalid state: expected {expected}, got {actual}")]
    InvalidState { expected: String, actual: String },

    /// Shutdown in progress.
    ///
    /// Returned when the cancellation signal is observed during a timed
    /// suspension. Not retryable: the engine maps this to a clean stop,
    /// not a failure.
    #[error("Shutdown in progress")]
    Shutdown,
}

impl ReplicationError {
    /// Create a connectivity error from a transport error
    pub fn connectivity(endpoint: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Connectivity {
            endpoint: endpoint.into(),
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Create a connectivity error without source
    pub fn connectivity_msg(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connectivity {
            endpoint: endpoint.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a query error carrying the offending statement
    pub fn query(statement: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Query {
            statement: statement.into(),
            message: message.into(),
        }
    }

    /// Create a write error naming the store that rejected the batch
    pub fn write(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Write {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connectivity { .. } => true, // Store will come back
            Self::Query { .. } => false,       // Statement is wrong at the source
            Self::Write { .. } => false,       // Batch is wrong at the source
            Self::Config(_) => false,
            Self::InvalidState { .. } => false,
            Self::Shutdown => false,
        }
    }
}
