//! Unified error handling for Helios CDR
//!
//! All errors in the system are converted to `AppError`. Classification
//! fallbacks (an unmatched pattern, an unknown country) are deliberately NOT
//! errors: the record is still rated and persisted with safe defaults.
//! Quota outcomes (overdraft, missing ledger) travel as `LedgerOutcome`
//! values, not errors. Only structurally invalid input and storage failures
//! propagate to the caller.

use thiserror::Error;

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    // ==================== Ingestion Errors ====================
    #[error("Error: Insufficient data")]
    MalformedInput,

    #[error("Error parsing datetime: {0}")]
    InvalidTimestamp(String),

    // ==================== Database Errors ====================
    #[error("Database error: {0}")]
    Database(String),

    #[error("Database pool error: {0}")]
    Pool(String),

    #[error("Transaction failed: {0}")]
    Transaction(String),

    #[error("Not found: {0}")]
    NotFound(String),

    // ==================== Internal Errors ====================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the short error code used in structured log fields
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::MalformedInput => "malformed_input",
            AppError::InvalidTimestamp(_) => "invalid_timestamp",
            AppError::Database(_) => "database_error",
            AppError::Pool(_) => "pool_error",
            AppError::Transaction(_) => "transaction_error",
            AppError::NotFound(_) => "not_found",
            AppError::Config(_) => "config_error",
            AppError::Io(_) => "io_error",
            AppError::Internal(_) => "internal_error",
        }
    }

    /// The one-line reply sent back to the PBX on the ingestion socket
    ///
    /// Parse failures carry their own wire text; anything else is reported
    /// as a processing error without leaking internals beyond the message.
    pub fn wire_reply(&self) -> String {
        match self {
            AppError::MalformedInput | AppError::InvalidTimestamp(_) => self.to_string(),
            other => format!("Error processing CDR: {}", other),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}
