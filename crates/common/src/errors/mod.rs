//! Error types for the PaperPulse pipeline
//!
//! Provides:
//! - A single `AppError` for store, configuration, and lookup failures
//! - A `Result` alias used throughout the workspace
//!
//! Source-connector and job-level errors live in their own crates and
//! convert into `AppError` only when they cross the store boundary.

use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Resource errors
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound { resource_type: String, id: String },

    #[error("Paper not found: {id}")]
    PaperNotFound { id: String },

    #[error("Job run not found: {id}")]
    RunNotFound { id: String },

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Database connection error: {message}")]
    DatabaseConnection { message: String },

    // Internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Whether this error means the requested row simply does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            AppError::NotFound { .. } | AppError::PaperNotFound { .. } | AppError::RunNotFound { .. }
        )
    }

    /// Whether this error indicates the store itself is unhealthy,
    /// as opposed to a bad lookup. Runs abort as `failed` on these.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            AppError::Database(_) | AppError::DatabaseConnection { .. }
        )
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration {
            message: err.to_string(),
        }
    }
}
