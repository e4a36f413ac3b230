//! PaperPulse Common Library
//!
//! Shared code for the PaperPulse pipeline including:
//! - Database entities and the store abstraction
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod config;
pub mod db;
pub mod errors;
pub mod metrics;
pub mod store;

// Re-export commonly used types
pub use config::AppConfig;
pub use errors::{AppError, Result};
pub use store::{create_store, MemStore, PgStore, Store};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Service name used in logs and metrics
pub const SERVICE_NAME: &str = "paperpulse";
