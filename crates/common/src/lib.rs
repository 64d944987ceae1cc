//! SubQuery Common Library
//!
//! Shared code for the SubQuery engine and gateway including:
//! - Error types and handling
//! - Configuration management
//! - Chat model abstraction
//! - Metrics and observability

pub mod config;
pub mod errors;
pub mod llm;
pub mod metrics;
pub mod telemetry;

// Re-export commonly used types
pub use config::{AppConfig, ConcurrencyMode};
pub use errors::{AppError, Result};
pub use llm::ChatModel;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
