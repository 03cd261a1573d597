//! RagForge Common Library
//!
//! Shared code for the RagForge orchestration core including:
//! - Error taxonomy and the JSON error body
//! - Configuration management
//! - Request and response models
//! - Metrics and tracing setup

pub mod config;
pub mod errors;
pub mod metrics;
pub mod models;
pub mod telemetry;

// Re-export commonly used types
pub use config::AppConfig;
pub use errors::{AppError, ErrorKind, ErrorResponse, Result};
pub use models::{AnalysisType, ChatRole, ChatTurn, ParsedAnswer, ProviderKind, Task};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
