//! Error types for RagForge services
//!
//! Provides the error taxonomy shared by every pipeline component:
//! - One variant per failure kind the caller can act on
//! - Stable machine-readable codes
//! - Transient / defect classification
//! - A serialisable error body for callers that speak JSON

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::ProviderKind;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error kinds for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    // Request errors (1xxx)
    InvalidRequest,
    UnsupportedProvider,

    // Credential errors (2xxx)
    MissingCredential,
    ProviderAuthRejected,

    // Provider errors (8xxx)
    ProviderRateLimited,
    ProviderTimeout,
    ProviderUnavailable,
    ProviderContentBlocked,
    ProviderResponseInvalid,

    // Internal errors (9xxx)
    TemplateBindingError,
    ConfigurationError,
    InternalError,
}

impl ErrorKind {
    /// Get the numeric code for this error kind
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorKind::InvalidRequest => 1001,
            ErrorKind::UnsupportedProvider => 1002,

            ErrorKind::MissingCredential => 2001,
            ErrorKind::ProviderAuthRejected => 2002,

            ErrorKind::ProviderRateLimited => 8001,
            ErrorKind::ProviderTimeout => 8002,
            ErrorKind::ProviderUnavailable => 8003,
            ErrorKind::ProviderContentBlocked => 8004,
            ErrorKind::ProviderResponseInvalid => 8005,

            ErrorKind::TemplateBindingError => 9001,
            ErrorKind::ConfigurationError => 9002,
            ErrorKind::InternalError => 9003,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid request: {message}")]
    InvalidRequest {
        message: String,
        field: Option<String>,
    },

    #[error("Unsupported provider: {provider}")]
    UnsupportedProvider { provider: String },

    #[error("No API key available for {provider}")]
    MissingCredential { provider: ProviderKind },

    #[error("{provider} rejected the credential (HTTP {status})")]
    ProviderAuthRejected { provider: ProviderKind, status: u16 },

    #[error("{provider} rate limit exceeded: {message}")]
    ProviderRateLimited {
        provider: ProviderKind,
        message: String,
    },

    /// `timeout_ms` is set when our own deadline elapsed, `status` when the
    /// backend reported a timeout itself (408/504)
    #[error("{provider} {}", timeout_detail(.timeout_ms, .status))]
    ProviderTimeout {
        provider: ProviderKind,
        timeout_ms: Option<u64>,
        status: Option<u16>,
    },

    #[error("{provider} unavailable{}: {message}", status_suffix(.status))]
    ProviderUnavailable {
        provider: ProviderKind,
        status: Option<u16>,
        message: String,
    },

    #[error("{provider} blocked content generation: {reason}")]
    ProviderContentBlocked {
        provider: ProviderKind,
        reason: String,
    },

    #[error("{provider} returned an unusable response{}: {message}", status_suffix(.status))]
    ProviderResponseInvalid {
        provider: ProviderKind,
        status: Option<u16>,
        message: String,
    },

    #[error("Template '{template}' is missing required variable '{variable}'")]
    TemplateBinding { template: String, variable: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default()
}

fn timeout_detail(timeout_ms: &Option<u64>, status: &Option<u16>) -> String {
    match timeout_ms {
        Some(ms) => format!("did not respond within {}ms", ms),
        None => format!("timed out upstream{}", status_suffix(status)),
    }
}

impl AppError {
    /// Shorthand for a missing or blank required field
    pub fn missing_field(field: &str) -> Self {
        AppError::InvalidRequest {
            message: format!("'{}' is required", field),
            field: Some(field.to_string()),
        }
    }

    /// Get the error kind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::InvalidRequest { .. } => ErrorKind::InvalidRequest,
            AppError::UnsupportedProvider { .. } => ErrorKind::UnsupportedProvider,
            AppError::MissingCredential { .. } => ErrorKind::MissingCredential,
            AppError::ProviderAuthRejected { .. } => ErrorKind::ProviderAuthRejected,
            AppError::ProviderRateLimited { .. } => ErrorKind::ProviderRateLimited,
            AppError::ProviderTimeout { .. } => ErrorKind::ProviderTimeout,
            AppError::ProviderUnavailable { .. } => ErrorKind::ProviderUnavailable,
            AppError::ProviderContentBlocked { .. } => ErrorKind::ProviderContentBlocked,
            AppError::ProviderResponseInvalid { .. } => ErrorKind::ProviderResponseInvalid,
            AppError::TemplateBinding { .. } => ErrorKind::TemplateBindingError,
            AppError::Configuration { .. } => ErrorKind::ConfigurationError,
            AppError::Internal { .. } => ErrorKind::InternalError,
        }
    }

    /// Provider the failure is attributed to, if any
    pub fn provider(&self) -> Option<ProviderKind> {
        match self {
            AppError::MissingCredential { provider }
            | AppError::ProviderAuthRejected { provider, .. }
            | AppError::ProviderRateLimited { provider, .. }
            | AppError::ProviderTimeout { provider, .. }
            | AppError::ProviderUnavailable { provider, .. }
            | AppError::ProviderContentBlocked { provider, .. }
            | AppError::ProviderResponseInvalid { provider, .. } => Some(*provider),
            _ => None,
        }
    }

    /// Safe for the caller to retry with backoff
    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::ProviderRateLimited | ErrorKind::ProviderTimeout | ErrorKind::ProviderUnavailable
        )
    }

    /// Contract violation inside this crate rather than a user-facing failure
    pub fn is_defect(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::TemplateBindingError | ErrorKind::InternalError
        )
    }

    /// Fixable by the caller without retrying
    pub fn is_client_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::InvalidRequest
                | ErrorKind::UnsupportedProvider
                | ErrorKind::MissingCredential
                | ErrorKind::ProviderAuthRejected
        )
    }

    /// HTTP status the surrounding application should answer with
    pub fn http_status(&self) -> u16 {
        match self.kind() {
            ErrorKind::InvalidRequest | ErrorKind::UnsupportedProvider => 400,
            ErrorKind::MissingCredential | ErrorKind::ProviderAuthRejected => 401,
            ErrorKind::ProviderContentBlocked => 422,
            ErrorKind::ProviderRateLimited => 429,
            ErrorKind::ProviderUnavailable | ErrorKind::ProviderResponseInvalid => 502,
            ErrorKind::ProviderTimeout => 504,
            ErrorKind::TemplateBindingError
            | ErrorKind::ConfigurationError
            | ErrorKind::InternalError => 500,
        }
    }

    /// Structured diagnostics attached to the error body
    fn details(&self) -> Option<serde_json::Value> {
        let mut details = serde_json::Map::new();
        if let Some(provider) = self.provider() {
            details.insert("provider".into(), provider.as_str().into());
        }
        match self {
            AppError::ProviderAuthRejected { status, .. } => {
                details.insert("status".into(), (*status).into());
            }
            AppError::ProviderUnavailable { status: Some(status), .. }
            | AppError::ProviderTimeout { status: Some(status), .. }
            | AppError::ProviderResponseInvalid { status: Some(status), .. } => {
                details.insert("status".into(), (*status).into());
            }
            AppError::InvalidRequest { field: Some(field), .. } => {
                details.insert("field".into(), field.clone().into());
            }
            _ => {}
        }
        (!details.is_empty()).then(|| serde_json::Value::Object(details))
    }
}

/// Structured error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorKind,
    pub numeric_code: u16,
    pub message: String,
    pub transient: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        let code = err.kind();
        ErrorResponse {
            error: ErrorDetails {
                code,
                numeric_code: code.as_code(),
                message: err.to_string(),
                transient: err.is_transient(),
                details: err.details(),
            },
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_mapping() {
        let err = AppError::MissingCredential {
            provider: ProviderKind::Groq,
        };
        assert_eq!(err.kind(), ErrorKind::MissingCredential);
        assert_eq!(err.http_status(), 401);
        assert_eq!(err.provider(), Some(ProviderKind::Groq));
        assert!(err.is_client_error());
        assert!(!err.is_transient());
    }

    #[test]
    fn test_transient_kinds() {
        let timeout = AppError::ProviderTimeout {
            provider: ProviderKind::Gemini,
            timeout_ms: Some(500),
            status: None,
        };
        let blocked = AppError::ProviderContentBlocked {
            provider: ProviderKind::Gemini,
            reason: "SAFETY".into(),
        };
        assert!(timeout.is_transient());
        assert_eq!(timeout.http_status(), 504);
        assert_eq!(timeout.to_string(), "gemini did not respond within 500ms");
        assert!(!blocked.is_transient());
        assert!(!blocked.is_client_error());
    }

    #[test]
    fn test_template_binding_is_defect() {
        let err = AppError::TemplateBinding {
            template: "synthesis".into(),
            variable: "query".into(),
        };
        assert!(err.is_defect());
        assert_eq!(err.kind().as_code(), 9001);
    }

    #[test]
    fn test_error_response_carries_provider_and_status() {
        let err = AppError::ProviderUnavailable {
            provider: ProviderKind::Ollama,
            status: Some(503),
            message: "overloaded".into(),
        };
        let body = ErrorResponse::from(&err);
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["error"]["code"], "PROVIDER_UNAVAILABLE");
        assert_eq!(json["error"]["details"]["provider"], "ollama");
        assert_eq!(json["error"]["details"]["status"], 503);
        assert_eq!(json["error"]["transient"], true);
        assert!(err.to_string().contains("HTTP 503"));
    }
}
