//! Error types for configuration acquisition

use serde::Serialize;
use thiserror::Error;

/// Result type alias for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Configuration error
///
/// Cloneable so that every caller awaiting a shared in-flight fetch
/// receives the same outcome.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("internal error: {message}")]
    Internal { message: String },

    #[error("upstream error: {message}")]
    UpstreamError { message: String },

    #[error("upstream timeout")]
    UpstreamTimeout,

    #[error("upstream returned HTTP {status}")]
    UpstreamStatus { status: u16 },

    #[error("malformed payload: {message}")]
    Malformed { message: String },

    #[error("invalid configuration: {message}")]
    Validation { message: String },

    #[error("storage error: {message}")]
    Storage { message: String },

    #[error("configuration not loaded yet")]
    NotReady,

    #[error("no configuration available: {message}")]
    Exhausted { message: String },
}

impl ConfigError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn upstream_error(message: impl Into<String>) -> Self {
        Self::UpstreamError {
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn exhausted(message: impl Into<String>) -> Self {
        Self::Exhausted {
            message: message.into(),
        }
    }

    /// Whether the next fallback tier should be tried after this error
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::UpstreamError { .. }
                | Self::UpstreamTimeout
                | Self::UpstreamStatus { .. }
                | Self::Malformed { .. }
                | Self::Validation { .. }
        )
    }

    /// Get the error key for this error
    pub fn error_key(&self) -> &'static str {
        match self {
            Self::InvalidRequest { .. } => "invalid_request",
            Self::Internal { .. } => "internal_error",
            Self::UpstreamError { .. } => "upstream_error",
            Self::UpstreamTimeout => "upstream_timeout",
            Self::UpstreamStatus { .. } => "upstream_status",
            Self::Malformed { .. } => "malformed_payload",
            Self::Validation { .. } => "invalid_config",
            Self::Storage { .. } => "storage_error",
            Self::NotReady => "not_ready",
            Self::Exhausted { .. } => "config_unavailable",
        }
    }
}

/// Serializable error report (printed by the CLI)
#[derive(Serialize)]
pub struct ErrorReport {
    pub error: String,
    pub message: String,
}

impl From<&ConfigError> for ErrorReport {
    fn from(err: &ConfigError) -> Self {
        Self {
            error: err.error_key().to_string(),
            message: err.to_string(),
        }
    }
}
