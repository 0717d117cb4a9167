//! # Portrait Errors
//!
//! Error taxonomy shared by every crate of the portrait generation workspace.
//!
//! Provider failures are split into transient ones (retried locally by the
//! retry policy) and permanent ones (surfaced immediately). Client-side rate
//! limit rejections and cancellation are never retried automatically.

use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub type PortraitResult<T> = Result<T, PortraitError>;

#[derive(Debug, Error)]
pub enum PortraitError {
    #[error("Provider rejected credentials ({status}): {message}")]
    ApiAuthentication { status: u16, message: String },

    #[error("Provider connection failed: {reason}")]
    ApiConnection { status: Option<u16>, reason: String },

    #[error("Provider rate limited the request (retry after {retry_after_secs:?}s)")]
    ApiRateLimit { retry_after_secs: Option<u64> },

    #[error("Provider rejected the request ({status}): {message}")]
    ApiRejected { status: u16, message: String },

    #[error("Invalid provider response: {reason}")]
    InvalidResponse { reason: String },

    #[error("Client-side rate limit exceeded: {limit} requests per minute")]
    RateLimitExceeded { limit: u32 },

    #[error("File operation '{operation}' failed on {}: {source}", path.display())]
    FileOperation {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error
    },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Generation task failed: {reason}")]
    TaskFailed { reason: String },

    #[error("Operation cancelled")]
    Cancelled
}

/// Coarse classification used by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    Transient,
    Permanent
}

impl PortraitError {
    pub fn file_op(operation: &'static str, path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::FileOperation {
            operation,
            path: path.as_ref().to_path_buf(),
            source
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into()
        }
    }

    pub fn invalid_response(reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            reason: reason.into()
        }
    }

    pub fn class(&self) -> FailureClass {
        if self.is_transient() {
            FailureClass::Transient
        } else {
            FailureClass::Permanent
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ApiConnection { .. } | Self::ApiRateLimit { .. })
    }

    pub fn retry_after(&self) -> Option<u64> {
        if let Self::ApiRateLimit { retry_after_secs } = self {
            *retry_after_secs
        } else {
            None
        }
    }

    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ApiAuthentication { .. } => "api_authentication",
            Self::ApiConnection { .. } => "api_connection",
            Self::ApiRateLimit { .. } => "api_rate_limit",
            Self::ApiRejected { .. } => "api_rejected",
            Self::InvalidResponse { .. } => "invalid_response",
            Self::RateLimitExceeded { .. } => "rate_limit_exceeded",
            Self::FileOperation { .. } => "file_operation",
            Self::Configuration { .. } => "configuration",
            Self::TaskFailed { .. } => "task_failed",
            Self::Cancelled => "cancelled"
        }
    }
}
