//! Error types for media-dl
//!
//! This module provides error handling for the library, including:
//! - Domain-specific error variants (request validation, engine, lifecycle)
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for media-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for media-dl
///
/// Errors raised before a job exists (validation, shutdown) are returned to the
/// submitter directly. Errors raised inside a worker are turned into a terminal
/// `Failed` job status instead and never reach the submitter.
#[derive(Debug, Error)]
pub enum Error {
    /// A submission field is missing, empty, or otherwise unusable
    #[error("invalid request: {field}: {reason}")]
    InvalidRequest {
        /// Name of the offending field (e.g., "url", "folder")
        field: String,
        /// Why the field was rejected
        reason: String,
    },

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "download_dir")
        key: Option<String>,
    },

    /// The extraction engine reported a failure (bad locator, network, transcode)
    #[error("engine error: {0}")]
    Engine(String),

    /// External tool could not be executed
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// Operation not supported (missing binary, not implemented, etc.)
    #[error("not supported: {0}")]
    NotSupported(String),

    /// Job not found
    #[error("job not found: {0}")]
    NotFound(String),

    /// Job already reached a terminal state
    #[error("job already finished: {0}")]
    AlreadyFinished(String),

    /// Job exceeded its deadline
    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// Job was cancelled before the engine finished
    #[error("cancelled")]
    Cancelled,

    /// Shutdown in progress - not accepting new jobs
    #[error("shutdown in progress: not accepting new jobs")]
    ShuttingDown,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for an [`Error::InvalidRequest`]
    pub fn invalid_request(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidRequest {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Short reason used in a job's `Failed: <reason>` status label
    ///
    /// Engine errors carry the engine's own message; everything else uses the
    /// error's display form.
    pub fn failure_reason(&self) -> String {
        match self {
            Error::Engine(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

/// API error response format
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "invalid_request",
///     "message": "invalid request: url: must not be empty",
///     "details": {
///       "field": "url"
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "not_found", "invalid_request")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - Client error (invalid input)
            Error::InvalidRequest { .. } => 400,
            Error::Config { .. } => 400,

            // 404 Not Found
            Error::NotFound(_) => 404,

            // 409 Conflict
            Error::AlreadyFinished(_) => 409,

            // 500 Internal Server Error
            Error::Io(_) => 500,
            Error::Serialization(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Cancelled => 500,
            Error::Other(_) => 500,

            // 501 Not Implemented
            Error::NotSupported(_) => 501,

            // 502 Bad Gateway - the engine failed upstream
            Error::Engine(_) => 502,

            // 503 Service Unavailable
            Error::ShuttingDown => 503,
            Error::ExternalTool(_) => 503,

            // 504 Gateway Timeout
            Error::Timeout(_) => 504,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::InvalidRequest { .. } => "invalid_request",
            Error::Config { .. } => "config_error",
            Error::Engine(_) => "engine_error",
            Error::ExternalTool(_) => "external_tool_error",
            Error::NotSupported(_) => "not_supported",
            Error::NotFound(_) => "not_found",
            Error::AlreadyFinished(_) => "already_finished",
            Error::Timeout(_) => "timeout",
            Error::Cancelled => "cancelled",
            Error::ShuttingDown => "shutting_down",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::InvalidRequest { field, .. } => Some(serde_json::json!({
                "field": field,
            })),
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({
                "key": key,
            })),
            Error::NotFound(id) | Error::AlreadyFinished(id) => Some(serde_json::json!({
                "job_id": id,
            })),
            Error::Timeout(after) => Some(serde_json::json!({
                "timeout_secs": after.as_secs(),
            })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
