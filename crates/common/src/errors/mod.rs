//! Error types for LexRAG
//!
//! Provides a single error enum shared by ingestion, retrieval and answering:
//! - Distinct variants for each pipeline failure mode
//! - HTTP status code mapping
//! - Structured error responses
//! - Error codes for client handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Request errors (1xxx)
    ValidationError,
    InvalidArgument,

    // Corpus & index errors (4xxx)
    LoadError,
    BuildError,
    DimensionMismatch,

    // External service errors (8xxx)
    UpstreamError,
    EmbeddingError,
    GenerationError,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::ValidationError => 1001,
            ErrorCode::InvalidArgument => 1002,

            ErrorCode::LoadError => 4001,
            ErrorCode::BuildError => 4002,
            ErrorCode::DimensionMismatch => 4003,

            ErrorCode::UpstreamError => 8001,
            ErrorCode::EmbeddingError => 8002,
            ErrorCode::GenerationError => 8003,

            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Request errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    // Corpus & index errors
    #[error("Failed to load {path}: {message}")]
    Load { path: String, message: String },

    #[error("Index build failed: {message}")]
    Build {
        message: String,
        #[source]
        source: Box<AppError>,
    },

    #[error("Embedding dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    // External service errors
    #[error("Embedding service error: {message}")]
    Embedding { message: String },

    #[error("Generation failed: {source}")]
    Generation {
        #[source]
        source: Box<AppError>,
    },

    #[error("Upstream error: {message}")]
    Upstream { message: String },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Shorthand for an invalid argument
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        AppError::InvalidArgument {
            message: message.into(),
        }
    }

    /// Shorthand for a load failure on a given path
    pub fn load(path: impl std::fmt::Display, message: impl Into<String>) -> Self {
        AppError::Load {
            path: path.to_string(),
            message: message.into(),
        }
    }

    /// Wrap a failure raised while building an index
    pub fn build(message: impl Into<String>, source: AppError) -> Self {
        AppError::Build {
            message: message.into(),
            source: Box::new(source),
        }
    }

    /// Wrap a failure raised by the generative model
    pub fn generation(source: AppError) -> Self {
        AppError::Generation {
            source: Box::new(source),
        }
    }

    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::InvalidArgument { .. } => ErrorCode::InvalidArgument,
            AppError::Load { .. } => ErrorCode::LoadError,
            AppError::Build { .. } => ErrorCode::BuildError,
            AppError::DimensionMismatch { .. } => ErrorCode::DimensionMismatch,
            AppError::Embedding { .. } => ErrorCode::EmbeddingError,
            AppError::Generation { .. } => ErrorCode::GenerationError,
            AppError::Upstream { .. } => ErrorCode::UpstreamError,
            AppError::HttpClient(_) => ErrorCode::UpstreamError,
            AppError::Io(_) => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation { .. } | AppError::InvalidArgument { .. } => {
                StatusCode::BAD_REQUEST
            }

            // 502 Bad Gateway
            AppError::Embedding { .. }
            | AppError::Generation { .. }
            | AppError::Upstream { .. }
            | AppError::HttpClient(_) => StatusCode::BAD_GATEWAY,

            // 500 Internal Server Error
            AppError::Load { .. }
            | AppError::Build { .. }
            | AppError::DimensionMismatch { .. }
            | AppError::Configuration { .. }
            | AppError::Serialization(_)
            | AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

/// Structured error response for API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        if self.is_server_error() {
            tracing::error!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        let field = match &self {
            AppError::Validation { field, .. } => field.clone(),
            _ => None,
        };

        let body = ErrorResponse {
            error: ErrorDetails {
                code,
                message,
                field,
            },
        };

        (status, Json(body)).into_response()
    }
}
