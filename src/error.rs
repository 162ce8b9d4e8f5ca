//! Error types for favlist-syncer
//!
//! This module provides the error hierarchy for the library:
//! - [`Error`] - top-level error returned by every fallible operation
//! - [`DatabaseError`] - ledger failures
//! - [`SourceError`] - content source lookups (favlist pages, parts, stream URLs)
//! - [`DownloadError`] - scheduling and transfer failures
//! - [`ApiError`] / [`ToHttpStatus`] - mapping onto the REST layer

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::types::{TaskId, TaskStatus};

/// Result type alias for favlist-syncer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for favlist-syncer
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "download.concurrent")
        key: Option<String>,
    },

    /// Ledger operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Content source lookup failed
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// Scheduling or transfer error
    #[error("download error: {0}")]
    Download(#[from] DownloadError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Process-wide cancellation was observed
    #[error("operation cancelled")]
    Cancelled,

    /// Shutdown in progress - not accepting new tasks
    #[error("shutdown in progress: not accepting new tasks")]
    ShuttingDown,

    /// Requested record not found
    #[error("not found: {0}")]
    NotFound(String),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Ledger errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Record not found
    #[error("record not found: {0}")]
    NotFound(String),
}

/// Content source lookup errors
#[derive(Debug, Error)]
pub enum SourceError {
    /// The API answered with a non-zero status code
    #[error("bilibili API error {code}: {message}")]
    Api {
        /// API status code
        code: i64,
        /// API status message
        message: String,
    },

    /// The response body could not be interpreted
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The video has no playable parts
    #[error("no video parts found for {bvid}")]
    NoParts {
        /// Video identifier
        bvid: String,
    },

    /// The stream lookup returned no direct URL
    #[error("no stream URL found for {bvid}")]
    NoStreamUrl {
        /// Video identifier
        bvid: String,
    },
}

/// Scheduling and transfer errors
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The media server answered with something other than 200
    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus {
        /// HTTP status code
        status: u16,
        /// Requested URL
        url: String,
    },

    /// The media server stopped sending for longer than the transfer timeout
    #[error("no data from {url} for {timeout_ms}ms")]
    Stalled {
        /// Requested URL
        url: String,
        /// Configured timeout in milliseconds
        timeout_ms: u128,
    },

    /// Every transfer attempt failed
    #[error("max retry attempts reached ({attempts}): {last_error}")]
    RetriesExhausted {
        /// Number of attempts made
        attempts: u32,
        /// Error text of the final attempt
        last_error: String,
    },

    /// The bounded task queue is full
    #[error("download queue is full (capacity {capacity})")]
    QueueFull {
        /// Configured queue capacity
        capacity: usize,
    },

    /// The video already has a queued or downloading task
    #[error("{bvid} is already scheduled as task {task_id}")]
    AlreadyScheduled {
        /// Video identifier
        bvid: String,
        /// The in-flight task for this video
        task_id: TaskId,
    },

    /// Status change not permitted by the task state machine
    #[error("task {id} cannot move from {from} to {to}")]
    InvalidTransition {
        /// Task id
        id: TaskId,
        /// Current status
        from: TaskStatus,
        /// Requested status
        to: TaskStatus,
    },

    /// Task id not registered
    #[error("task {id} not found")]
    TaskNotFound {
        /// Task id
        id: TaskId,
    },
}

/// Structured error body returned by the REST API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Machine-readable error code (e.g. "not_found")
    pub code: String,
    /// Human-readable message
    pub message: String,
}

impl ApiError {
    /// Create an error body
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// 404 body for a missing resource
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new("not_found", format!("{} not found", resource.into()))
    }

    /// 400 body for invalid input
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("validation_error", message)
    }
}

/// Maps errors onto HTTP status codes and stable error codes
pub trait ToHttpStatus {
    /// HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            Error::Config { .. } => 400,
            Error::NotFound(_) => 404,
            Error::Database(DatabaseError::NotFound(_)) => 404,
            Error::Download(DownloadError::TaskNotFound { .. }) => 404,
            Error::Download(DownloadError::AlreadyScheduled { .. }) => 409,
            Error::Download(DownloadError::InvalidTransition { .. }) => 409,
            Error::Download(DownloadError::QueueFull { .. }) => 503,
            Error::ShuttingDown | Error::Cancelled => 503,
            Error::Source(_) | Error::Network(_) => 502,
            _ => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::NotFound(_) => "not_found",
            Error::Database(DatabaseError::NotFound(_)) => "not_found",
            Error::Database(_) | Error::Sqlx(_) => "database_error",
            Error::Download(DownloadError::TaskNotFound { .. }) => "not_found",
            Error::Download(DownloadError::AlreadyScheduled { .. }) => "already_scheduled",
            Error::Download(DownloadError::InvalidTransition { .. }) => "invalid_transition",
            Error::Download(DownloadError::QueueFull { .. }) => "queue_full",
            Error::Download(_) => "download_error",
            Error::ShuttingDown | Error::Cancelled => "shutting_down",
            Error::Source(_) => "source_error",
            Error::Network(_) => "network_error",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        ApiError::new(error.error_code().to_string(), error.to_string())
    }
}
