//! Error types for the record store and the workflow

use thiserror::Error;

use crate::model::Entry;

/// Record store error
#[derive(Debug, Error)]
pub enum StoreError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Local SQLite backend failed
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Server returned a non-success status
    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    /// Response body did not have the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Backend is misconfigured or unusable
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Outcome of a failed emulated update.
///
/// `Rejected` means the original entry is still in the store. `Partial` means
/// the delete went through but the replacement was never written, so the
/// logical record is currently missing.
#[derive(Debug, Error)]
pub enum UpdateFailure {
    #[error("edit of entry {uid} rejected, nothing changed: {reason}")]
    Rejected { uid: String, reason: String },

    #[error("entry {uid} was deleted but its replacement could not be created: {source}")]
    Partial {
        uid: String,
        replacement: Box<Entry>,
        #[source]
        source: StoreError,
    },
}

impl UpdateFailure {
    pub fn uid(&self) -> &str {
        match self {
            UpdateFailure::Rejected { uid, .. } | UpdateFailure::Partial { uid, .. } => uid,
        }
    }
}

/// User-facing failures of workflow operations.
#[derive(Debug, Error)]
pub enum FlowError {
    /// Any store call that failed or returned a non-success status.
    #[error("network failure: {0}")]
    TransientNetworkFailure(#[from] StoreError),

    #[error("invalid username or password")]
    InvalidCredentials,

    /// More than one user row matched; usernames must be unique.
    #[error("{count} user records match {username:?}, check the Users table")]
    AmbiguousIdentity { username: String, count: usize },

    #[error("{field} must be a number (got {value:?})")]
    ValidationFailure { field: String, value: String },

    #[error("unknown form field: {0}")]
    UnknownField(String),

    /// The requested action is not available in the current step.
    #[error("{0}")]
    NotReady(String),

    #[error(transparent)]
    Update(#[from] UpdateFailure),
}

impl FlowError {
    /// Stable IPC error code.
    pub fn code(&self) -> &'static str {
        match self {
            FlowError::TransientNetworkFailure(_) => "network_failure",
            FlowError::InvalidCredentials => "invalid_credentials",
            FlowError::AmbiguousIdentity { .. } => "ambiguous_identity",
            FlowError::ValidationFailure { .. } => "validation_failed",
            FlowError::UnknownField(_) => "bad_params",
            FlowError::NotReady(_) => "not_ready",
            FlowError::Update(UpdateFailure::Rejected { .. }) => "update_rejected",
            FlowError::Update(UpdateFailure::Partial { .. }) => "update_partial",
        }
    }
}
