//! Error types for the request engine.
//!
//! Request failures are never returned from these APIs; they reach
//! subscribers as [`locus_core::LocationError`] values. The errors here only
//! cover talking to the dispatcher and persisting requests.

use locus_core::{ConfigError, RequestId};
use thiserror::Error;

/// Errors returned by the dispatcher handle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatcherError {
    /// The dispatcher task has stopped.
    #[error("dispatcher is not running")]
    Closed,

    /// A request with the same identifier is already queued.
    #[error("request already queued: {0}")]
    AlreadyQueued(RequestId),

    /// The request was removed before; a new request is needed.
    #[error("request already expired: {0}")]
    Expired(RequestId),
}

/// Errors saving or loading request snapshots.
#[derive(Error, Debug)]
pub enum PersistError {
    /// Reading or writing the store failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The store contents are not valid JSON
    #[error("invalid request store: {0}")]
    Json(#[from] serde_json::Error),

    /// The default store location could not be resolved
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for dispatcher operations.
pub type Result<T> = std::result::Result<T, DispatcherError>;
