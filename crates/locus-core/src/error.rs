//! Error types for locus.
//!
//! [`LocationError`] is the failure half of every request result. It is
//! delivered as data to subscribers, never thrown across the dispatcher, so it
//! is `Clone` and compares by value.

use std::time::Duration;
use thiserror::Error;

/// Failure reasons delivered to request subscribers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocationError {
    /// The request was cancelled explicitly or superseded.
    #[error("request cancelled")]
    Cancelled,

    /// The request's timeout elapsed before it was satisfied.
    #[error("request timed out after {}s", interval.as_secs_f64())]
    Timeout {
        /// Interval the timeout was configured with
        interval: Duration,
    },

    /// Transport or platform error reported by a collaborator.
    #[error("{0}")]
    Generic(String),

    /// The request could not be constructed (bad URL, invalid parameters).
    #[error("internal error")]
    InternalError,

    /// The response did not match the expected shape.
    #[error("failed to parse response")]
    ParsingError,

    /// The provider requires a credential that was not supplied.
    #[error("missing or invalid API key")]
    MissingApiKey,

    /// Provider-specific failure code.
    #[error("provider error: {0}")]
    Other(String),
}

impl LocationError {
    /// Create a timeout error for the given interval.
    #[must_use]
    pub fn timeout(interval: Duration) -> Self {
        Self::Timeout { interval }
    }

    /// `true` for [`LocationError::Cancelled`].
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Why an inbound value was dropped without being dispatched.
///
/// Discards are silent: they are neither counted nor delivered and never
/// trigger eviction.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiscardReason {
    /// The request is disabled.
    #[error("request not enabled")]
    RequestNotEnabled,

    /// The request is paused.
    #[error("request paused")]
    RequestPaused,

    /// Reported accuracy is coarser than required.
    #[error("accuracy below the required minimum")]
    NotMinAccuracy,

    /// Too close to the last accepted value.
    #[error("minimum distance not reached")]
    NotMinDistance,

    /// Too soon after the last accepted value.
    #[error("minimum interval not elapsed")]
    NotMinInterval,

    /// The value does not concern this request (other region, other beacon).
    #[error("value does not match the request filter")]
    NotMatching,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to determine config directory path
    #[error("could not determine config directory (XDG base directories not available)")]
    NoConfigDir,

    /// Failed to parse TOML
    #[error("failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to serialize config
    #[error("failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// I/O error reading/writing config
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration value
    #[error("invalid config value for {field}: {reason}")]
    InvalidValue {
        /// Field name
        field: String,
        /// Reason for invalidity
        reason: String,
    },
}

/// Outcome of a request: a payload or a [`LocationError`].
pub type RequestResult<T> = std::result::Result<T, LocationError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LocationError::timeout(Duration::from_secs(3));
        assert_eq!(err.to_string(), "request timed out after 3s");

        let err = LocationError::Other("104".to_string());
        assert_eq!(err.to_string(), "provider error: 104");

        let err = ConfigError::NoConfigDir;
        assert_eq!(
            err.to_string(),
            "could not determine config directory (XDG base directories not available)"
        );
    }

    #[test]
    fn test_errors_compare_by_value() {
        assert_eq!(
            LocationError::timeout(Duration::from_secs(3)),
            LocationError::Timeout {
                interval: Duration::from_secs(3)
            }
        );
        assert_ne!(LocationError::Cancelled, LocationError::InternalError);
        assert!(LocationError::Cancelled.is_cancelled());
        assert!(!LocationError::ParsingError.is_cancelled());
    }

    #[test]
    fn test_config_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: ConfigError = io_err.into();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
