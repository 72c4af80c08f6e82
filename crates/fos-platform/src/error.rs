//! Platform errors
//!
//! Every failure propagates synchronously to the immediate caller. The
//! "nothing to do" conditions of the proxy and resolver operations are
//! reported as outcomes, not errors.

use crate::capability::Capability;
use std::time::Duration;

/// Result alias used throughout the crate
pub type PlatformResult<T> = Result<T, PlatformError>;

/// Platform integration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlatformError {
    /// Options missing or a required field is malformed. Fatal to startup.
    #[error("Invalid tunnel options: {0}")]
    InvalidOptions(String),

    /// Neither the packet flow nor the registered fallback yielded a handle.
    #[error("Tunnel handle unavailable")]
    HandleUnavailable,

    /// The OS refused the configuration. Never retried.
    #[error("Configuration rejected: {0}")]
    SinkRejected(String),

    /// The sink did not acknowledge within the configured bound.
    #[error("Configuration sink did not respond within {0:?}")]
    SinkTimeout(Duration),

    /// Operation requires an active default interface monitor.
    #[error("Default interface monitor not started")]
    NotStarted,

    /// The path observer produced no first observation in time.
    #[error("No network path observation within {0:?}")]
    FirstObservationTimeout(Duration),

    /// Capability declared absent when the adapter was built.
    #[error("Capability not supported: {0}")]
    Unsupported(Capability),

    #[error("Invalid policy: {0}")]
    InvalidPolicy(String),
}

impl PlatformError {
    /// Errors that end tunnel startup
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PlatformError::InvalidOptions(_)
                | PlatformError::HandleUnavailable
                | PlatformError::SinkRejected(_)
                | PlatformError::SinkTimeout(_)
        )
    }
}
