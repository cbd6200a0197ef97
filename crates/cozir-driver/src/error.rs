//! Error types for the driver

use thiserror::Error;

/// Errors reported by the driver
///
/// These are returned from [`CozirDriver`](crate::CozirDriver) calls and also
/// published on the event channel, so they are cheap to clone.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// Transport could not be opened; the driver stays idle
    #[error("failed to open port: {0}")]
    OpenFailure(String),

    /// Asynchronous channel error while running; polling continues
    #[error("transport error: {0}")]
    RuntimeTransport(String),

    /// Transport could not be closed cleanly; the driver is idle regardless
    #[error("failed to close port: {0}")]
    CloseFailure(String),

    /// Configuration rejected at construction
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The driver actor has shut down
    #[error("driver actor is not running")]
    ActorUnavailable,
}

/// Errors that can occur while loading a configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Parsed but failed validation
    #[error(transparent)]
    Invalid(#[from] DriverError),
}
