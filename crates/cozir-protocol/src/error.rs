//! Error types for COZIR protocol parsing

use thiserror::Error;

/// Errors that can occur while parsing a line from the sensor
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Line has no discriminator byte after the sentinel
    #[error("line too short: {0:?}")]
    TooShort(String),

    /// Payload after the discriminator is not a decimal integer
    #[error("invalid {tag} payload: {payload:?}")]
    InvalidPayload {
        /// Discriminator character of the line
        tag: char,
        /// Payload text that failed to parse
        payload: String,
    },

    /// Buffered data exceeded the maximum line length without a terminator
    #[error("line exceeds {0} bytes without terminator")]
    LineTooLong(usize),
}
