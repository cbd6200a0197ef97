//! Driver lifecycle state

use serde::{Deserialize, Serialize};

/// Lifecycle state of a driver
///
/// ```text
/// Idle -> Opening -> AwaitingHandshake -> Polling -> Closing -> Idle
///            |                 |                        ^
///            +--> Idle         +------------------------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DriverState {
    /// No transport open
    #[default]
    Idle,
    /// Transport open in progress
    Opening,
    /// Handshake scheduled, waiting for the mode acknowledgment
    AwaitingHandshake,
    /// Poll cycle running
    Polling,
    /// Transport close in progress
    Closing,
}

impl DriverState {
    /// Get human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Opening => "Opening",
            Self::AwaitingHandshake => "Awaiting handshake",
            Self::Polling => "Polling",
            Self::Closing => "Closing",
        }
    }

    /// Whether a transport session is open
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::AwaitingHandshake | Self::Polling)
    }
}
