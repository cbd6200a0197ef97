//! Outbound commands
//!
//! The driver only ever sends five commands. Each is a short ASCII string
//! terminated by CR-LF.
//!
//! | command | wire | purpose |
//! |---|---|---|
//! | [`Command::ConfigQuery`] | `*` | dump configuration (wakes some units up) |
//! | [`Command::SetMode`] | `K 2` | select the operating mode |
//! | [`Command::Co2Query`] | `Z` | request a CO2 reading |
//! | [`Command::TemperatureQuery`] | `T` | request a temperature reading |
//! | [`Command::HumidityQuery`] | `H` | request a humidity reading |

use std::fmt;

use crate::{EncodeCommand, LINE_TERMINATOR};

/// Sensor operating mode, selected with `K n`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OperatingMode {
    /// Sleep mode; the sensor only answers mode changes
    Command,
    /// Sensor streams measurements unprompted
    Streaming,
    /// Sensor answers measurement queries
    Polling,
}

impl OperatingMode {
    /// Numeric code used on the wire
    pub fn code(&self) -> u8 {
        match self {
            Self::Command => 0,
            Self::Streaming => 1,
            Self::Polling => 2,
        }
    }

    /// Look up a mode by its numeric code
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Command),
            1 => Some(Self::Streaming),
            2 => Some(Self::Polling),
            _ => None,
        }
    }
}

/// A command sent to the sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Command {
    /// `*`
    ConfigQuery,
    /// `K n`
    SetMode(OperatingMode),
    /// `Z`
    Co2Query,
    /// `T`
    TemperatureQuery,
    /// `H`
    HumidityQuery,
}

impl Command {
    /// Command text without the terminator
    pub fn as_line(&self) -> String {
        match self {
            Self::ConfigQuery => "*".to_string(),
            Self::SetMode(mode) => format!("K {}", mode.code()),
            Self::Co2Query => "Z".to_string(),
            Self::TemperatureQuery => "T".to_string(),
            Self::HumidityQuery => "H".to_string(),
        }
    }

    /// Parse a command line (without terminator)
    ///
    /// This is the sensor's view of the protocol and is used by simulators.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        match line {
            "*" => Some(Self::ConfigQuery),
            "Z" => Some(Self::Co2Query),
            "T" => Some(Self::TemperatureQuery),
            "H" => Some(Self::HumidityQuery),
            _ => {
                let code = line.strip_prefix('K')?.trim().parse::<u8>().ok()?;
                OperatingMode::from_code(code).map(Self::SetMode)
            }
        }
    }
}

impl EncodeCommand for Command {
    fn encode(&self) -> Vec<u8> {
        let mut bytes = self.as_line().into_bytes();
        bytes.extend_from_slice(LINE_TERMINATOR.as_bytes());
        bytes
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_line())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_handshake_commands() {
        assert_eq!(Command::ConfigQuery.encode(), b"*\r\n");
        assert_eq!(Command::SetMode(OperatingMode::Polling).encode(), b"K 2\r\n");
    }

    #[test]
    fn test_encode_queries() {
        assert_eq!(Command::Co2Query.encode(), b"Z\r\n");
        assert_eq!(Command::TemperatureQuery.encode(), b"T\r\n");
        assert_eq!(Command::HumidityQuery.encode(), b"H\r\n");
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("*"), Some(Command::ConfigQuery));
        assert_eq!(
            Command::parse("K 2"),
            Some(Command::SetMode(OperatingMode::Polling))
        );
        assert_eq!(
            Command::parse("K0"),
            Some(Command::SetMode(OperatingMode::Command))
        );
        assert_eq!(Command::parse("Z"), Some(Command::Co2Query));
        assert_eq!(Command::parse("K 9"), None);
        assert_eq!(Command::parse("Q"), None);
    }
}
