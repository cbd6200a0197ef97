//! Virtual sensor simulation
//!
//! Provides a simulated COZIR sensor that answers commands the way the
//! firmware does, formatting replies with the sentinel-prefixed wire format.

use std::collections::VecDeque;

use cozir_protocol::message::SENTINEL;
use cozir_protocol::{Command, Measurement, OperatingMode, Tenths};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Configuration for creating a virtual sensor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VirtualCozirConfig {
    /// Display name/identifier
    pub id: String,
    /// Initial CO2 concentration in ppm
    pub co2_ppm: u32,
    /// Initial temperature in °C
    pub temperature: Tenths,
    /// Initial relative humidity in %
    pub humidity: Tenths,
    /// Mode the sensor powers up in
    pub initial_mode: OperatingMode,
}

impl Default for VirtualCozirConfig {
    fn default() -> Self {
        Self {
            id: "Virtual COZIR".to_string(),
            co2_ppm: 412,
            temperature: Tenths::new(234),
            humidity: Tenths::new(456),
            initial_mode: OperatingMode::Streaming,
        }
    }
}

/// A simulated COZIR sensor
#[derive(Debug)]
pub struct VirtualCozir {
    id: String,
    co2_ppm: u32,
    temperature: Tenths,
    humidity: Tenths,
    mode: OperatingMode,
    pending_output: VecDeque<String>,
}

impl VirtualCozir {
    /// Create a virtual sensor with default readings
    pub fn new(id: impl Into<String>) -> Self {
        Self::from_config(VirtualCozirConfig {
            id: id.into(),
            ..Default::default()
        })
    }

    /// Create a virtual sensor from configuration
    pub fn from_config(config: VirtualCozirConfig) -> Self {
        Self {
            id: config.id,
            co2_ppm: config.co2_ppm,
            temperature: config.temperature,
            humidity: config.humidity,
            mode: config.initial_mode,
            pending_output: VecDeque::new(),
        }
    }

    /// Get the sensor's identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current operating mode
    pub fn mode(&self) -> OperatingMode {
        self.mode
    }

    /// Current CO2 concentration in ppm
    pub fn co2_ppm(&self) -> u32 {
        self.co2_ppm
    }

    /// Set the CO2 concentration reported by future queries
    pub fn set_co2_ppm(&mut self, ppm: u32) {
        self.co2_ppm = ppm;
    }

    /// Current temperature
    pub fn temperature(&self) -> Tenths {
        self.temperature
    }

    /// Set the temperature reported by future queries
    pub fn set_temperature(&mut self, celsius: Tenths) {
        self.temperature = celsius;
    }

    /// Current relative humidity
    pub fn humidity(&self) -> Tenths {
        self.humidity
    }

    /// Set the humidity reported by future queries
    pub fn set_humidity(&mut self, percent: Tenths) {
        self.humidity = percent;
    }

    /// Process one command line (terminator stripped), queueing any reply
    ///
    /// Returns the parsed command, or `None` if the line was not understood.
    /// Measurement queries are only answered in polling mode.
    pub fn handle_line(&mut self, line: &str) -> Option<Command> {
        let Some(command) = Command::parse(line) else {
            debug!("Virtual sensor {} rejecting {:?}", self.id, line);
            self.queue(format!("{}?", SENTINEL));
            return None;
        };

        match command {
            Command::ConfigQuery => {
                let config = format!("{}Y,{},{},{}", SENTINEL, self.id, self.mode.code(), 1);
                self.queue(config);
            }
            Command::SetMode(mode) => {
                self.mode = mode;
                self.queue(format!("{}K {:05}", SENTINEL, mode.code()));
            }
            Command::Co2Query => self.answer(Measurement::Co2 { ppm: self.co2_ppm }),
            Command::TemperatureQuery => self.answer(Measurement::Temperature {
                celsius: self.temperature,
            }),
            Command::HumidityQuery => self.answer(Measurement::Humidity {
                percent: self.humidity,
            }),
        }
        Some(command)
    }

    /// Take the next reply line (without terminator)
    pub fn take_output(&mut self) -> Option<String> {
        self.pending_output.pop_front()
    }

    /// Check if there is pending output
    pub fn has_output(&self) -> bool {
        !self.pending_output.is_empty()
    }

    fn answer(&mut self, measurement: Measurement) {
        if self.mode == OperatingMode::Polling {
            self.queue(measurement.to_line());
        } else {
            debug!(
                "Virtual sensor {} ignoring {} query in {:?} mode",
                self.id,
                measurement.kind().name(),
                self.mode
            );
        }
    }

    fn queue(&mut self, line: String) {
        self.pending_output.push_back(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cozir_protocol::Message;

    #[test]
    fn test_queries_ignored_until_polling_mode() {
        let mut sensor = VirtualCozir::new("test");
        assert_eq!(sensor.handle_line("Z"), Some(Command::Co2Query));
        assert!(!sensor.has_output());

        sensor.handle_line("K 2");
        assert_eq!(sensor.mode(), OperatingMode::Polling);
        assert_eq!(sensor.take_output().as_deref(), Some(" K 00002"));

        sensor.handle_line("Z");
        sensor.handle_line("T");
        sensor.handle_line("H");
        assert_eq!(sensor.take_output().as_deref(), Some(" Z 00412"));
        assert_eq!(sensor.take_output().as_deref(), Some(" T 01234"));
        assert_eq!(sensor.take_output().as_deref(), Some(" H 00456"));
        assert!(sensor.take_output().is_none());
    }

    #[test]
    fn test_replies_parse_back_to_readings() {
        let mut sensor = VirtualCozir::from_config(VirtualCozirConfig {
            initial_mode: OperatingMode::Polling,
            ..Default::default()
        });
        sensor.set_temperature(Tenths::new(-15));
        sensor.handle_line("T");

        let line = sensor.take_output().unwrap();
        assert_eq!(
            Message::parse(&line),
            Ok(Message::Measurement(Measurement::Temperature {
                celsius: Tenths::new(-15)
            }))
        );
    }

    #[test]
    fn test_config_query_is_not_a_reading() {
        let mut sensor = VirtualCozir::new("test");
        sensor.handle_line("*");
        let line = sensor.take_output().unwrap();
        assert!(matches!(Message::parse(&line), Ok(Message::Unknown(_))));
    }

    #[test]
    fn test_unknown_command_answered_with_question_mark() {
        let mut sensor = VirtualCozir::new("test");
        assert_eq!(sensor.handle_line("Q"), None);
        assert_eq!(sensor.take_output().as_deref(), Some(" ?"));
    }
}
