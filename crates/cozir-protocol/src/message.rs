//! Inbound message classification
//!
//! Every line from the sensor starts with a sentinel byte. The byte after it
//! identifies the message class, and the rest of the line is the payload:
//!
//! - `Z` - CO2 in ppm, unscaled
//! - `T` - temperature, `(raw - 1000) / 10` °C
//! - `H` - relative humidity, `raw / 10` %RH
//! - `K` - operating mode acknowledgment
//!
//! Anything else is reported as [`Message::Unknown`].

use std::fmt;

use crate::error::ParseError;
use crate::units::Tenths;

/// Offset added to the temperature reading by the sensor, in tenths of a degree
pub const TEMPERATURE_OFFSET: i32 = 1000;

/// Sentinel byte the sensor puts in front of every line
pub const SENTINEL: char = ' ';

/// Which quantity a measurement describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MeasurementKind {
    /// CO2 concentration
    Co2,
    /// Temperature
    Temperature,
    /// Relative humidity
    Humidity,
}

impl MeasurementKind {
    /// Discriminator character on the wire
    pub fn tag(&self) -> char {
        match self {
            Self::Co2 => 'Z',
            Self::Temperature => 'T',
            Self::Humidity => 'H',
        }
    }

    /// Lowercase name, used for logging and serialization
    pub fn name(&self) -> &'static str {
        match self {
            Self::Co2 => "co2",
            Self::Temperature => "temperature",
            Self::Humidity => "humidity",
        }
    }
}

/// A scaled measurement value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "lowercase"))]
pub enum Measurement {
    /// CO2 concentration in ppm
    Co2 {
        /// Parts per million
        ppm: u32,
    },
    /// Temperature in degrees Celsius
    Temperature {
        /// Degrees Celsius with one decimal
        celsius: Tenths,
    },
    /// Relative humidity
    Humidity {
        /// Percent relative humidity with one decimal
        percent: Tenths,
    },
}

impl Measurement {
    /// Kind of quantity measured
    pub fn kind(&self) -> MeasurementKind {
        match self {
            Self::Co2 { .. } => MeasurementKind::Co2,
            Self::Temperature { .. } => MeasurementKind::Temperature,
            Self::Humidity { .. } => MeasurementKind::Humidity,
        }
    }

    /// Unscaled integer as the sensor transmits it
    pub fn raw_value(&self) -> i64 {
        match self {
            Self::Co2 { ppm } => i64::from(*ppm),
            Self::Temperature { celsius } => {
                i64::from(celsius.tenths()) + i64::from(TEMPERATURE_OFFSET)
            }
            Self::Humidity { percent } => i64::from(percent.tenths()),
        }
    }

    /// Format this measurement the way the sensor reports it, e.g. ` Z 00412`
    pub fn to_line(&self) -> String {
        format!("{}{} {:05}", SENTINEL, self.kind().tag(), self.raw_value())
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Co2 { ppm } => write!(f, "{} ppm", ppm),
            Self::Temperature { celsius } => write!(f, "{} °C", celsius),
            Self::Humidity { percent } => write!(f, "{} %RH", percent),
        }
    }
}

/// A classified line received from the sensor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// A measurement report
    Measurement(Measurement),
    /// Operating mode acknowledgment (`K` lines)
    ModeAck,
    /// Line with an unrecognized discriminator
    Unknown(String),
}

impl Message {
    /// Classify a single line (terminator already stripped)
    ///
    /// The first byte is the sentinel and is never inspected.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let tag = match line.as_bytes().get(1) {
            Some(&b) => b,
            None => return Err(ParseError::TooShort(line.to_string())),
        };

        match tag {
            b'Z' => {
                let ppm = parse_payload::<u32>(line, 'Z')?;
                Ok(Self::Measurement(Measurement::Co2 { ppm }))
            }
            b'T' => {
                let raw = parse_payload::<i32>(line, 'T')?;
                let tenths = raw
                    .checked_sub(TEMPERATURE_OFFSET)
                    .ok_or_else(|| invalid_payload(line, 'T'))?;
                Ok(Self::Measurement(Measurement::Temperature {
                    celsius: Tenths::new(tenths),
                }))
            }
            b'H' => {
                let raw = parse_payload::<i32>(line, 'H')?;
                Ok(Self::Measurement(Measurement::Humidity {
                    percent: Tenths::new(raw),
                }))
            }
            b'K' => Ok(Self::ModeAck),
            _ => Ok(Self::Unknown(line.to_string())),
        }
    }
}

fn payload(line: &str) -> Option<&str> {
    line.get(2..).map(str::trim)
}

fn invalid_payload(line: &str, tag: char) -> ParseError {
    ParseError::InvalidPayload {
        tag,
        payload: line.get(2..).unwrap_or_default().to_string(),
    }
}

fn parse_payload<N: std::str::FromStr>(line: &str, tag: char) -> Result<N, ParseError> {
    payload(line)
        .and_then(|p| p.parse::<N>().ok())
        .ok_or_else(|| invalid_payload(line, tag))
}
