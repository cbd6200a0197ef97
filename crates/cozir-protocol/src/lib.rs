//! COZIR Protocol Library
//!
//! This crate provides parsing and encoding for the ASCII line protocol
//! spoken by COZIR CO2/temperature/humidity sensors.
//!
//! # Format
//!
//! - Every line is terminated by CR-LF (`\r\n`)
//! - Commands sent to the sensor are short ASCII strings: `*`, `K 2`, `Z`, `T`, `H`
//! - Lines received from the sensor start with a sentinel byte, followed by a
//!   one-letter discriminator and an ASCII-decimal payload, e.g. ` Z 00412`
//!
//! # Architecture
//!
//! - [`Command`] encodes outbound requests to their wire form
//! - [`Message`] classifies a single inbound line into a typed message
//! - [`LineCodec`] is a streaming de-framer that turns raw bytes into lines
//! - [`timing`] holds the delays the device firmware requires between commands
//!
//! # Example
//!
//! ```rust
//! use cozir_protocol::{LineCodec, Measurement, Message, Tenths};
//!
//! let mut codec = LineCodec::new();
//! codec.push_bytes(b" T 01234\r\n").unwrap();
//!
//! let line = codec.next_line().unwrap();
//! let message = Message::parse(&line).unwrap();
//! assert_eq!(
//!     message,
//!     Message::Measurement(Measurement::Temperature { celsius: Tenths::new(234) })
//! );
//! ```

pub mod codec;
pub mod command;
pub mod error;
pub mod message;
pub mod timing;
pub mod units;

pub use codec::LineCodec;
pub use command::{Command, OperatingMode};
pub use error::ParseError;
pub use message::{Measurement, MeasurementKind, Message};
pub use units::Tenths;

/// Line terminator used in both directions
pub const LINE_TERMINATOR: &str = "\r\n";

/// Baud rate the sensor ships with
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Trait for commands that can be encoded to bytes
pub trait EncodeCommand {
    /// Encode this command to its wire format, including the terminator
    fn encode(&self) -> Vec<u8>;
}
