//! COZIR Sensor Driver
//!
//! This crate drives a single COZIR CO2/temperature/humidity sensor over an
//! asynchronous serial link.
//!
//! # Architecture
//!
//! A [`CozirDriver`] handle talks to a spawned actor that owns everything:
//!
//! - **State machine**: `Idle -> Opening -> AwaitingHandshake -> Polling -> Closing -> Idle`
//! - **Scheduler**: runs the handshake (`*`, `K 2`) and the repeating poll
//!   cycle (`Z`, `T`, `H`, wait) with a single cancellable timer
//! - **Last-seen cache**: suppresses readings equal to the previous one
//! - **Event sink**: publishes readings, state changes, traffic and errors
//!   through a unified [`DriverEvent`] stream
//!
//! The serial port is reached through a [`Connector`], so virtual sensors
//! (see the `cozir-sim` crate) use the same code path as real hardware.
//!
//! # Example
//!
//! ```rust,no_run
//! use cozir_driver::{CozirDriver, DriverConfig, DriverEvent};
//!
//! # async fn run() -> Result<(), cozir_driver::DriverError> {
//! let driver = CozirDriver::serial(DriverConfig::new("/dev/ttyUSB0", "lab", 1))?;
//! let mut events = driver.subscribe();
//! driver.start().await?;
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         DriverEvent::Reading(reading) => println!("{}", reading.measurement),
//!         DriverEvent::Error(e) => eprintln!("{}", e),
//!         _ => {}
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod actor;
pub mod cache;
pub mod config;
pub mod driver;
pub mod error;
pub mod events;
pub mod schedule;
pub mod state;
pub mod transport;

pub use cache::LastSeen;
pub use config::DriverConfig;
pub use driver::CozirDriver;
pub use error::{ConfigError, DriverError};
pub use events::{DriverEvent, EventSink, Reading, Subscription};
pub use schedule::{Scheduler, Sequence, Step, TimerToken};
pub use state::DriverState;
pub use transport::{Connector, SerialConnector, StreamConnector};

pub use cozir_protocol::{Measurement, MeasurementKind, Tenths};
