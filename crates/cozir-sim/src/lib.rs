//! COZIR Sensor Simulation Library
//!
//! This crate provides a virtual COZIR sensor for exercising drivers without
//! physical hardware. It includes:
//!
//! - **VirtualCozir**: answers protocol commands from its current readings
//! - **run_virtual_cozir_task**: serves a `VirtualCozir` over any async stream
//!
//! # Example
//!
//! ```rust
//! use cozir_sim::VirtualCozir;
//!
//! let mut sensor = VirtualCozir::new("sim-1");
//! sensor.handle_line("K 2");
//! sensor.handle_line("Z");
//!
//! assert_eq!(sensor.take_output().as_deref(), Some(" K 00002"));
//! assert_eq!(sensor.take_output().as_deref(), Some(" Z 00412"));
//! ```

pub mod sensor;
pub mod sensor_task;

pub use sensor::{VirtualCozir, VirtualCozirConfig};
pub use sensor_task::{run_virtual_cozir_task, VirtualCozirCommand, VirtualCozirEvent};
