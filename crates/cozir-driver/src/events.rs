//! Unified event stream for the driver
//!
//! Readings, lifecycle changes, raw traffic and errors are all published
//! through a single broadcast channel. Subscribers attached later do not see
//! earlier events.

use std::time::{SystemTime, UNIX_EPOCH};

use cozir_protocol::Measurement;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::warn;

use crate::error::DriverError;
use crate::state::DriverState;

/// A measurement captured from the sensor
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    /// Feed identifier from the driver configuration
    pub feed_id: String,
    /// Wall-clock capture time
    pub timestamp: SystemTime,
    /// Scaled value
    pub measurement: Measurement,
}

impl Reading {
    /// Create a reading stamped with the current time
    pub fn new(feed_id: impl Into<String>, measurement: Measurement) -> Self {
        Self {
            feed_id: feed_id.into(),
            timestamp: SystemTime::now(),
            measurement,
        }
    }

    /// Capture time in milliseconds since the Unix epoch
    pub fn timestamp_millis(&self) -> u128 {
        self.timestamp
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default()
    }
}

/// Unified event enum for all driver activity
#[derive(Debug, Clone, PartialEq)]
pub enum DriverEvent {
    /// A new (changed) reading
    Reading(Reading),

    /// An error occurred
    Error(DriverError),

    /// The driver moved between lifecycle states
    StateChanged {
        /// Previous state
        from: DriverState,
        /// New state
        to: DriverState,
    },

    /// A line was received from the sensor (terminator stripped)
    LineIn {
        /// Line text
        line: String,
    },

    /// A command line was handed to the transport (terminator stripped)
    LineOut {
        /// Line text
        line: String,
    },
}

impl DriverEvent {
    /// Check if this is a reading
    pub fn is_reading(&self) -> bool {
        matches!(self, DriverEvent::Reading(_))
    }

    /// Check if this is an error notification
    pub fn is_error(&self) -> bool {
        matches!(self, DriverEvent::Error(_))
    }

    /// Check if this is a traffic event
    pub fn is_traffic(&self) -> bool {
        matches!(self, DriverEvent::LineIn { .. } | DriverEvent::LineOut { .. })
    }

    /// Get the reading if this event carries one
    pub fn reading(&self) -> Option<&Reading> {
        match self {
            DriverEvent::Reading(reading) => Some(reading),
            _ => None,
        }
    }
}

/// Publishing side of the event channel
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: broadcast::Sender<DriverEvent>,
}

impl EventSink {
    /// Create a sink buffering up to `capacity` events per subscriber
    ///
    /// `capacity` must be non-zero.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an event to every current subscriber
    ///
    /// Events published with no subscribers attached are dropped.
    pub fn emit(&self, event: DriverEvent) {
        let _ = self.tx.send(event);
    }

    /// Attach a new subscriber
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
        }
    }

    /// Number of attached subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Receiving side of the event channel
///
/// Dropping the subscription detaches it.
#[derive(Debug)]
pub struct Subscription {
    rx: broadcast::Receiver<DriverEvent>,
}

impl Subscription {
    /// Wait for the next event
    ///
    /// Returns `None` once the driver is gone. If this subscriber fell behind,
    /// the missed events are skipped.
    pub async fn recv(&mut self) -> Option<DriverEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(missed)) => {
                    warn!("Event subscriber lagged, skipped {} events", missed);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Take the next event if one is already queued
    pub fn try_recv(&mut self) -> Option<DriverEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(missed)) => {
                    warn!("Event subscriber lagged, skipped {} events", missed);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    /// Wait for the next reading, skipping other events
    pub async fn next_reading(&mut self) -> Option<Reading> {
        loop {
            if let DriverEvent::Reading(reading) = self.recv().await? {
                return Some(reading);
            }
        }
    }
}
