//! Public driver handle

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::warn;

use crate::actor::{run_driver_actor, DriverCommand};
use crate::config::DriverConfig;
use crate::error::DriverError;
use crate::events::{EventSink, Subscription};
use crate::state::DriverState;
use crate::transport::{Connector, SerialConnector};

/// Commands buffered for the actor
const COMMAND_CAPACITY: usize = 16;

/// Handle to a running COZIR driver
///
/// The driver itself runs as a spawned task; this handle sends it commands.
/// Dropping the handle stops the task and closes the transport.
///
/// # Example
///
/// ```rust,no_run
/// use cozir_driver::{CozirDriver, DriverConfig};
///
/// # async fn run() -> Result<(), cozir_driver::DriverError> {
/// let config = DriverConfig::new("/dev/ttyUSB0", "office", 5);
/// let driver = CozirDriver::serial(config)?;
/// let mut events = driver.subscribe();
///
/// driver.start().await?;
/// while let Some(reading) = events.next_reading().await {
///     println!("{}: {}", reading.feed_id, reading.measurement);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct CozirDriver {
    cmd_tx: mpsc::Sender<DriverCommand>,
    sink: EventSink,
    feed_id: String,
    task: JoinHandle<()>,
}

impl CozirDriver {
    /// Validate `config` and spawn a driver using `connector`
    ///
    /// Must be called from within a tokio runtime.
    pub fn new<C: Connector>(config: DriverConfig, connector: C) -> Result<Self, DriverError> {
        config.validate()?;

        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CAPACITY);
        let sink = EventSink::new(config.event_capacity);
        let feed_id = config.feed_id.clone();
        let task = tokio::spawn(run_driver_actor(config, connector, cmd_rx, sink.clone()));

        Ok(Self {
            cmd_tx,
            sink,
            feed_id,
            task,
        })
    }

    /// Spawn a driver on the serial port named in `config`
    pub fn serial(config: DriverConfig) -> Result<Self, DriverError> {
        let connector = SerialConnector::from_config(&config);
        Self::new(config, connector)
    }

    /// Feed identifier attached to readings from this driver
    pub fn feed_id(&self) -> &str {
        &self.feed_id
    }

    /// Open the transport and schedule the handshake
    ///
    /// Resolves once the port is open; does not wait for the sensor to
    /// acknowledge. A no-op unless the driver is idle.
    pub async fn start(&self) -> Result<(), DriverError> {
        let (response, rx) = oneshot::channel();
        self.send(DriverCommand::Start { response }).await?;
        rx.await.map_err(|_| DriverError::ActorUnavailable)?
    }

    /// Cancel polling and close the transport
    ///
    /// Resolves once the port is closed. No command is written after this
    /// returns. A no-op if the driver is idle.
    pub async fn stop(&self) -> Result<(), DriverError> {
        let (response, rx) = oneshot::channel();
        self.send(DriverCommand::Stop { response }).await?;
        rx.await.map_err(|_| DriverError::ActorUnavailable)?
    }

    /// Current lifecycle state
    pub async fn state(&self) -> Result<DriverState, DriverError> {
        let (response, rx) = oneshot::channel();
        self.send(DriverCommand::QueryState { response }).await?;
        rx.await.map_err(|_| DriverError::ActorUnavailable)
    }

    /// Attach a new event subscriber
    pub fn subscribe(&self) -> Subscription {
        self.sink.subscribe()
    }

    /// Close the transport and wait for the driver task to end
    pub async fn shutdown(self) {
        let _ = self.cmd_tx.send(DriverCommand::Shutdown).await;
        if let Err(e) = self.task.await {
            warn!("Driver task for feed {} failed: {}", self.feed_id, e);
        }
    }

    async fn send(&self, cmd: DriverCommand) -> Result<(), DriverError> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| DriverError::ActorUnavailable)
    }
}
