//! In-process virtual sensor for `--simulate`

use std::time::Duration;

use cozir_driver::{CozirDriver, DriverConfig, DriverError, StreamConnector};
use cozir_sim::{run_virtual_cozir_task, VirtualCozir, VirtualCozirCommand};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// CO2 drifts between these bounds so the log shows changing readings
const CO2_RANGE_PPM: (u32, u32) = (400, 900);
const CO2_STEP_PPM: u32 = 25;

/// A driver wired to a virtual sensor
pub struct Simulation {
    pub driver: CozirDriver,
    sensor_task: JoinHandle<()>,
    drift_task: JoinHandle<()>,
}

impl Simulation {
    /// Spawn a virtual sensor and a driver connected to it
    pub fn spawn(config: DriverConfig) -> Result<Self, DriverError> {
        let (driver_end, sensor_end) = tokio::io::duplex(1024);
        let (sensor_tx, sensor_rx) = mpsc::channel(8);
        let (event_tx, _) = broadcast::channel(32);

        let sensor = VirtualCozir::new(format!("virtual {}", config.port));
        let sensor_task = tokio::spawn(async move {
            if let Err(e) = run_virtual_cozir_task(sensor_end, sensor, sensor_rx, event_tx).await {
                warn!("Virtual sensor stopped: {}", e);
            }
        });

        let drift_task = tokio::spawn(drift_co2(sensor_tx, config.poll_interval()));
        let connector = StreamConnector::with_stream("virtual sensor", driver_end);
        let driver = CozirDriver::new(config, connector)?;

        Ok(Self {
            driver,
            sensor_task,
            drift_task,
        })
    }

    /// Stop the driver and the virtual sensor
    pub async fn shutdown(self) {
        self.drift_task.abort();
        self.driver.shutdown().await;
        // The sensor ends once the driver closes its end of the stream
        if let Err(e) = self.sensor_task.await {
            warn!("Virtual sensor task failed: {}", e);
        }
    }
}

/// Walk the virtual CO2 level up and down once per poll interval
async fn drift_co2(sensor_tx: mpsc::Sender<VirtualCozirCommand>, period: Duration) {
    let (low, high) = CO2_RANGE_PPM;
    let mut ppm = 412;
    let mut rising = true;
    let mut ticker = tokio::time::interval(period);
    ticker.tick().await;

    loop {
        ticker.tick().await;
        if rising && ppm + CO2_STEP_PPM > high {
            rising = false;
        } else if !rising && ppm < low + CO2_STEP_PPM {
            rising = true;
        }
        ppm = if rising {
            ppm + CO2_STEP_PPM
        } else {
            ppm - CO2_STEP_PPM
        };

        debug!("Virtual CO2 now {} ppm", ppm);
        if sensor_tx.send(VirtualCozirCommand::SetCo2(ppm)).await.is_err() {
            break;
        }
    }
}
