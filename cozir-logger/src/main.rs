//! COZIR Logger
//!
//! Polls a COZIR sensor and prints each changed reading as a JSON line on
//! stdout. Diagnostics go to stderr through `tracing`.
//!
//! ```text
//! cozir-logger lab.json             # real sensor on the configured port
//! cozir-logger lab.json --simulate  # in-process virtual sensor
//! ```

mod args;
mod simulation;

use anyhow::{Context, Result};
use cozir_driver::{CozirDriver, DriverConfig, DriverEvent, Reading};
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::args::Args;
use crate::simulation::Simulation;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "cozir_logger=info,cozir_driver=info,cozir_protocol=info,cozir_sim=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse(std::env::args().skip(1))?;
    let config = DriverConfig::load(&args.config_path)
        .with_context(|| format!("loading {}", args.config_path.display()))?;
    info!(
        "Feed {} on {} every {} minute(s)",
        config.feed_id, config.port, config.poll_interval_minutes
    );

    if args.simulate {
        let simulation = Simulation::spawn(config)?;
        let result = log_readings(&simulation.driver).await;
        simulation.shutdown().await;
        result
    } else {
        let driver = CozirDriver::serial(config)?;
        let result = log_readings(&driver).await;
        driver.shutdown().await;
        result
    }
}

/// Start the driver and print readings until interrupted
async fn log_readings(driver: &CozirDriver) -> Result<()> {
    let mut events = driver.subscribe();
    driver.start().await.context("starting driver")?;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(DriverEvent::Reading(reading)) => println!("{}", reading_json(&reading)),
                Some(DriverEvent::Error(e)) => warn!("{}", e),
                Some(_) => {}
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping");
                break;
            }
        }
    }

    driver.stop().await.context("stopping driver")?;
    Ok(())
}

fn reading_json(reading: &Reading) -> serde_json::Value {
    json!({
        "feed": reading.feed_id,
        "timestamp_ms": u64::try_from(reading.timestamp_millis()).unwrap_or(u64::MAX),
        "kind": reading.measurement.kind().name(),
        "value": reading.measurement.to_string(),
        "measurement": reading.measurement,
    })
}
