//! Virtual sensor actor task
//!
//! Owns a [`VirtualCozir`] and serves it over an async stream. The task
//! reads command lines from the stream, writes the sensor's replies back, and
//! accepts reading updates and shutdown over a channel.

use std::io;

use cozir_protocol::{Command, LineCodec, OperatingMode, Tenths, LINE_TERMINATOR};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::VirtualCozir;

/// Commands that can be sent to a virtual sensor task
#[derive(Debug, Clone)]
pub enum VirtualCozirCommand {
    /// Change the CO2 concentration in ppm
    SetCo2(u32),
    /// Change the temperature
    SetTemperature(Tenths),
    /// Change the relative humidity
    SetHumidity(Tenths),
    /// Shutdown the virtual sensor task
    Shutdown,
}

/// Events emitted as the virtual sensor handles traffic
#[derive(Debug, Clone, PartialEq)]
pub enum VirtualCozirEvent {
    /// A command line was received and understood
    CommandReceived(Command),
    /// A line was received that the sensor does not understand
    Rejected(String),
    /// The operating mode changed
    ModeChanged(OperatingMode),
}

/// Run the virtual sensor task
///
/// Runs until the stream closes, the command channel closes, or
/// [`VirtualCozirCommand::Shutdown`] is received.
pub async fn run_virtual_cozir_task<S>(
    mut stream: S,
    mut sensor: VirtualCozir,
    mut cmd_rx: mpsc::Receiver<VirtualCozirCommand>,
    event_tx: broadcast::Sender<VirtualCozirEvent>,
) -> io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut codec = LineCodec::new();
    let mut buf = [0u8; 256];

    info!("Starting virtual COZIR task for {}", sensor.id());

    loop {
        tokio::select! {
            // Reading updates land before any query that follows them
            biased;

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(VirtualCozirCommand::SetCo2(ppm)) => {
                        debug!("Virtual COZIR {} CO2 set to {} ppm", sensor.id(), ppm);
                        sensor.set_co2_ppm(ppm);
                    }
                    Some(VirtualCozirCommand::SetTemperature(celsius)) => {
                        debug!("Virtual COZIR {} temperature set to {}", sensor.id(), celsius);
                        sensor.set_temperature(celsius);
                    }
                    Some(VirtualCozirCommand::SetHumidity(percent)) => {
                        debug!("Virtual COZIR {} humidity set to {}", sensor.id(), percent);
                        sensor.set_humidity(percent);
                    }
                    Some(VirtualCozirCommand::Shutdown) => {
                        info!("Shutdown requested for virtual COZIR {}", sensor.id());
                        break;
                    }
                    None => {
                        debug!("Command channel closed for virtual COZIR {}", sensor.id());
                        break;
                    }
                }
            }

            result = stream.read(&mut buf) => {
                match result {
                    Ok(0) => {
                        debug!("Virtual COZIR stream closed for {}", sensor.id());
                        break;
                    }
                    Ok(n) => {
                        if let Err(e) = codec.push_bytes(&buf[..n]) {
                            warn!("Virtual COZIR {} dropped input: {}", sensor.id(), e);
                        }

                        while let Some(line) = codec.next_line() {
                            debug!("Virtual COZIR {} received {:?}", sensor.id(), line);
                            let previous_mode = sensor.mode();

                            match sensor.handle_line(&line) {
                                Some(command) => {
                                    let _ = event_tx.send(VirtualCozirEvent::CommandReceived(command));
                                }
                                None => {
                                    let _ = event_tx.send(VirtualCozirEvent::Rejected(line));
                                }
                            }
                            if sensor.mode() != previous_mode {
                                info!("Virtual COZIR {} now in {:?} mode", sensor.id(), sensor.mode());
                                let _ = event_tx.send(VirtualCozirEvent::ModeChanged(sensor.mode()));
                            }

                            while let Some(reply) = sensor.take_output() {
                                debug!("Virtual COZIR {} replying {:?}", sensor.id(), reply);
                                stream.write_all(reply.as_bytes()).await?;
                                stream.write_all(LINE_TERMINATOR.as_bytes()).await?;
                            }
                            stream.flush().await?;
                        }
                    }
                    Err(e) => {
                        warn!("Virtual COZIR {} stream error: {}", sensor.id(), e);
                        return Err(e);
                    }
                }
            }
        }
    }

    info!("Virtual COZIR task ended for {}", sensor.id());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncBufReadExt, BufReader};

    async fn read_line<R: AsyncBufReadExt + Unpin>(reader: &mut R) -> String {
        let mut line = String::new();
        tokio::time::timeout(Duration::from_millis(100), reader.read_line(&mut line))
            .await
            .unwrap()
            .unwrap();
        line
    }

    #[tokio::test]
    async fn test_virtual_cozir_answers_polls_after_mode_change() {
        let (connection_stream, sensor_stream) = tokio::io::duplex(1024);
        let (read_half, mut write_half) = tokio::io::split(connection_stream);
        let mut reader = BufReader::new(read_half);

        let sensor = VirtualCozir::new("Test");
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let (event_tx, mut event_rx) = broadcast::channel(32);

        let task_handle = tokio::spawn(run_virtual_cozir_task(sensor_stream, sensor, cmd_rx, event_tx));

        write_half.write_all(b"K 2\r\n").await.unwrap();
        assert_eq!(read_line(&mut reader).await, " K 00002\r\n");
        assert_eq!(
            event_rx.recv().await.unwrap(),
            VirtualCozirEvent::CommandReceived(Command::SetMode(OperatingMode::Polling))
        );
        assert_eq!(
            event_rx.recv().await.unwrap(),
            VirtualCozirEvent::ModeChanged(OperatingMode::Polling)
        );

        write_half.write_all(b"Z\r\n").await.unwrap();
        assert_eq!(read_line(&mut reader).await, " Z 00412\r\n");

        drop(cmd_tx);
        drop(write_half);
        drop(reader);
        let _ = task_handle.await;
    }

    #[tokio::test]
    async fn test_virtual_cozir_reading_updates() {
        let (connection_stream, sensor_stream) = tokio::io::duplex(1024);
        let (read_half, mut write_half) = tokio::io::split(connection_stream);
        let mut reader = BufReader::new(read_half);

        let sensor = VirtualCozir::new("Test");
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let (event_tx, mut event_rx) = broadcast::channel(32);

        let task_handle = tokio::spawn(run_virtual_cozir_task(sensor_stream, sensor, cmd_rx, event_tx));

        cmd_tx.send(VirtualCozirCommand::SetHumidity(Tenths::new(501))).await.unwrap();
        write_half.write_all(b"K 2\r\nH\r\n").await.unwrap();

        assert_eq!(read_line(&mut reader).await, " K 00002\r\n");
        assert_eq!(read_line(&mut reader).await, " H 00501\r\n");

        // CommandReceived(K 2), ModeChanged, CommandReceived(H)
        let mut events = Vec::new();
        for _ in 0..3 {
            events.push(event_rx.recv().await.unwrap());
        }
        assert_eq!(
            events[2],
            VirtualCozirEvent::CommandReceived(Command::HumidityQuery)
        );

        drop(cmd_tx);
        drop(write_half);
        drop(reader);
        let _ = task_handle.await;
    }

    #[tokio::test]
    async fn test_virtual_cozir_rejects_garbage() {
        let (connection_stream, sensor_stream) = tokio::io::duplex(1024);
        let (read_half, mut write_half) = tokio::io::split(connection_stream);
        let mut reader = BufReader::new(read_half);

        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let (event_tx, mut event_rx) = broadcast::channel(32);

        let task_handle = tokio::spawn(run_virtual_cozir_task(
            sensor_stream,
            VirtualCozir::new("Test"),
            cmd_rx,
            event_tx,
        ));

        write_half.write_all(b"hello\r\n").await.unwrap();
        assert_eq!(read_line(&mut reader).await, " ?\r\n");
        assert_eq!(
            event_rx.recv().await.unwrap(),
            VirtualCozirEvent::Rejected("hello".to_string())
        );

        drop(cmd_tx);
        drop(write_half);
        drop(reader);
        let _ = task_handle.await;
    }

    #[tokio::test]
    async fn test_virtual_cozir_shutdown_command() {
        let (_connection_stream, sensor_stream) = tokio::io::duplex(1024);

        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let (event_tx, _event_rx) = broadcast::channel(32);

        let task_handle = tokio::spawn(run_virtual_cozir_task(
            sensor_stream,
            VirtualCozir::new("Test"),
            cmd_rx,
            event_tx,
        ));

        cmd_tx.send(VirtualCozirCommand::Shutdown).await.unwrap();

        let result = tokio::time::timeout(Duration::from_millis(100), task_handle)
            .await
            .unwrap();

        assert!(matches!(result, Ok(Ok(()))));
    }
}
