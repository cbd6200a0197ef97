//! Transport collaborators
//!
//! A [`Connector`] opens a byte stream to the sensor. Once open, the stream is
//! owned by a link task that speaks the transport contract the driver
//! needs:
//!
//! - write CR-LF terminated lines, fire-and-forget
//! - deliver every received line with the terminator stripped
//! - report read/write errors asynchronously
//! - close on request and report whether that succeeded
//!
//! Link events are tagged with a session id so the driver can discard events
//! from a session it already closed.

use std::collections::VecDeque;
use std::future::Future;
use std::io::{self, ErrorKind};

use cozir_protocol::LineCodec;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{debug, info, warn};

use crate::config::DriverConfig;

/// Commands buffered per link before writes are rejected
const LINK_COMMAND_CAPACITY: usize = 32;

/// Opens the byte stream to a sensor
///
/// Generic over the I/O type so real serial ports and in-memory streams
/// (for virtual sensors and tests) share the driver code path.
pub trait Connector: Send + 'static {
    /// Stream type produced by [`open`](Self::open)
    type Io: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Open a new stream
    fn open(&mut self) -> impl Future<Output = io::Result<Self::Io>> + Send;

    /// Human-readable description of the target, for logging
    fn describe(&self) -> String;
}

/// Opens a real serial port through `tokio-serial`
#[derive(Debug, Clone)]
pub struct SerialConnector {
    port: String,
    baud_rate: u32,
}

impl SerialConnector {
    /// Create a connector for `port` at `baud_rate`
    pub fn new(port: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port: port.into(),
            baud_rate,
        }
    }

    /// Create a connector from the port and baud rate in a driver config
    pub fn from_config(config: &DriverConfig) -> Self {
        Self::new(config.port.clone(), config.baud_rate)
    }
}

impl Connector for SerialConnector {
    type Io = SerialStream;

    async fn open(&mut self) -> io::Result<SerialStream> {
        let stream = tokio_serial::new(&self.port, self.baud_rate).open_native_async()?;
        Ok(stream)
    }

    fn describe(&self) -> String {
        format!("{} @ {} baud", self.port, self.baud_rate)
    }
}

/// Hands out pre-opened streams in order
///
/// Useful for virtual sensors: pair one end of `tokio::io::duplex()` with a
/// simulator and give the other end to this connector. Once the queue is
/// empty, `open` fails with [`ErrorKind::NotFound`].
#[derive(Debug)]
pub struct StreamConnector<T> {
    name: String,
    streams: VecDeque<T>,
}

impl<T> StreamConnector<T> {
    /// Create a connector with no streams queued
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            streams: VecDeque::new(),
        }
    }

    /// Create a connector with a single stream queued
    pub fn with_stream(name: impl Into<String>, stream: T) -> Self {
        let mut connector = Self::new(name);
        connector.push(stream);
        connector
    }

    /// Queue a stream for a later `open`
    pub fn push(&mut self, stream: T) {
        self.streams.push_back(stream);
    }
}

impl<T> Connector for StreamConnector<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    type Io = T;

    async fn open(&mut self) -> io::Result<T> {
        self.streams.pop_front().ok_or_else(|| {
            io::Error::new(
                ErrorKind::NotFound,
                format!("no stream available for {}", self.name),
            )
        })
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}

/// Identifies one open/close lifetime of a link
pub(crate) type SessionId = u64;

/// Commands sent to a link task
#[derive(Debug)]
pub(crate) enum LinkCommand {
    /// Write raw bytes
    Write(Vec<u8>),
    /// Shut the stream down and end the task
    Close {
        /// Result of the shutdown
        response: oneshot::Sender<io::Result<()>>,
    },
}

/// Something the link observed
#[derive(Debug)]
pub(crate) enum LinkEventKind {
    /// A complete line arrived
    Line(String),
    /// A read or write failed, or the peer hung up
    Error(String),
}

/// Event from a link task, tagged with its session
#[derive(Debug)]
pub(crate) struct LinkEvent {
    pub session: SessionId,
    pub kind: LinkEventKind,
}

/// Driver-side handle to a running link task
#[derive(Debug)]
pub(crate) struct LinkHandle {
    session: SessionId,
    cmd_tx: mpsc::Sender<LinkCommand>,
    task: JoinHandle<()>,
}

impl LinkHandle {
    /// Spawn a link task owning `io`
    pub fn spawn<T>(
        io: T,
        session: SessionId,
        event_tx: mpsc::UnboundedSender<LinkEvent>,
    ) -> Self
    where
        T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (cmd_tx, cmd_rx) = mpsc::channel(LINK_COMMAND_CAPACITY);
        let task = tokio::spawn(run_link_task(io, session, cmd_rx, event_tx));
        Self {
            session,
            cmd_tx,
            task,
        }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Queue bytes for writing without waiting
    pub fn write(&self, data: Vec<u8>) -> Result<(), String> {
        self.cmd_tx
            .try_send(LinkCommand::Write(data))
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => "write queue full".to_string(),
                mpsc::error::TrySendError::Closed(_) => "link closed".to_string(),
            })
    }

    /// Close the stream after all queued writes, and wait for the task to end
    pub async fn close(self) -> io::Result<()> {
        let (response_tx, response_rx) = oneshot::channel();
        let result = if self
            .cmd_tx
            .send(LinkCommand::Close {
                response: response_tx,
            })
            .await
            .is_err()
        {
            // Task already gone, nothing left to close
            Ok(())
        } else {
            response_rx.await.unwrap_or(Ok(()))
        };

        if let Err(e) = self.task.await {
            warn!("Link task for session {} failed: {}", self.session, e);
        }
        result
    }
}

/// Link task main loop - runs until closed or the driver drops the handle
async fn run_link_task<T>(
    mut io: T,
    session: SessionId,
    mut cmd_rx: mpsc::Receiver<LinkCommand>,
    event_tx: mpsc::UnboundedSender<LinkEvent>,
) where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    info!("Starting link task for session {}", session);

    let report = |kind: LinkEventKind| {
        let _ = event_tx.send(LinkEvent { session, kind });
    };

    let mut codec = LineCodec::new();
    let mut buffer = vec![0u8; 256];
    let mut reading = true;

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(LinkCommand::Write(data)) => {
                        let result = match io.write_all(&data).await {
                            Ok(()) => io.flush().await,
                            Err(e) => Err(e),
                        };
                        if let Err(e) = result {
                            warn!("Write error on session {}: {}", session, e);
                            report(LinkEventKind::Error(format!("write failed: {}", e)));
                        }
                    }
                    Some(LinkCommand::Close { response }) => {
                        let result = io.shutdown().await;
                        let _ = response.send(result);
                        break;
                    }
                    None => {
                        debug!("Link handle dropped for session {}", session);
                        let _ = io.shutdown().await;
                        break;
                    }
                }
            }

            result = io.read(&mut buffer), if reading => {
                match result {
                    Ok(0) => {
                        debug!("Peer closed stream on session {}", session);
                        reading = false;
                        report(LinkEventKind::Error("connection closed by peer".to_string()));
                    }
                    Ok(n) => {
                        if let Err(e) = codec.push_bytes(&buffer[..n]) {
                            warn!("Discarding unterminated data on session {}: {}", session, e);
                        }
                        while let Some(line) = codec.next_line() {
                            report(LinkEventKind::Line(line));
                        }
                    }
                    Err(e) if e.kind() == ErrorKind::WouldBlock => {}
                    Err(e) => {
                        warn!("Read error on session {}: {}", session, e);
                        reading = false;
                        report(LinkEventKind::Error(format!("read failed: {}", e)));
                    }
                }
            }
        }
    }

    info!("Link task ended for session {}", session);
}
