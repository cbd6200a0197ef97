//! Driver Actor
//!
//! All driver state lives in one async task. The actor owns the lifecycle
//! state, the last-seen cache, the scheduler and the link to the sensor, and
//! is the only place any of them change.
//!
//! # Architecture
//!
//! The actor loop selects over three sources:
//! - caller commands (start, stop, state queries, shutdown)
//! - link events (received lines and transport errors)
//! - the scheduler deadline (handshake and poll steps)
//!
//! Everything it observes is published through the [`EventSink`].

use cozir_protocol::{Command, EncodeCommand, Message};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cache::LastSeen;
use crate::config::DriverConfig;
use crate::error::DriverError;
use crate::events::{DriverEvent, EventSink, Reading};
use crate::schedule::{sleep_until, Scheduler, Sequence, TimerToken};
use crate::state::DriverState;
use crate::transport::{Connector, LinkEvent, LinkEventKind, LinkHandle, SessionId};

/// Commands sent to the driver actor
#[derive(Debug)]
pub(crate) enum DriverCommand {
    /// Open the transport and schedule the handshake
    Start {
        /// Result of the open
        response: oneshot::Sender<Result<(), DriverError>>,
    },

    /// Cancel polling and close the transport
    Stop {
        /// Result of the close
        response: oneshot::Sender<Result<(), DriverError>>,
    },

    /// Query the lifecycle state
    QueryState {
        /// Channel to send back the state
        response: oneshot::Sender<DriverState>,
    },

    /// Close any open transport and end the actor
    Shutdown,
}

/// Internal state for the driver actor
struct DriverActor<C> {
    config: DriverConfig,
    connector: C,
    sink: EventSink,
    state: DriverState,
    cache: LastSeen,
    scheduler: Scheduler,
    link: Option<LinkHandle>,
    link_tx: mpsc::UnboundedSender<LinkEvent>,
    last_session: SessionId,
    /// `K 2` has gone out on the current session
    mode_requested: bool,
}

impl<C: Connector> DriverActor<C> {
    fn new(
        config: DriverConfig,
        connector: C,
        sink: EventSink,
        link_tx: mpsc::UnboundedSender<LinkEvent>,
    ) -> Self {
        Self {
            config,
            connector,
            sink,
            state: DriverState::Idle,
            cache: LastSeen::new(),
            scheduler: Scheduler::new(),
            link: None,
            link_tx,
            last_session: 0,
            mode_requested: false,
        }
    }

    fn transition(&mut self, to: DriverState) {
        let from = self.state;
        if from == to {
            return;
        }
        self.state = to;
        info!("COZIR {}: {} -> {}", self.config.port, from.name(), to.name());
        self.sink.emit(DriverEvent::StateChanged { from, to });
    }

    fn report_error(&self, error: DriverError) {
        self.sink.emit(DriverEvent::Error(error));
    }

    async fn start(&mut self) -> Result<(), DriverError> {
        if self.state != DriverState::Idle {
            debug!("Start ignored in state {}", self.state.name());
            return Ok(());
        }

        self.transition(DriverState::Opening);
        info!("Opening {}", self.connector.describe());

        let io = match self.connector.open().await {
            Ok(io) => io,
            Err(e) => {
                let error = DriverError::OpenFailure(e.to_string());
                warn!("COZIR failed to open {}: {}", self.config.port, e);
                self.report_error(error.clone());
                self.transition(DriverState::Idle);
                return Err(error);
            }
        };

        self.last_session += 1;
        self.link = Some(LinkHandle::spawn(
            io,
            self.last_session,
            self.link_tx.clone(),
        ));
        self.cache.clear();
        self.mode_requested = false;
        self.transition(DriverState::AwaitingHandshake);
        self.scheduler.install(Sequence::handshake(), Instant::now());
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), DriverError> {
        if !self.state.is_connected() {
            debug!("Stop ignored in state {}", self.state.name());
            return Ok(());
        }

        self.transition(DriverState::Closing);
        if let Some(token) = self.scheduler.cancel() {
            debug!("Cancelled timer {:?}", token);
        }

        let result = match self.link.take() {
            Some(link) => link.close().await,
            None => Ok(()),
        };
        self.transition(DriverState::Idle);

        result.map_err(|e| {
            let error = DriverError::CloseFailure(e.to_string());
            warn!("COZIR failed closing {}: {}", self.config.port, e);
            self.report_error(error.clone());
            error
        })
    }

    /// Close the link on the way out, without reporting to a caller
    async fn shutdown(&mut self) {
        if let Err(e) = self.stop().await {
            debug!("Close during shutdown failed: {}", e);
        }
    }

    fn current_session(&self) -> Option<SessionId> {
        self.link.as_ref().map(LinkHandle::session)
    }

    fn handle_link_event(&mut self, event: LinkEvent) {
        if self.current_session() != Some(event.session) {
            debug!("Dropping event from stale session {}", event.session);
            return;
        }

        match event.kind {
            LinkEventKind::Line(line) => {
                self.sink.emit(DriverEvent::LineIn { line: line.clone() });
                self.handle_line(&line);
            }
            LinkEventKind::Error(message) => {
                warn!("COZIR port error on {}: {}", self.config.port, message);
                self.report_error(DriverError::RuntimeTransport(message));
            }
        }
    }

    fn handle_line(&mut self, line: &str) {
        match Message::parse(line) {
            Ok(Message::Measurement(measurement)) => {
                if self.cache.observe(&measurement) {
                    debug!("New {} reading: {}", measurement.kind().name(), measurement);
                    self.sink.emit(DriverEvent::Reading(Reading::new(
                        self.config.feed_id.clone(),
                        measurement,
                    )));
                } else {
                    debug!("Unchanged {} reading", measurement.kind().name());
                }
            }
            Ok(Message::ModeAck) => self.start_polling(),
            Ok(Message::Unknown(data)) => debug!("Ignoring data: {:?}", data),
            Err(e) => warn!("Dropping malformed line {:?}: {}", line, e),
        }
    }

    fn start_polling(&mut self) {
        if self.state != DriverState::AwaitingHandshake {
            debug!("Mode acknowledgment ignored in state {}", self.state.name());
            return;
        }
        // The sensor may report its current mode before K 2 is sent
        if !self.mode_requested {
            debug!("Mode acknowledgment before mode request ignored");
            return;
        }

        self.transition(DriverState::Polling);
        let interval = self.config.poll_interval();
        self.scheduler
            .install(Sequence::poll_cycle(interval), Instant::now());
        info!(
            "Polling {} every {} minute(s)",
            self.config.port, self.config.poll_interval_minutes
        );
    }

    fn handle_timer(&mut self, token: TimerToken) {
        let Some(step) = self.scheduler.fire(token) else {
            return;
        };
        if let Some(command) = step.command {
            self.send(command);
        }
    }

    fn send(&mut self, command: Command) {
        let Some(link) = self.link.as_ref() else {
            warn!("No link to send {} on", command);
            return;
        };

        debug!("OUT -> COZIR({}) {:?}", self.config.port, command.as_line());
        match link.write(command.encode()) {
            Ok(()) => {
                if matches!(command, Command::SetMode(_)) {
                    self.mode_requested = true;
                }
                self.sink.emit(DriverEvent::LineOut {
                    line: command.as_line(),
                });
            }
            Err(message) => {
                warn!("Failed to send {} to {}: {}", command, self.config.port, message);
                self.report_error(DriverError::RuntimeTransport(message));
            }
        }
    }
}

/// Run the driver actor
///
/// Processes commands until [`DriverCommand::Shutdown`] arrives or every
/// command sender is dropped, then closes any open transport.
pub(crate) async fn run_driver_actor<C: Connector>(
    config: DriverConfig,
    connector: C,
    mut cmd_rx: mpsc::Receiver<DriverCommand>,
    sink: EventSink,
) {
    let (link_tx, mut link_rx) = mpsc::unbounded_channel();
    let mut actor = DriverActor::new(config, connector, sink, link_tx);
    info!("COZIR driver actor started for {}", actor.config.port);

    loop {
        let deadline = actor.scheduler.deadline();
        let token = actor.scheduler.active_token();

        tokio::select! {
            cmd = cmd_rx.recv() => {
                let Some(cmd) = cmd else { break; };
                match cmd {
                    DriverCommand::Start { response } => {
                        let _ = response.send(actor.start().await);
                    }
                    DriverCommand::Stop { response } => {
                        let _ = response.send(actor.stop().await);
                    }
                    DriverCommand::QueryState { response } => {
                        let _ = response.send(actor.state);
                    }
                    DriverCommand::Shutdown => break,
                }
            }

            Some(event) = link_rx.recv() => {
                actor.handle_link_event(event);
            }

            _ = sleep_until(deadline) => {
                if let Some(token) = token {
                    actor.handle_timer(token);
                }
            }
        }
    }

    actor.shutdown().await;
    info!("COZIR driver actor stopped for {}", actor.config.port);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use tokio::io::{duplex, AsyncReadExt};

    use crate::transport::StreamConnector;

    struct FailingConnector;

    impl Connector for FailingConnector {
        type Io = tokio::io::DuplexStream;

        async fn open(&mut self) -> io::Result<Self::Io> {
            Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "permission denied",
            ))
        }

        fn describe(&self) -> String {
            "failing".to_string()
        }
    }

    async fn request_state(cmd_tx: &mpsc::Sender<DriverCommand>) -> DriverState {
        let (response, rx) = oneshot::channel();
        cmd_tx
            .send(DriverCommand::QueryState { response })
            .await
            .unwrap();
        rx.await.unwrap()
    }

    async fn request_start(cmd_tx: &mpsc::Sender<DriverCommand>) -> Result<(), DriverError> {
        let (response, rx) = oneshot::channel();
        cmd_tx.send(DriverCommand::Start { response }).await.unwrap();
        rx.await.unwrap()
    }

    async fn request_stop(cmd_tx: &mpsc::Sender<DriverCommand>) -> Result<(), DriverError> {
        let (response, rx) = oneshot::channel();
        cmd_tx.send(DriverCommand::Stop { response }).await.unwrap();
        rx.await.unwrap()
    }

    #[tokio::test]
    async fn test_open_failure_leaves_driver_idle() {
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let sink = EventSink::new(16);
        let mut events = sink.subscribe();
        let config = DriverConfig::new("X", "feed", 1);
        let actor_handle = tokio::spawn(run_driver_actor(config, FailingConnector, cmd_rx, sink));

        let result = request_start(&cmd_tx).await;
        assert_eq!(
            result,
            Err(DriverError::OpenFailure("permission denied".to_string()))
        );
        assert_eq!(request_state(&cmd_tx).await, DriverState::Idle);

        // Idle -> Opening, error, Opening -> Idle
        assert_eq!(
            events.recv().await,
            Some(DriverEvent::StateChanged {
                from: DriverState::Idle,
                to: DriverState::Opening
            })
        );
        assert_eq!(
            events.recv().await,
            Some(DriverEvent::Error(DriverError::OpenFailure(
                "permission denied".to_string()
            )))
        );
        assert_eq!(
            events.recv().await,
            Some(DriverEvent::StateChanged {
                from: DriverState::Opening,
                to: DriverState::Idle
            })
        );

        cmd_tx.send(DriverCommand::Shutdown).await.unwrap();
        actor_handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_start_and_stop_are_idempotent() {
        let (driver_end, mut device_end) = duplex(256);
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let config = DriverConfig::new("X", "feed", 1);
        let connector = StreamConnector::with_stream("virtual", driver_end);
        let actor_handle = tokio::spawn(run_driver_actor(
            config,
            connector,
            cmd_rx,
            EventSink::new(16),
        ));

        assert_eq!(request_stop(&cmd_tx).await, Ok(()));

        assert_eq!(request_start(&cmd_tx).await, Ok(()));
        assert_eq!(request_state(&cmd_tx).await, DriverState::AwaitingHandshake);
        // A second open would fail; start must not reach the connector again
        assert_eq!(request_start(&cmd_tx).await, Ok(()));

        assert_eq!(request_stop(&cmd_tx).await, Ok(()));
        assert_eq!(request_state(&cmd_tx).await, DriverState::Idle);
        assert_eq!(request_stop(&cmd_tx).await, Ok(()));

        let mut written = Vec::new();
        device_end.read_to_end(&mut written).await.unwrap();
        assert!(written.is_empty());

        cmd_tx.send(DriverCommand::Shutdown).await.unwrap();
        actor_handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_dropping_senders_closes_link() {
        let (driver_end, mut device_end) = duplex(256);
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let config = DriverConfig::new("X", "feed", 1);
        let connector = StreamConnector::with_stream("virtual", driver_end);
        let actor_handle = tokio::spawn(run_driver_actor(
            config,
            connector,
            cmd_rx,
            EventSink::new(16),
        ));

        assert_eq!(request_start(&cmd_tx).await, Ok(()));
        drop(cmd_tx);
        actor_handle.await.unwrap();

        let mut written = Vec::new();
        device_end.read_to_end(&mut written).await.unwrap();
        assert!(written.is_empty());
    }
}
