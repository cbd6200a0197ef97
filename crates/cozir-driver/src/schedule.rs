//! Command scheduling
//!
//! The handshake and the poll cycle are each a short list of steps, where a
//! step is "wait this long, then send this command". The [`Scheduler`] runs at
//! most one sequence at a time and identifies it with a [`TimerToken`].
//! Installing a new sequence or cancelling invalidates the old token, so a
//! stale timer can never fire a step.

use std::time::Duration;

use cozir_protocol::{timing, Command, OperatingMode};
use tokio::time::Instant;

/// One scheduled step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    /// Wait before this step fires, measured from the previous step
    pub delay: Duration,
    /// Command to send when the step fires (`None` for a pure wait)
    pub command: Option<Command>,
}

impl Step {
    /// Wait, then send a command
    pub fn send(delay: Duration, command: Command) -> Self {
        Self {
            delay,
            command: Some(command),
        }
    }

    /// Wait without sending anything
    pub fn wait(delay: Duration) -> Self {
        Self {
            delay,
            command: None,
        }
    }
}

/// An ordered list of steps, optionally repeating
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    name: &'static str,
    steps: Vec<Step>,
    repeat: bool,
}

impl Sequence {
    /// Create a sequence
    pub fn new(name: &'static str, steps: Vec<Step>, repeat: bool) -> Self {
        Self {
            name,
            steps,
            repeat,
        }
    }

    /// `*`, then `K 2`; runs once per session
    pub fn handshake() -> Self {
        Self::new(
            "handshake",
            vec![
                Step::send(timing::CONFIG_QUERY_DELAY, Command::ConfigQuery),
                Step::send(
                    timing::SET_MODE_DELAY,
                    Command::SetMode(OperatingMode::Polling),
                ),
            ],
            false,
        )
    }

    /// `Z`, `T`, `H`, then `interval`; repeats until cancelled
    pub fn poll_cycle(interval: Duration) -> Self {
        Self::new(
            "poll",
            vec![
                Step::send(timing::CO2_QUERY_DELAY, Command::Co2Query),
                Step::send(timing::TEMPERATURE_QUERY_DELAY, Command::TemperatureQuery),
                Step::send(timing::HUMIDITY_QUERY_DELAY, Command::HumidityQuery),
                Step::wait(interval),
            ],
            true,
        )
    }

    /// Sequence name, for logging
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Steps in order
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Whether the sequence wraps around after its last step
    pub fn repeats(&self) -> bool {
        self.repeat
    }
}

/// Identifies one installed sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken(u64);

#[derive(Debug)]
struct ActiveSequence {
    token: TimerToken,
    sequence: Sequence,
    index: usize,
    deadline: Instant,
}

/// Single-slot cancellable step scheduler
///
/// The scheduler does not sleep by itself; the owner waits until
/// [`deadline`](Self::deadline) and then calls [`fire`](Self::fire).
#[derive(Debug, Default)]
pub struct Scheduler {
    active: Option<ActiveSequence>,
    next_token: u64,
}

impl Scheduler {
    /// Create an idle scheduler
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a sequence starting at `now`, replacing any active one
    ///
    /// Empty sequences are not installed; the returned token is already stale.
    pub fn install(&mut self, sequence: Sequence, now: Instant) -> TimerToken {
        self.next_token += 1;
        let token = TimerToken(self.next_token);

        let first_delay = sequence.steps.first().map(|step| step.delay);
        self.active = first_delay.map(|delay| ActiveSequence {
            token,
            deadline: now + delay,
            sequence,
            index: 0,
        });
        token
    }

    /// Cancel the active sequence, returning its token
    pub fn cancel(&mut self) -> Option<TimerToken> {
        self.active.take().map(|active| active.token)
    }

    /// Token of the active sequence
    pub fn active_token(&self) -> Option<TimerToken> {
        self.active.as_ref().map(|active| active.token)
    }

    /// Name of the active sequence
    pub fn active_name(&self) -> Option<&'static str> {
        self.active.as_ref().map(|active| active.sequence.name())
    }

    /// When the next step is due
    pub fn deadline(&self) -> Option<Instant> {
        self.active.as_ref().map(|active| active.deadline)
    }

    /// Fire the next step of the sequence identified by `token`
    ///
    /// Returns `None` if `token` is no longer active. Otherwise the step is
    /// consumed and the next deadline is measured from this step's deadline,
    /// so the cycle does not drift.
    pub fn fire(&mut self, token: TimerToken) -> Option<Step> {
        let active = self.active.as_mut()?;
        if active.token != token {
            return None;
        }

        let steps = active.sequence.steps();
        let step = steps[active.index];
        let next = active.index + 1;

        if next < steps.len() {
            active.index = next;
            active.deadline += steps[next].delay;
        } else if active.sequence.repeats() {
            active.index = 0;
            active.deadline += steps[0].delay;
        } else {
            self.active = None;
        }
        Some(step)
    }
}

/// Sleep until `deadline`, or forever if there is none
pub(crate) async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
