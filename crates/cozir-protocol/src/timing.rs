//! Delays the sensor firmware needs between commands
//!
//! The sensor does not acknowledge queries, so commands are paced by fixed
//! waits. Each constant is the delay *before* the named command is sent,
//! measured from the previous command.

use std::time::Duration;

/// After the port opens, before `*`
pub const CONFIG_QUERY_DELAY: Duration = Duration::from_millis(1000);

/// After `*`, before `K 2`
pub const SET_MODE_DELAY: Duration = Duration::from_millis(5000);

/// At the start of each poll cycle, before `Z`
pub const CO2_QUERY_DELAY: Duration = Duration::from_millis(500);

/// After `Z`, before `T`
pub const TEMPERATURE_QUERY_DELAY: Duration = Duration::from_millis(5000);

/// After `T`, before `H`
pub const HUMIDITY_QUERY_DELAY: Duration = Duration::from_millis(5000);

/// Convert a poll interval in minutes to the wait after `H`
pub fn poll_interval(minutes: u32) -> Duration {
    Duration::from_secs(u64::from(minutes) * 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_interval_minutes() {
        assert_eq!(poll_interval(1), Duration::from_secs(60));
        assert_eq!(poll_interval(15), Duration::from_secs(900));
    }
}
