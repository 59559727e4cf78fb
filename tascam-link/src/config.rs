//! Configuration types for the tascam-link crate
//!
//! `LinkConfig` controls command pacing, the poll cadence and the health
//! thresholds of a serial session. `BaudRate` restricts the line speed to the
//! values the deck accepts.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::LinkError;

/// Serial line speed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum BaudRate {
    B4800,
    #[default]
    B9600,
    B19200,
    B38400,
    B57600,
}

impl BaudRate {
    pub const ALL: [BaudRate; 5] = [
        BaudRate::B4800,
        BaudRate::B9600,
        BaudRate::B19200,
        BaudRate::B38400,
        BaudRate::B57600,
    ];

    pub fn as_u32(&self) -> u32 {
        match self {
            BaudRate::B4800 => 4800,
            BaudRate::B9600 => 9600,
            BaudRate::B19200 => 19200,
            BaudRate::B38400 => 38400,
            BaudRate::B57600 => 57600,
        }
    }
}

impl TryFrom<u32> for BaudRate {
    type Error = LinkError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|rate| rate.as_u32() == value)
            .ok_or(LinkError::UnsupportedBaudRate(value))
    }
}

impl From<BaudRate> for u32 {
    fn from(rate: BaudRate) -> Self {
        rate.as_u32()
    }
}

impl fmt::Display for BaudRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u32())
    }
}

/// Timing and health settings for a serial session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Minimum gap between two command writes
    /// Default: 100 ms
    pub command_interval: Duration,

    /// Poll cycle cadence
    /// Default: 300 ms
    pub poll_interval: Duration,

    /// How long a single read waits for bytes before the cycle moves on
    /// Default: 20 ms
    pub read_timeout: Duration,

    /// Consecutive silent cycles before the session is dropped
    /// Default: 10
    pub failure_threshold: u32,

    /// Minimum gap between connection attempts, manual or automatic
    /// Default: 5 seconds
    pub reconnect_interval: Duration,

    /// Cycles between media, track info, totals, play mode and device queries
    /// Default: 10
    pub status_poll_every: u64,

    /// Cycles between resume, repeat, incremental and remote/local queries
    /// Default: 30
    pub mode_poll_every: u64,

    /// Bytes held without a frame terminator before the buffer is discarded
    /// Default: 256
    pub max_pending_bytes: usize,

    /// Commands waiting in the dispatch queue before new ones are refused
    /// Default: 64
    pub max_queued_commands: usize,

    /// How long to wait for session tasks to stop before aborting them
    /// Default: 1 second
    pub shutdown_timeout: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            command_interval: Duration::from_millis(100),
            poll_interval: Duration::from_millis(300),
            read_timeout: Duration::from_millis(20),
            failure_threshold: 10,
            reconnect_interval: Duration::from_secs(5),
            status_poll_every: 10,
            mode_poll_every: 30,
            max_pending_bytes: 256,
            max_queued_commands: 64,
            shutdown_timeout: Duration::from_secs(1),
        }
    }
}

impl LinkConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Short intervals for tests against in-memory devices
    pub fn fast_test() -> Self {
        Self {
            command_interval: Duration::from_millis(5),
            poll_interval: Duration::from_millis(20),
            read_timeout: Duration::from_millis(2),
            failure_threshold: 3,
            reconnect_interval: Duration::from_millis(200),
            shutdown_timeout: Duration::from_millis(200),
            ..Default::default()
        }
    }

    /// Validate the configuration and return any issues
    pub fn validate(&self) -> Result<(), LinkError> {
        if self.poll_interval.is_zero() {
            return Err(LinkError::Configuration(
                "Poll interval must be greater than 0".to_string(),
            ));
        }

        if self.read_timeout >= self.poll_interval {
            return Err(LinkError::Configuration(
                "Read timeout must be shorter than the poll interval".to_string(),
            ));
        }

        if self.failure_threshold == 0 {
            return Err(LinkError::Configuration(
                "Failure threshold must be greater than 0".to_string(),
            ));
        }

        if self.status_poll_every == 0 || self.mode_poll_every == 0 {
            return Err(LinkError::Configuration(
                "Poll periods must be greater than 0".to_string(),
            ));
        }

        if self.max_pending_bytes == 0 {
            return Err(LinkError::Configuration(
                "Pending byte limit must be greater than 0".to_string(),
            ));
        }

        if self.max_queued_commands == 0 {
            return Err(LinkError::Configuration(
                "Command queue limit must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn with_command_interval(mut self, interval: Duration) -> Self {
        self.command_interval = interval;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    pub fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_default_config() {
        let config = LinkConfig::default();
        assert_eq!(config.command_interval, Duration::from_millis(100));
        assert_eq!(config.poll_interval, Duration::from_millis(300));
        assert_eq!(config.failure_threshold, 10);
        assert_eq!(config.reconnect_interval, Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let zero_threshold = LinkConfig {
            failure_threshold: 0,
            ..Default::default()
        };
        assert!(zero_threshold.validate().is_err());

        let slow_reads = LinkConfig {
            read_timeout: Duration::from_millis(500),
            ..Default::default()
        };
        assert!(slow_reads.validate().is_err());

        assert!(LinkConfig::fast_test().validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = LinkConfig::new()
            .with_command_interval(Duration::from_millis(50))
            .with_failure_threshold(4)
            .with_reconnect_interval(Duration::from_secs(1));

        assert_eq!(config.command_interval, Duration::from_millis(50));
        assert_eq!(config.failure_threshold, 4);
        assert!(config.validate().is_ok());
    }

    #[rstest]
    #[case(4800)]
    #[case(9600)]
    #[case(19200)]
    #[case(38400)]
    #[case(57600)]
    fn test_supported_baud_rates(#[case] value: u32) {
        let rate = BaudRate::try_from(value).unwrap();
        assert_eq!(u32::from(rate), value);
    }

    #[rstest]
    #[case(0)]
    #[case(1200)]
    #[case(115200)]
    fn test_unsupported_baud_rates(#[case] value: u32) {
        assert!(matches!(
            BaudRate::try_from(value),
            Err(LinkError::UnsupportedBaudRate(v)) if v == value
        ));
    }
}
