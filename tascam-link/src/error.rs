//! Error types for the tascam-link crate.

use std::time::Duration;

/// Errors from the serial link and its supervisor.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// Baud rate outside the set the deck supports
    #[error("Unsupported baud rate {0}; expected one of 4800, 9600, 19200, 38400, 57600")]
    UnsupportedBaudRate(u32),

    /// Invalid configuration provided
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The transport could not be opened
    #[error("Failed to open {target}: {source}")]
    Open {
        target: String,
        #[source]
        source: std::io::Error,
    },

    /// A connection attempt came too soon after the previous one
    #[error("Connection attempt throttled; retry in {retry_in:?}")]
    Throttled { retry_in: Duration },

    /// The operation needs an open session
    #[error("Not connected to a device")]
    NotConnected,

    /// The dispatch queue already holds `capacity` waiting commands
    #[error("Command queue full ({capacity} waiting); try again later")]
    QueueFull { capacity: usize },

    /// The supervisor task is no longer running
    #[error("Link supervisor has stopped")]
    SupervisorStopped,
}

/// Result type for link operations
pub type Result<T> = std::result::Result<T, LinkError>;
