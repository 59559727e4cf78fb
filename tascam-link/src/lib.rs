//! # TASCAM serial link
//!
//! Async plumbing between a [`StatusStore`](tascam_state::StatusStore) and a
//! deck on the other end of an RS-232C cable.
//!
//! ## Key Features
//!
//! - **Paced Dispatch**: commands leave one at a time, at least
//!   `command_interval` apart
//! - **Polling**: mecha status, track and time every cycle; slower-moving
//!   state every 10th and 30th cycle
//! - **Health Check**: a run of silent cycles drops the session, resets the
//!   status and notifies listeners
//! - **Reconnect**: the last connector is retried every `reconnect_interval`
//!   until the caller disconnects
//!
//! ## Architecture
//!
//! ```text
//! LinkHandle ──Control──▶ Supervisor ──spawns per session──┬─▶ dispatcher ─▶ writer half
//!                              ▲                           └─▶ poller ◀──── reader half
//!                              └───────── session lost ────────┘
//! ```
//!
//! Producers push into the shared [`CommandQueue`]; the poller applies every
//! decoded frame to the store and queues follow-up queries.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod poller;
pub mod supervisor;
pub mod transport;

pub use config::{BaudRate, LinkConfig};
pub use dispatch::{run_dispatcher, CommandQueue};
pub use error::{LinkError, Result};
pub use poller::{run_poller, HealthMonitor, PollSchedule, SessionEnd};
pub use supervisor::{Control, LinkHandle, Supervisor};
pub use transport::{Connector, DynSerial, SerialConnector, SerialPortIO};

#[cfg(any(test, feature = "test-support"))]
pub use transport::MemoryConnector;
