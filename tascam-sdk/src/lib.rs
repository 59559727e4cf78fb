//! # TASCAM SDK - serial control for the CD-400U
//!
//! A synchronous handle to a TASCAM CD-400U (and protocol-compatible decks)
//! connected over RS-232C:
//!
//! ```rust,no_run
//! use tascam_sdk::{InputDevice, TascamDeck};
//!
//! fn main() -> Result<(), tascam_sdk::SdkError> {
//!     let deck = TascamDeck::open("/dev/ttyUSB0", 9600)?;
//!
//!     deck.switch_device("cd".parse::<InputDevice>()?)?;
//!     deck.play()?;
//!
//!     for status in deck.subscribe().timeout_iter(std::time::Duration::from_secs(5)) {
//!         println!("{:?} {}", status.mecha_status, status.time_elapsed);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Key Features
//!
//! - **Sync-First API**: no async/await; a worker thread runs the serial session
//! - **Validated Commands**: out-of-range tracks and presets, unknown device
//!   names and unsupported baud rates fail before anything is sent
//! - **Live Status**: snapshots on demand, listeners and channel subscriptions
//! - **Self-Healing Link**: a silent deck is dropped after ~3 s and reconnected
//!   every 5 s until [`TascamDeck::disconnect`] is called
//!
//! ## Architecture
//!
//! ```text
//! tascam-sdk (TascamDeck, config, logging)
//!     ↓
//! tascam-link (supervisor, dispatch queue, poller, transports)
//!     ↓
//! tascam-state (DeviceStatus, decoder, listeners)
//!     ↓
//! tascam-protocol (frames, commands, responses)
//! ```

pub mod config;
pub mod deck;
pub mod error;
pub mod logging;
mod worker;

pub use config::DeckConfig;
pub use deck::TascamDeck;
pub use error::{Result, SdkError};

pub use tascam_link::{BaudRate, Connector, LinkConfig, LinkError, SerialConnector};
pub use tascam_protocol::{
    CautionStatus, Command, DeviceCaution, DeviceFault, ErrorStatus, InputDevice, MechaStatus,
    MediaType, PlayMode, RemoteLocalMode, SearchDirection, SearchSpeed, TrackTime,
    ValidationError,
};
pub use tascam_state::{DeviceStatus, ListenerError, ListenerId, StatusIterator, StatusListener};

#[cfg(feature = "test-support")]
pub use tascam_link::MemoryConnector;
