//! Wire protocol for TASCAM CD-400U family decks
//!
//! This crate is the pure, I/O-free layer of the driver: it knows how bytes
//! are framed, how every command is spelled and how every response is decoded.
//! It never opens a port or holds state.
//!
//! ```rust
//! use tascam_protocol::{Command, FrameBuffer, Response};
//!
//! let bytes = Command::goto_track(12)?.encode();
//! assert_eq!(bytes, b"\n0231200\r");
//!
//! let mut buffer = FrameBuffer::new();
//! buffer.push(b"\n0D51200\r");
//! let frame = buffer.next_frame().unwrap();
//! assert_eq!(Response::parse(&frame)?, Response::TrackNumber(12));
//! # Ok::<(), tascam_protocol::ProtocolError>(())
//! ```

pub mod command;
pub mod digits;
pub mod error;
pub mod frame;
pub mod response;
pub mod types;

pub use command::Command;
pub use error::{ParseError, ProtocolError, Result, ValidationError};
pub use frame::{Frame, FrameBuffer};
pub use response::{Response, ResponseCode};
pub use types::{
    CautionStatus, DeviceCaution, DeviceFault, ErrorStatus, InputDevice, MechaStatus, MediaType,
    PlayMode, RemoteLocalMode, SearchDirection, SearchSpeed, TimeKind, TrackTime,
};
