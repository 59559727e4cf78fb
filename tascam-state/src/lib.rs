//! Device status for tascam-sdk
//!
//! Holds the single [`DeviceStatus`] record, applies decoded responses to it
//! and tells interested parties when it changes:
//!
//! - [`StatusDecoder`] maps each [`Response`](tascam_protocol::Response) onto
//!   status fields and reports follow-up queries
//! - [`StatusStore`] is the shared, lock-protected home of the record
//! - [`StatusListener`] and [`StatusIterator`] deliver change notifications

pub mod decoder;
pub mod error;
pub mod iter;
pub mod registry;
pub mod status;
pub mod store;

pub use decoder::{Decoded, StatusDecoder};
pub use error::{ListenerError, Result, StateError};
pub use iter::StatusIterator;
pub use registry::{Delivery, FnListener, ListenerId, ListenerRegistry, StatusListener};
pub use status::DeviceStatus;
pub use store::StatusStore;
