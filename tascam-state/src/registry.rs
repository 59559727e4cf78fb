//! Notification registry
//!
//! Two ways to hear about status changes:
//! - [`StatusListener`]s registered by id, called synchronously with a copy
//! - channel subscribers, fed through a bounded buffer (see [`StatusIterator`](crate::StatusIterator))
//!
//! A listener that errors or panics is logged and skipped; the rest still run.
//!
//! Delivery works from a [`Delivery`] taken out of the registry, so callers
//! can release their lock before any listener runs.

use std::collections::BTreeMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, TrySendError};
use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::error::ListenerError;
use crate::status::DeviceStatus;

/// Receives a full status copy after every change
pub trait StatusListener: Send + Sync {
    fn notify(&self, status: &DeviceStatus) -> Result<(), ListenerError>;
}

/// Adapter so plain closures can be registered
pub struct FnListener<F>(pub F);

impl<F> StatusListener for FnListener<F>
where
    F: Fn(&DeviceStatus) -> Result<(), ListenerError> + Send + Sync,
{
    fn notify(&self, status: &DeviceStatus) -> Result<(), ListenerError> {
        (self.0)(status)
    }
}

/// Handle returned by [`ListenerRegistry::register`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registered listeners and channel subscribers
#[derive(Default)]
pub struct ListenerRegistry {
    next_id: u64,
    next_subscriber: u64,
    // Ordered by id so delivery follows registration order
    listeners: BTreeMap<ListenerId, Arc<dyn StatusListener>>,
    subscribers: BTreeMap<u64, mpsc::SyncSender<DeviceStatus>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, listener: Box<dyn StatusListener>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.insert(id, Arc::from(listener));
        debug!("Registered status listener {}", id);
        id
    }

    /// Returns whether the id was registered
    pub fn unregister(&mut self, id: ListenerId) -> bool {
        let removed = self.listeners.remove(&id).is_some();
        if removed {
            debug!("Unregistered status listener {}", id);
        }
        removed
    }

    /// Add a channel subscriber holding at most `capacity` undelivered snapshots
    pub fn subscribe(&mut self, capacity: usize) -> mpsc::Receiver<DeviceStatus> {
        let (tx, rx) = mpsc::sync_channel(capacity.max(1));
        self.subscribers.insert(self.next_subscriber, tx);
        self.next_subscriber += 1;
        rx
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Everyone registered right now
    pub fn delivery(&self) -> Delivery {
        Delivery {
            listeners: self
                .listeners
                .iter()
                .map(|(id, listener)| (*id, Arc::clone(listener)))
                .collect(),
            subscribers: self
                .subscribers
                .iter()
                .map(|(key, tx)| (*key, tx.clone()))
                .collect(),
        }
    }

    /// Drop subscribers reported gone by [`Delivery::deliver`]
    pub fn prune(&mut self, gone: &[u64]) {
        for key in gone {
            if self.subscribers.remove(key).is_some() {
                debug!("Pruning disconnected status subscriber");
            }
        }
    }

    /// Deliver `status` to every listener and subscriber
    ///
    /// Runs listeners while `self` is borrowed; shared owners should use
    /// [`delivery`](Self::delivery) and [`prune`](Self::prune) instead.
    pub fn notify_all(&mut self, status: &DeviceStatus) {
        let gone = self.delivery().deliver(status);
        self.prune(&gone);
    }
}

/// Listeners and subscribers captured for one notification
pub struct Delivery {
    listeners: Vec<(ListenerId, Arc<dyn StatusListener>)>,
    subscribers: Vec<(u64, mpsc::SyncSender<DeviceStatus>)>,
}

impl Delivery {
    /// Deliver `status`, returning the keys of subscribers whose receiver is gone
    pub fn deliver(&self, status: &DeviceStatus) -> Vec<u64> {
        for (id, listener) in &self.listeners {
            match panic::catch_unwind(AssertUnwindSafe(|| listener.notify(status))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Status listener {} failed: {}", id, e),
                Err(_) => error!("Status listener {} panicked", id),
            }
        }

        self.subscribers
            .iter()
            .filter_map(|(key, tx)| match tx.try_send(status.clone()) {
                Ok(()) => None,
                Err(TrySendError::Full(_)) => {
                    debug!("Subscriber buffer full, dropping status snapshot");
                    None
                }
                Err(TrySendError::Disconnected(_)) => Some(*key),
            })
            .collect()
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listener_count", &self.listeners.len())
            .field("subscriber_count", &self.subscribers.len())
            .finish()
    }
}
