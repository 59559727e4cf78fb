//! Shared status store
//!
//! `StatusStore` owns the single [`DeviceStatus`] record and the listener
//! registry. Clones share the same state, so the reader task and the public
//! handle each hold one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex, RwLock};
use tracing::debug;

use tascam_protocol::{Frame, Response};

use crate::decoder::{Decoded, StatusDecoder};
use crate::error::{ListenerError, Result, StateError};
use crate::iter::StatusIterator;
use crate::registry::{FnListener, ListenerId, ListenerRegistry, StatusListener};
use crate::status::DeviceStatus;

/// Default number of undelivered snapshots buffered per subscriber
pub const DEFAULT_SUBSCRIBER_CAPACITY: usize = 32;

/// Thread-safe home of the device status
///
/// # Example
///
/// ```rust
/// use tascam_protocol::Frame;
/// use tascam_state::StatusStore;
///
/// let store = StatusStore::new();
/// let updates = store.subscribe();
///
/// store.apply_frame(&Frame::new("D5", "1200")).unwrap();
///
/// assert_eq!(store.snapshot().track_number, 12);
/// assert_eq!(updates.try_recv().unwrap().track_number, 12);
/// ```
#[derive(Clone)]
pub struct StatusStore {
    status: Arc<RwLock<DeviceStatus>>,
    registry: Arc<Mutex<ListenerRegistry>>,
    // Held while listeners run so every listener sees snapshots in one order
    delivering: Arc<ReentrantMutex<()>>,
    connected: Arc<AtomicBool>,
    subscriber_capacity: usize,
}

impl StatusStore {
    pub fn new() -> Self {
        Self::with_subscriber_capacity(DEFAULT_SUBSCRIBER_CAPACITY)
    }

    pub fn with_subscriber_capacity(subscriber_capacity: usize) -> Self {
        Self {
            status: Arc::new(RwLock::new(DeviceStatus::default())),
            registry: Arc::new(Mutex::new(ListenerRegistry::new())),
            delivering: Arc::new(ReentrantMutex::new(())),
            connected: Arc::new(AtomicBool::new(false)),
            subscriber_capacity,
        }
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Apply a parsed response, notifying listeners if anything changed
    pub fn apply(&self, response: &Response) -> Decoded {
        let (decoded, snapshot) = {
            let mut status = self.status.write();
            let decoded = StatusDecoder::apply(&mut status, response);
            let snapshot = decoded.changed.then(|| status.clone());
            (decoded, snapshot)
        };

        if let Some(snapshot) = snapshot {
            self.notify(&snapshot);
        }
        decoded
    }

    /// Parse and apply a raw frame
    pub fn apply_frame(&self, frame: &Frame) -> Result<Decoded> {
        let response = Response::parse(frame)?;
        Ok(self.apply(&response))
    }

    /// Restore defaults and notify unconditionally
    pub fn reset(&self) {
        let snapshot = {
            let mut status = self.status.write();
            *status = DeviceStatus::default();
            status.clone()
        };
        debug!("Device status reset");
        self.notify(&snapshot);
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    // ========================================================================
    // Reading
    // ========================================================================

    /// Copy of the current record
    pub fn snapshot(&self) -> DeviceStatus {
        self.status.read().clone()
    }

    /// Copy of the current record, `None` while disconnected
    pub fn connected_snapshot(&self) -> Option<DeviceStatus> {
        self.is_connected().then(|| self.snapshot())
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    // ========================================================================
    // Notification
    // ========================================================================

    /// Register a listener called after every change
    ///
    /// Listeners run on the reader task. They may register, unregister or
    /// subscribe from inside `notify`; the change applies from the next
    /// notification on.
    pub fn register(&self, listener: Box<dyn StatusListener>) -> ListenerId {
        self.registry.lock().register(listener)
    }

    /// Register a closure as a listener
    pub fn register_fn<F>(&self, f: F) -> ListenerId
    where
        F: Fn(&DeviceStatus) -> std::result::Result<(), ListenerError> + Send + Sync + 'static,
    {
        self.register(Box::new(FnListener(f)))
    }

    pub fn unregister(&self, id: ListenerId) -> Result<()> {
        if self.registry.lock().unregister(id) {
            Ok(())
        } else {
            Err(StateError::UnknownListener(id.as_u64()))
        }
    }

    /// Open a channel subscription
    pub fn subscribe(&self) -> StatusIterator {
        let rx = self.registry.lock().subscribe(self.subscriber_capacity);
        StatusIterator::new(rx)
    }

    pub fn listener_count(&self) -> usize {
        self.registry.lock().listener_count()
    }

    fn notify(&self, snapshot: &DeviceStatus) {
        let _delivering = self.delivering.lock();
        let delivery = self.registry.lock().delivery();
        let gone = delivery.deliver(snapshot);
        if !gone.is_empty() {
            self.registry.lock().prune(&gone);
        }
    }
}

impl Default for StatusStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StatusStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusStore")
            .field("connected", &self.is_connected())
            .field("registry", &*self.registry.lock())
            .finish()
    }
}
