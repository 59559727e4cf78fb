//! The deck handle

use std::sync::Arc;
use std::thread::JoinHandle;

use tascam_link::{
    BaudRate, CommandQueue, Connector, LinkConfig, LinkError, LinkHandle, SerialConnector,
    Supervisor,
};
use tascam_protocol::{
    Command, InputDevice, PlayMode, RemoteLocalMode, SearchDirection, SearchSpeed,
};
use tascam_state::{DeviceStatus, ListenerError, ListenerId, StatusIterator, StatusListener, StatusStore};

use crate::config::DeckConfig;
use crate::error::Result;
use crate::worker::spawn_link_worker;

/// Sync-first handle to one deck
///
/// Owns a background worker thread that runs the serial session. Every
/// method returns immediately: commands are validated, queued and written
/// by the worker at the deck's pace.
///
/// Commands are only accepted while connected; while the link is down they
/// fail with [`LinkError::NotConnected`] instead of piling up. When
/// `max_queued_commands` are already waiting, new ones fail with
/// [`LinkError::QueueFull`] and nothing queued earlier is lost.
///
/// # Example
///
/// ```rust,no_run
/// use tascam_sdk::{PlayMode, TascamDeck};
///
/// fn main() -> Result<(), tascam_sdk::SdkError> {
///     let deck = TascamDeck::new()?;
///     deck.connect("/dev/ttyUSB0", 9600)?;
///
///     deck.set_play_mode("random".parse::<PlayMode>()?)?;
///     deck.goto_track(3)?;
///     deck.play()?;
///
///     if let Some(status) = deck.status() {
///         println!("{:?} track {} at {}", status.mecha_status, status.track_number, status.time_elapsed);
///     }
///     Ok(())
/// }
/// ```
pub struct TascamDeck {
    queue: CommandQueue,
    store: StatusStore,
    link: LinkHandle,
    worker: Option<JoinHandle<()>>,
}

impl TascamDeck {
    /// Create a disconnected deck with default timing
    pub fn new() -> Result<Self> {
        Self::with_link_config(LinkConfig::default())
    }

    pub fn with_link_config(config: LinkConfig) -> Result<Self> {
        config.validate()?;

        let queue = CommandQueue::new(config.max_queued_commands);
        let store = StatusStore::new();
        let (supervisor, link) = Supervisor::new(config, queue.clone(), store.clone());
        let worker = spawn_link_worker(supervisor)?;

        Ok(Self {
            queue,
            store,
            link,
            worker: Some(worker),
        })
    }

    /// Build from a [`DeckConfig`], connecting right away when it names a
    /// port and `auto_connect` is set
    pub fn from_config(config: DeckConfig) -> Result<Self> {
        let deck = Self::with_link_config(config.link)?;
        if let (Some(port), true) = (&config.port, config.auto_connect) {
            deck.connect_with(Arc::new(SerialConnector::new(port.as_str(), config.baud_rate)))?;
        }
        Ok(deck)
    }

    /// Create a deck and connect to `port`
    pub fn open(port: &str, baud_rate: u32) -> Result<Self> {
        let deck = Self::new()?;
        deck.connect(port, baud_rate)?;
        Ok(deck)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Open a serial port and start a session
    ///
    /// Unsupported speeds are rejected before the port is touched. A second
    /// attempt sooner than the reconnect interval after the previous one
    /// fails with [`LinkError::Throttled`].
    pub fn connect(&self, port: &str, baud_rate: u32) -> Result<()> {
        let baud_rate = BaudRate::try_from(baud_rate)?;
        self.connect_with(Arc::new(SerialConnector::new(port, baud_rate)))
    }

    /// Start a session over any transport
    ///
    /// Blocks until the transport is open. Must not be called from inside an
    /// async runtime.
    pub fn connect_with(&self, connector: Arc<dyn Connector>) -> Result<()> {
        self.link.blocking_connect(connector)?;
        Ok(())
    }

    /// Stop the session and automatic reconnection
    pub fn disconnect(&self) -> Result<()> {
        self.link.blocking_disconnect()?;
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.store.is_connected()
    }

    // ========================================================================
    // Status
    // ========================================================================

    /// Latest status, `None` while disconnected
    pub fn status(&self) -> Option<DeviceStatus> {
        self.store.connected_snapshot()
    }

    /// Register a listener called with a snapshot after every change
    ///
    /// Listeners run on the worker thread and should return quickly.
    pub fn register(&self, listener: Box<dyn StatusListener>) -> ListenerId {
        self.store.register(listener)
    }

    pub fn register_fn<F>(&self, f: F) -> ListenerId
    where
        F: Fn(&DeviceStatus) -> std::result::Result<(), ListenerError> + Send + Sync + 'static,
    {
        self.store.register_fn(f)
    }

    pub fn unregister(&self, id: ListenerId) -> Result<()> {
        self.store.unregister(id)?;
        Ok(())
    }

    /// Channel-based subscription to status changes
    pub fn subscribe(&self) -> StatusIterator {
        self.store.subscribe()
    }

    /// Commands waiting to be written
    pub fn pending_commands(&self) -> usize {
        self.queue.len()
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Queue any command
    pub fn send(&self, command: Command) -> Result<()> {
        if !self.store.is_connected() {
            return Err(LinkError::NotConnected.into());
        }
        tracing::debug!("Queueing command: {}", command);
        self.queue.try_enqueue(command)?;
        Ok(())
    }

    pub fn play(&self) -> Result<()> {
        self.send(Command::play())
    }

    pub fn stop(&self) -> Result<()> {
        self.send(Command::stop())
    }

    pub fn eject(&self) -> Result<()> {
        self.send(Command::eject())
    }

    pub fn pause(&self) -> Result<()> {
        self.send(Command::pause())
    }

    pub fn resume(&self) -> Result<()> {
        self.send(Command::resume())
    }

    pub fn next_track(&self) -> Result<()> {
        self.send(Command::next_track())
    }

    pub fn previous_track(&self) -> Result<()> {
        self.send(Command::previous_track())
    }

    /// Jump to track 1..=999
    pub fn goto_track(&self, track: u16) -> Result<()> {
        self.send(Command::goto_track(track)?)
    }

    pub fn search_start(&self, direction: SearchDirection, speed: SearchSpeed) -> Result<()> {
        self.send(Command::search(direction, speed))
    }

    pub fn search_stop(&self) -> Result<()> {
        self.send(Command::search_stop())
    }

    pub fn set_play_mode(&self, mode: PlayMode) -> Result<()> {
        self.send(Command::play_mode_select(mode))
    }

    pub fn set_repeat(&self, enabled: bool) -> Result<()> {
        self.send(Command::repeat_select(enabled))
    }

    pub fn set_resume_mode(&self, enabled: bool) -> Result<()> {
        self.send(Command::resume_select(enabled))
    }

    pub fn set_incremental_play(&self, enabled: bool) -> Result<()> {
        self.send(Command::incremental_select(enabled))
    }

    pub fn set_remote_local(&self, mode: RemoteLocalMode) -> Result<()> {
        self.send(Command::remote_local_select(mode)?)
    }

    /// Select the input source; `InputDevice::Unknown` is rejected
    pub fn switch_device(&self, device: InputDevice) -> Result<()> {
        self.send(Command::device_select(device)?)
    }

    pub fn frequency_up(&self) -> Result<()> {
        self.send(Command::frequency_up())
    }

    pub fn frequency_down(&self) -> Result<()> {
        self.send(Command::frequency_down())
    }

    pub fn seek_up(&self) -> Result<()> {
        self.send(Command::seek_up())
    }

    pub fn seek_down(&self) -> Result<()> {
        self.send(Command::seek_down())
    }

    /// Recall tuner preset 1..=20
    pub fn tuner_preset(&self, preset: u8) -> Result<()> {
        self.send(Command::tuner_preset(preset)?)
    }

    pub fn clear(&self) -> Result<()> {
        self.send(Command::clear())
    }

    pub fn enter(&self) -> Result<()> {
        self.send(Command::enter())
    }

    pub fn back(&self) -> Result<()> {
        self.send(Command::back())
    }

    /// Ask for the total track count and time outside the poll schedule
    pub fn request_total_info(&self) -> Result<()> {
        self.send(Command::total_track_time_sense())
    }

    /// Ask for the firmware information string; the answer is logged
    pub fn request_information(&self) -> Result<()> {
        self.send(Command::information_request())
    }
}

impl std::fmt::Debug for TascamDeck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TascamDeck")
            .field("connected", &self.is_connected())
            .field("queue", &self.queue)
            .finish()
    }
}

impl Drop for TascamDeck {
    fn drop(&mut self) {
        tracing::debug!("TascamDeck dropping, stopping link worker");
        self.link.shutdown();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::warn!("Link worker panicked");
            }
        }
    }
}
