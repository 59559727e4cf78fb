//! Connection supervisor
//!
//! One supervisor task owns the link state machine {Disconnected, Connected}.
//! Public callers talk to it through a [`LinkHandle`]; each request carries a
//! oneshot reply so both async and blocking callers get a `Result` back.
//!
//! While connected, a session consists of a dispatcher task and a poll task
//! sharing the split transport. When the poll task gives up on a silent
//! device it reports the loss, the supervisor tears the session down and,
//! if auto-reconnect is armed, retries every `reconnect_interval`.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use tascam_protocol::Command;
use tascam_state::StatusStore;

use crate::config::LinkConfig;
use crate::dispatch::{run_dispatcher, CommandQueue};
use crate::error::{LinkError, Result};
use crate::poller::{run_poller, SessionEnd};
use crate::transport::{Connector, DynSerial};

/// Requests handled by the supervisor task
pub enum Control {
    Connect {
        connector: Arc<dyn Connector>,
        reply: oneshot::Sender<Result<()>>,
    },
    Disconnect {
        reply: oneshot::Sender<()>,
    },
    Shutdown,
}

impl fmt::Debug for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Control::Connect { connector, .. } => f
                .debug_struct("Connect")
                .field("target", &connector.describe())
                .finish(),
            Control::Disconnect { .. } => f.write_str("Disconnect"),
            Control::Shutdown => f.write_str("Shutdown"),
        }
    }
}

/// Cloneable front door to a running supervisor
#[derive(Debug, Clone)]
pub struct LinkHandle {
    control_tx: mpsc::UnboundedSender<Control>,
}

impl LinkHandle {
    /// Open a session through `connector`
    ///
    /// Succeeds immediately when a session is already running. Fails with
    /// [`LinkError::Throttled`] when called sooner than `reconnect_interval`
    /// after the previous attempt.
    pub async fn connect(&self, connector: Arc<dyn Connector>) -> Result<()> {
        let (reply, reply_rx) = oneshot::channel();
        self.send(Control::Connect { connector, reply })?;
        reply_rx.await.map_err(|_| LinkError::SupervisorStopped)?
    }

    /// Blocking form of [`connect`](Self::connect); must not be called from
    /// inside an async context
    pub fn blocking_connect(&self, connector: Arc<dyn Connector>) -> Result<()> {
        let (reply, reply_rx) = oneshot::channel();
        self.send(Control::Connect { connector, reply })?;
        reply_rx
            .blocking_recv()
            .map_err(|_| LinkError::SupervisorStopped)?
    }

    /// Close the session and disarm auto-reconnect
    pub async fn disconnect(&self) -> Result<()> {
        let (reply, reply_rx) = oneshot::channel();
        self.send(Control::Disconnect { reply })?;
        reply_rx.await.map_err(|_| LinkError::SupervisorStopped)
    }

    /// Blocking form of [`disconnect`](Self::disconnect)
    pub fn blocking_disconnect(&self) -> Result<()> {
        let (reply, reply_rx) = oneshot::channel();
        self.send(Control::Disconnect { reply })?;
        reply_rx
            .blocking_recv()
            .map_err(|_| LinkError::SupervisorStopped)
    }

    /// Ask the supervisor to close any session and exit
    pub fn shutdown(&self) {
        let _ = self.control_tx.send(Control::Shutdown);
    }

    pub fn is_running(&self) -> bool {
        !self.control_tx.is_closed()
    }

    fn send(&self, control: Control) -> Result<()> {
        self.control_tx
            .send(control)
            .map_err(|_| LinkError::SupervisorStopped)
    }
}

/// The supervisor task
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use tascam_link::{BaudRate, CommandQueue, LinkConfig, SerialConnector, Supervisor};
/// use tascam_state::StatusStore;
///
/// # async fn run() -> tascam_link::Result<()> {
/// let config = LinkConfig::default();
/// let queue = CommandQueue::new(config.max_queued_commands);
/// let store = StatusStore::new();
///
/// let (supervisor, handle) = Supervisor::new(config, queue, store);
/// tokio::spawn(supervisor.run());
///
/// handle
///     .connect(Arc::new(SerialConnector::new("/dev/ttyUSB0", BaudRate::B9600)))
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct Supervisor {
    state: LinkState,
    control_rx: mpsc::UnboundedReceiver<Control>,
    lost_rx: mpsc::UnboundedReceiver<u64>,
}

impl Supervisor {
    pub fn new(config: LinkConfig, queue: CommandQueue, store: StatusStore) -> (Self, LinkHandle) {
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (lost_tx, lost_rx) = mpsc::unbounded_channel();

        let supervisor = Self {
            state: LinkState {
                config,
                queue,
                store,
                lost_tx,
                connector: None,
                session: None,
                next_session_id: 0,
                auto_reconnect: false,
                last_attempt: None,
                next_reconnect: None,
            },
            control_rx,
            lost_rx,
        };

        (supervisor, LinkHandle { control_tx })
    }

    /// Run until shutdown or until every [`LinkHandle`] is dropped
    pub async fn run(self) {
        let Supervisor {
            mut state,
            mut control_rx,
            mut lost_rx,
        } = self;

        info!("Link supervisor started");

        loop {
            let reconnect_at = state.reconnect_deadline();

            tokio::select! {
                control = control_rx.recv() => match control {
                    Some(Control::Connect { connector, reply }) => {
                        let result = state.connect(connector).await;
                        let _ = reply.send(result);
                    }
                    Some(Control::Disconnect { reply }) => {
                        state.disconnect().await;
                        let _ = reply.send(());
                    }
                    Some(Control::Shutdown) | None => break,
                },
                Some(session_id) = lost_rx.recv() => {
                    state.session_lost(session_id).await;
                }
                _ = wait_until(reconnect_at) => {
                    state.reconnect().await;
                }
            }
        }

        state.disconnect().await;
        info!("Link supervisor stopped");
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

struct Session {
    id: u64,
    cancel: CancellationToken,
    dispatcher: JoinHandle<()>,
    poller: JoinHandle<()>,
}

struct LinkState {
    config: LinkConfig,
    queue: CommandQueue,
    store: StatusStore,
    lost_tx: mpsc::UnboundedSender<u64>,
    /// Connector of the last successful connect, reused for reconnects
    connector: Option<Arc<dyn Connector>>,
    session: Option<Session>,
    next_session_id: u64,
    auto_reconnect: bool,
    /// Shared by manual and automatic attempts
    last_attempt: Option<Instant>,
    next_reconnect: Option<Instant>,
}

impl LinkState {
    async fn connect(&mut self, connector: Arc<dyn Connector>) -> Result<()> {
        if self.session.is_some() {
            debug!("Connect requested while already connected");
            return Ok(());
        }

        if let Some(retry_in) = self.throttle_remaining(Instant::now()) {
            debug!("Connect throttled, retry in {:?}", retry_in);
            return Err(LinkError::Throttled { retry_in });
        }

        self.last_attempt = Some(Instant::now());
        let transport = connector.connect().await?;

        info!("Connected to {}", connector.describe());
        self.connector = Some(connector);
        self.auto_reconnect = true;
        self.next_reconnect = None;
        self.start_session(transport);
        Ok(())
    }

    async fn disconnect(&mut self) {
        self.auto_reconnect = false;
        self.next_reconnect = None;

        if let Some(session) = self.session.take() {
            self.stop_session(session).await;
            info!("Disconnected");
        }
    }

    async fn session_lost(&mut self, session_id: u64) {
        let is_current = self
            .session
            .as_ref()
            .is_some_and(|session| session.id == session_id);
        if !is_current {
            debug!("Ignoring loss report from stale session {}", session_id);
            return;
        }

        if let Some(session) = self.session.take() {
            self.stop_session(session).await;
        }
        warn!("Lost connection to device");

        if self.auto_reconnect {
            self.next_reconnect = Some(Instant::now() + self.config.reconnect_interval);
        }
    }

    async fn reconnect(&mut self) {
        let Some(connector) = self.connector.clone() else {
            self.next_reconnect = None;
            return;
        };
        if self.session.is_some() || !self.auto_reconnect {
            self.next_reconnect = None;
            return;
        }

        let now = Instant::now();
        self.last_attempt = Some(now);
        debug!("Reconnecting to {}", connector.describe());

        match connector.connect().await {
            Ok(transport) => {
                info!("Reconnected to {}", connector.describe());
                self.next_reconnect = None;
                self.start_session(transport);
            }
            Err(e) => {
                warn!("Reconnect failed: {}", e);
                self.next_reconnect = Some(now + self.config.reconnect_interval);
            }
        }
    }

    /// When the next automatic attempt is due, if one is
    fn reconnect_deadline(&self) -> Option<Instant> {
        if self.session.is_some() || !self.auto_reconnect {
            return None;
        }
        let due = self.next_reconnect?;
        let throttled_until = self
            .last_attempt
            .map(|last| last + self.config.reconnect_interval);
        Some(match throttled_until {
            Some(until) if until > due => until,
            _ => due,
        })
    }

    fn throttle_remaining(&self, now: Instant) -> Option<Duration> {
        let ready_at = self.last_attempt? + self.config.reconnect_interval;
        (ready_at > now).then(|| ready_at - now)
    }

    fn start_session(&mut self, transport: DynSerial) {
        let dropped = self.queue.flush();
        if dropped > 0 {
            debug!("Discarded {} stale commands", dropped);
        }
        self.queue.enqueue(Command::enable_remote_and_local());

        let (reader, writer) = tokio::io::split(transport);
        let id = self.next_session_id;
        self.next_session_id += 1;
        let cancel = CancellationToken::new();

        let dispatcher = tokio::spawn(run_dispatcher(
            self.queue.clone(),
            writer,
            self.config.command_interval,
            cancel.clone(),
        ));

        let poller = {
            let queue = self.queue.clone();
            let store = self.store.clone();
            let config = self.config.clone();
            let cancel = cancel.clone();
            let lost_tx = self.lost_tx.clone();
            tokio::spawn(async move {
                if let SessionEnd::Silent { .. } =
                    run_poller(reader, queue, store, config, cancel).await
                {
                    let _ = lost_tx.send(id);
                }
            })
        };

        self.session = Some(Session {
            id,
            cancel,
            dispatcher,
            poller,
        });
        self.store.set_connected(true);
        self.last_attempt = Some(Instant::now());
        debug!("Session {} started", id);
    }

    async fn stop_session(&mut self, session: Session) {
        session.cancel.cancel();
        join_or_abort("dispatcher", session.dispatcher, self.config.shutdown_timeout).await;
        join_or_abort("poller", session.poller, self.config.shutdown_timeout).await;

        let dropped = self.queue.flush();
        if dropped > 0 {
            debug!("Discarded {} queued commands", dropped);
        }
        self.store.set_connected(false);
        self.store.reset();
        debug!("Session {} stopped", session.id);
    }
}

async fn join_or_abort(name: &str, handle: JoinHandle<()>, timeout: Duration) {
    let abort = handle.abort_handle();
    match tokio::time::timeout(timeout, handle).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Session {} task failed: {}", name, e),
        Err(_) => {
            warn!("Session {} task did not stop in {:?}, aborting", name, timeout);
            abort.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryConnector;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tascam_protocol::{frame, Frame, FrameBuffer, MechaStatus};
    use tascam_state::DeviceStatus;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

    struct Harness {
        handle: LinkHandle,
        store: StatusStore,
        queue: CommandQueue,
        task: JoinHandle<()>,
    }

    fn spawn_supervisor(config: LinkConfig) -> Harness {
        let queue = CommandQueue::new(config.max_queued_commands);
        let store = StatusStore::new();
        let (supervisor, handle) = Supervisor::new(config, queue.clone(), store.clone());
        Harness {
            handle,
            store,
            queue,
            task: tokio::spawn(supervisor.run()),
        }
    }

    /// Fake deck that reports "stopped" every 10 ms and ignores commands
    async fn responsive_device(mut device: DuplexStream) {
        let mut ticker = tokio::time::interval(Duration::from_millis(10));
        let mut buf = [0u8; 256];
        loop {
            tokio::select! {
                read = device.read(&mut buf) => {
                    if matches!(read, Ok(0) | Err(_)) {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    if device.write_all(&frame::encode("D0", "10")).await.is_err() {
                        break;
                    }
                }
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_enables_remote_control_first() {
        let harness = spawn_supervisor(LinkConfig::fast_test());
        let connector = Arc::new(MemoryConnector::new());
        let mut device = connector.attach_device();

        harness.handle.connect(connector.clone()).await.unwrap();
        assert!(harness.store.is_connected());

        let mut buffer = FrameBuffer::new();
        let mut chunk = [0u8; 64];
        let first = loop {
            let n = device.read(&mut chunk).await.unwrap();
            buffer.push(&chunk[..n]);
            if let Some(frame) = buffer.next_frame() {
                break frame;
            }
        };
        assert_eq!(first, Frame::new("4C", "01"));

        harness.handle.shutdown();
        harness.task.await.unwrap();
        assert!(!harness.store.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_when_connected_is_a_no_op() {
        let harness = spawn_supervisor(LinkConfig::fast_test());
        let connector = Arc::new(MemoryConnector::new());
        let _device = connector.attach_device();

        harness.handle.connect(connector.clone()).await.unwrap();
        harness.handle.connect(connector.clone()).await.unwrap();
        assert_eq!(connector.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_manual_connects_are_throttled() {
        let harness = spawn_supervisor(LinkConfig::fast_test());
        let connector = Arc::new(MemoryConnector::new());

        let first = harness.handle.connect(connector.clone()).await;
        assert!(matches!(first, Err(LinkError::Open { .. })));

        let second = harness.handle.connect(connector.clone()).await;
        assert!(matches!(second, Err(LinkError::Throttled { .. })));
        assert_eq!(connector.attempts(), 1);

        tokio::time::sleep(Duration::from_millis(200)).await;
        let _device = connector.attach_device();
        harness.handle.connect(connector.clone()).await.unwrap();
        assert_eq!(connector.attempts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_silence_disconnects_once_and_resets_status() {
        let config = LinkConfig::fast_test();
        let reconnect_interval = config.reconnect_interval;
        let harness = spawn_supervisor(config);
        let connector = Arc::new(MemoryConnector::new());
        let mut device = connector.attach_device();

        let notifications = Arc::new(AtomicUsize::new(0));
        let counter = notifications.clone();
        harness.store.register_fn(move |_status: &DeviceStatus| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        // One answer, then silence
        device.write_all(&frame::encode("D0", "11")).await.unwrap();
        harness.handle.connect(connector.clone()).await.unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(harness.store.snapshot().mecha_status, MechaStatus::Playing);

        tokio::time::sleep(Duration::from_secs(1)).await;

        assert!(!harness.store.is_connected());
        assert_eq!(harness.store.connected_snapshot(), None);
        assert_eq!(harness.store.snapshot(), DeviceStatus::default());
        assert!(harness.queue.is_empty());
        // The status change, then exactly one reset
        assert_eq!(notifications.load(Ordering::SeqCst), 2);

        // Reconnects kept trying, but never faster than the interval
        let attempts = connector.attempts();
        let ceiling = 1 + (1030 / reconnect_interval.as_millis() as usize);
        assert!(attempts >= 2, "no reconnect attempted");
        assert!(attempts <= ceiling, "{} attempts exceeds {}", attempts, ceiling);
        drop(device);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnects_after_silence() {
        let harness = spawn_supervisor(LinkConfig::fast_test());
        let connector = Arc::new(MemoryConnector::new());
        let _silent = connector.attach_device();
        let responsive = connector.attach_device();
        tokio::spawn(responsive_device(responsive));

        harness.handle.connect(connector.clone()).await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(connector.attempts(), 2);
        assert!(harness.store.is_connected());
        assert_eq!(harness.store.snapshot().mecha_status, MechaStatus::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_disarms_reconnect() {
        let harness = spawn_supervisor(LinkConfig::fast_test());
        let connector = Arc::new(MemoryConnector::new());
        let _device = connector.attach_device();

        harness.handle.connect(connector.clone()).await.unwrap();
        harness.handle.disconnect().await.unwrap();
        assert!(!harness.store.is_connected());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(connector.attempts(), 1);
        assert!(!harness.store.is_connected());
    }

    #[tokio::test]
    async fn test_handle_reports_stopped_supervisor() {
        let harness = spawn_supervisor(LinkConfig::fast_test());
        harness.handle.shutdown();
        harness.task.await.unwrap();

        assert!(!harness.handle.is_running());
        let result = harness
            .handle
            .connect(Arc::new(MemoryConnector::new()))
            .await;
        assert!(matches!(result, Err(LinkError::SupervisorStopped)));
    }
}
