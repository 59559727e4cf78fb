//! Command dispatch queue
//!
//! Producers (the public handle, the poller, decoder follow-ups) push
//! [`Command`]s into a shared FIFO. A single dispatcher task per session pops
//! them and writes one frame at a time, never closer together than
//! `LinkConfig::command_interval`.
//!
//! A full queue never evicts: caller commands are refused with
//! [`LinkError::QueueFull`] and internal traffic is skipped, to be asked
//! again on the next poll.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Notify;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use tascam_protocol::Command;

use crate::error::{LinkError, Result};

/// Thread-safe FIFO of outgoing commands
///
/// Clones share the same queue.
#[derive(Clone)]
pub struct CommandQueue {
    inner: Arc<QueueInner>,
}

struct QueueInner {
    commands: Mutex<VecDeque<Command>>,
    available: Notify,
    capacity: usize,
}

impl CommandQueue {
    /// Create a queue holding at most `capacity` waiting commands
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                commands: Mutex::new(VecDeque::new()),
                available: Notify::new(),
                capacity: capacity.max(1),
            }),
        }
    }

    /// Append a command, refusing it when the queue is full
    pub fn try_enqueue(&self, command: Command) -> Result<()> {
        {
            let mut commands = self.inner.commands.lock();
            if commands.len() >= self.inner.capacity {
                return Err(LinkError::QueueFull {
                    capacity: self.inner.capacity,
                });
            }
            commands.push_back(command);
        }
        self.inner.available.notify_one();
        Ok(())
    }

    /// Append a command; when the queue is full the new command is dropped
    ///
    /// Returns whether the command was queued.
    pub fn enqueue(&self, command: Command) -> bool {
        let description = command.to_string();
        match self.try_enqueue(command) {
            Ok(()) => true,
            Err(_) => {
                warn!("Command queue full, dropping {}", description);
                false
            }
        }
    }

    /// Append a command unless an identical one is already waiting
    ///
    /// Returns whether the command was queued.
    pub fn enqueue_unique(&self, command: Command) -> bool {
        if self.inner.commands.lock().contains(&command) {
            return false;
        }
        self.enqueue(command)
    }

    /// Take the next command without waiting
    pub fn try_next(&self) -> Option<Command> {
        self.inner.commands.lock().pop_front()
    }

    /// Wait for the next command
    pub async fn next(&self) -> Command {
        loop {
            if let Some(command) = self.try_next() {
                return command;
            }
            self.inner.available.notified().await;
        }
    }

    /// Discard every waiting command, returning how many were dropped
    pub fn flush(&self) -> usize {
        let mut commands = self.inner.commands.lock();
        let dropped = commands.len();
        commands.clear();
        dropped
    }

    pub fn len(&self) -> usize {
        self.inner.commands.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the waiting commands, oldest first
    pub fn pending(&self) -> Vec<Command> {
        self.inner.commands.lock().iter().cloned().collect()
    }
}

impl std::fmt::Debug for CommandQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandQueue")
            .field("len", &self.len())
            .field("capacity", &self.inner.capacity)
            .finish()
    }
}

/// Consumer loop for one session
///
/// Writes are fire-and-forget: a failed write is logged and the command is
/// dropped. Sustained failure shows up as silence in the poller.
pub async fn run_dispatcher<W>(
    queue: CommandQueue,
    mut writer: W,
    command_interval: Duration,
    cancel: CancellationToken,
) where
    W: AsyncWrite + Unpin,
{
    let mut last_write: Option<Instant> = None;

    loop {
        let command = tokio::select! {
            _ = cancel.cancelled() => break,
            command = queue.next() => command,
        };

        if let Some(last) = last_write {
            let ready_at = last + command_interval;
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep_until(ready_at) => {}
            }
        }

        let bytes = command.encode();
        let result = async {
            writer.write_all(&bytes).await?;
            writer.flush().await
        }
        .await;
        last_write = Some(Instant::now());

        match result {
            Ok(()) => debug!("Sent command: {}", command),
            Err(e) => error!("Failed to send command {}: {}", command, e),
        }
    }

    debug!("Dispatcher stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tascam_protocol::Frame;
    use tascam_protocol::FrameBuffer;
    use tokio::io::AsyncReadExt;

    #[test]
    fn test_fifo_order() {
        let queue = CommandQueue::new(8);
        queue.enqueue(Command::play());
        queue.enqueue(Command::stop());

        assert_eq!(queue.try_next(), Some(Command::play()));
        assert_eq!(queue.try_next(), Some(Command::stop()));
        assert_eq!(queue.try_next(), None);
    }

    #[test]
    fn test_enqueue_unique() {
        let queue = CommandQueue::new(8);
        assert!(queue.enqueue_unique(Command::mecha_status_sense()));
        assert!(!queue.enqueue_unique(Command::mecha_status_sense()));
        assert!(queue.enqueue_unique(Command::track_number_sense()));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_full_queue_keeps_waiting_commands() {
        let queue = CommandQueue::new(2);
        assert!(queue.enqueue(Command::play()));
        assert!(queue.enqueue(Command::stop()));
        assert!(!queue.enqueue(Command::eject()));
        assert!(!queue.enqueue_unique(Command::mecha_status_sense()));

        assert_eq!(queue.pending(), vec![Command::play(), Command::stop()]);
    }

    #[test]
    fn test_try_enqueue_refuses_when_full() {
        let queue = CommandQueue::new(2);
        queue.try_enqueue(Command::play()).unwrap();
        queue.try_enqueue(Command::stop()).unwrap();

        assert!(matches!(
            queue.try_enqueue(Command::eject()),
            Err(LinkError::QueueFull { capacity: 2 })
        ));
        assert_eq!(queue.pending(), vec![Command::play(), Command::stop()]);

        assert_eq!(queue.try_next(), Some(Command::play()));
        assert!(queue.try_enqueue(Command::eject()).is_ok());
        assert_eq!(queue.pending(), vec![Command::stop(), Command::eject()]);
    }

    #[test]
    fn test_flush() {
        let queue = CommandQueue::new(8);
        queue.enqueue(Command::play());
        queue.enqueue(Command::stop());

        assert_eq!(queue.flush(), 2);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_next_waits_for_producer() {
        let queue = CommandQueue::new(8);
        let producer = queue.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            producer.enqueue(Command::eject());
        });

        assert_eq!(queue.next().await, Command::eject());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatcher_paces_writes() {
        let queue = CommandQueue::new(8);
        let (host, mut device) = tokio::io::duplex(1024);
        let cancel = CancellationToken::new();

        queue.enqueue(Command::play());
        queue.enqueue(Command::stop());
        queue.enqueue(Command::eject());

        let task = tokio::spawn(run_dispatcher(
            queue.clone(),
            host,
            Duration::from_millis(100),
            cancel.clone(),
        ));

        let start = Instant::now();
        let mut buffer = FrameBuffer::new();
        let mut arrivals = Vec::new();
        let mut chunk = [0u8; 64];
        while arrivals.len() < 3 {
            let n = device.read(&mut chunk).await.unwrap();
            buffer.push(&chunk[..n]);
            while let Some(frame) = buffer.next_frame() {
                arrivals.push((frame, start.elapsed()));
            }
        }

        assert_eq!(arrivals[0].0, Frame::new("12", ""));
        assert_eq!(arrivals[1].0, Frame::new("10", ""));
        assert_eq!(arrivals[2].0, Frame::new("18", ""));
        assert!(arrivals[1].1 - arrivals[0].1 >= Duration::from_millis(100));
        assert!(arrivals[2].1 - arrivals[1].1 >= Duration::from_millis(100));

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_dispatcher_survives_write_failure() {
        let queue = CommandQueue::new(8);
        let (host, device) = tokio::io::duplex(64);
        drop(device);
        let cancel = CancellationToken::new();

        queue.enqueue(Command::play());
        queue.enqueue(Command::stop());

        let task = tokio::spawn(run_dispatcher(
            queue.clone(),
            host,
            Duration::from_millis(1),
            cancel.clone(),
        ));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(queue.is_empty());
        assert!(!task.is_finished());

        cancel.cancel();
        task.await.unwrap();
    }
}
