//! Poll cycle and connection health
//!
//! Every `poll_interval` the poller drains whatever the device has sent,
//! applies each frame to the status store, queues the next round of queries
//! and updates the silence counter. Reaching `failure_threshold` silent cycles
//! ends the session.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use tascam_protocol::{Command, FrameBuffer, TimeKind};
use tascam_state::StatusStore;

use crate::config::LinkConfig;
use crate::dispatch::CommandQueue;

/// Upper bound on reads per cycle so a chattering device cannot stall polling
const MAX_READS_PER_CYCLE: usize = 16;

const READ_CHUNK: usize = 128;

/// Why a poll loop returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The device stayed silent for `failure_threshold` cycles
    Silent { cycles: u32 },
    /// The session was cancelled from outside
    Cancelled,
}

/// Which queries go out on a given cycle
#[derive(Debug, Clone, Copy)]
pub struct PollSchedule {
    status_every: u64,
    mode_every: u64,
}

impl PollSchedule {
    pub fn new(status_every: u64, mode_every: u64) -> Self {
        Self {
            status_every: status_every.max(1),
            mode_every: mode_every.max(1),
        }
    }

    pub fn from_config(config: &LinkConfig) -> Self {
        Self::new(config.status_poll_every, config.mode_poll_every)
    }

    /// Queries for cycle `cycle`, counted from 0
    pub fn commands_for(&self, cycle: u64) -> Vec<Command> {
        let mut commands = vec![
            Command::mecha_status_sense(),
            Command::track_number_sense(),
            Command::track_time_sense(TimeKind::Elapsed),
        ];

        if cycle % self.status_every == 0 {
            commands.extend([
                Command::media_status_sense(),
                Command::current_track_info_sense(),
                Command::total_track_time_sense(),
                Command::play_mode_sense(),
                Command::device_query(),
            ]);
        }

        if cycle % self.mode_every == 0 {
            commands.extend([
                Command::resume_sense(),
                Command::repeat_sense(),
                Command::incremental_sense(),
                Command::remote_local_sense(),
            ]);
        }

        commands
    }
}

/// Consecutive-silence counter
#[derive(Debug, Clone)]
pub struct HealthMonitor {
    failures: u32,
    threshold: u32,
}

impl HealthMonitor {
    pub fn new(threshold: u32) -> Self {
        Self {
            failures: 0,
            threshold: threshold.max(1),
        }
    }

    /// Record one cycle; returns true once the threshold is reached
    pub fn record(&mut self, got_valid_frame: bool) -> bool {
        if got_valid_frame {
            self.failures = 0;
            return false;
        }
        self.failures += 1;
        self.failures >= self.threshold
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }
}

/// Poll loop for one session
pub async fn run_poller<R>(
    mut reader: R,
    queue: CommandQueue,
    store: StatusStore,
    config: LinkConfig,
    cancel: CancellationToken,
) -> SessionEnd
where
    R: AsyncRead + Unpin,
{
    let schedule = PollSchedule::from_config(&config);
    let mut health = HealthMonitor::new(config.failure_threshold);
    let mut buffer = FrameBuffer::with_limit(config.max_pending_bytes);
    let mut ticker = tokio::time::interval(config.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut cycle: u64 = 0;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return SessionEnd::Cancelled,
            _ = ticker.tick() => {}
        }

        let got_valid_frame = tokio::select! {
            _ = cancel.cancelled() => return SessionEnd::Cancelled,
            valid = drain_frames(&mut reader, &mut buffer, &queue, &store, config.read_timeout) => valid,
        };

        for command in schedule.commands_for(cycle) {
            queue.enqueue_unique(command);
        }

        if health.record(got_valid_frame) {
            warn!(
                "Device not responding ({} consecutive silent cycles)",
                health.failures()
            );
            return SessionEnd::Silent {
                cycles: health.failures(),
            };
        }

        cycle = cycle.wrapping_add(1);
    }
}

/// Read what is available, apply every complete frame
///
/// Returns whether at least one frame decoded successfully. A read error or
/// end of stream counts as silence.
async fn drain_frames<R>(
    reader: &mut R,
    buffer: &mut FrameBuffer,
    queue: &CommandQueue,
    store: &StatusStore,
    read_timeout: Duration,
) -> bool
where
    R: AsyncRead + Unpin,
{
    let mut chunk = [0u8; READ_CHUNK];

    for _ in 0..MAX_READS_PER_CYCLE {
        match tokio::time::timeout(read_timeout, reader.read(&mut chunk)).await {
            Err(_) => break,
            Ok(Ok(0)) => {
                debug!("Transport reached end of stream");
                break;
            }
            Ok(Ok(n)) => buffer.push(&chunk[..n]),
            Ok(Err(e)) => {
                debug!("Transport read error: {}", e);
                break;
            }
        }
    }

    let mut got_valid_frame = false;
    while let Some(frame) = buffer.next_frame() {
        debug!("Received: cmd={} data={}", frame.code, frame.data);
        match store.apply_frame(&frame) {
            Ok(decoded) => {
                got_valid_frame = true;
                if let Some(follow_up) = decoded.follow_up {
                    queue.enqueue(follow_up);
                }
            }
            Err(e) => debug!("Discarding frame: {}", e),
        }
    }
    got_valid_frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use tascam_protocol::{frame, MechaStatus};
    use tokio::io::AsyncWriteExt;

    #[test]
    fn test_schedule_first_cycle_sends_everything() {
        let schedule = PollSchedule::new(10, 30);
        let commands = schedule.commands_for(0);
        assert_eq!(commands.len(), 12);
        assert_eq!(commands[0], Command::mecha_status_sense());
        assert!(commands.contains(&Command::device_query()));
        assert!(commands.contains(&Command::remote_local_sense()));
    }

    #[test]
    fn test_schedule_periods() {
        let schedule = PollSchedule::new(10, 30);
        assert_eq!(schedule.commands_for(1).len(), 3);
        assert_eq!(schedule.commands_for(10).len(), 8);
        assert!(!schedule.commands_for(20).contains(&Command::repeat_sense()));
        assert_eq!(schedule.commands_for(30).len(), 12);
    }

    #[test]
    fn test_health_monitor() {
        let mut health = HealthMonitor::new(3);
        assert!(!health.record(false));
        assert!(!health.record(false));
        assert!(!health.record(true));
        assert_eq!(health.failures(), 0);
        assert!(!health.record(false));
        assert!(!health.record(false));
        assert!(health.record(false));
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_device_ends_session() {
        let (host, _device) = tokio::io::duplex(1024);
        let queue = CommandQueue::new(64);
        let store = StatusStore::new();
        let config = LinkConfig {
            failure_threshold: 10,
            ..Default::default()
        };

        let end = run_poller(host, queue.clone(), store, config, CancellationToken::new()).await;

        assert_eq!(end, SessionEnd::Silent { cycles: 10 });
        // Queries are de-duplicated, so the queue stays bounded
        assert!(queue.len() <= 12);
    }

    #[tokio::test(start_paused = true)]
    async fn test_frames_are_applied_and_follow_ups_queued() {
        let (host, mut device) = tokio::io::duplex(1024);
        let queue = CommandQueue::new(64);
        let store = StatusStore::new();
        let cancel = CancellationToken::new();

        device.write_all(&frame::encode("D0", "11")).await.unwrap();
        device.write_all(&frame::encode("F0", "")).await.unwrap();

        let task = tokio::spawn(run_poller(
            host,
            queue.clone(),
            store.clone(),
            LinkConfig::default(),
            cancel.clone(),
        ));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.snapshot().mecha_status, MechaStatus::Playing);
        assert_eq!(queue.pending()[0], Command::error_sense());

        cancel.cancel();
        assert_eq!(task.await.unwrap(), SessionEnd::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_valid_frame_resets_silence() {
        let (host, mut device) = tokio::io::duplex(1024);
        let queue = CommandQueue::new(64);
        let store = StatusStore::new();
        let cancel = CancellationToken::new();
        let config = LinkConfig {
            failure_threshold: 10,
            ..Default::default()
        };

        let task = tokio::spawn(run_poller(host, queue, store, config, cancel.clone()));

        // Nine silent cycles, one answer, then seven more: never reaches 10
        tokio::time::sleep(Duration::from_millis(300 * 8 + 100)).await;
        device.write_all(&frame::encode("D0", "10")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(300 * 8)).await;
        assert!(!task.is_finished());

        // Silence from here on trips the threshold
        let end = task.await.unwrap();
        assert!(matches!(end, SessionEnd::Silent { cycles: 10 }));
        cancel.cancel();
    }
}
