//! Blocking iterator over status snapshots
//!
//! Provides various iteration patterns for consuming status changes:
//! - Blocking: `recv()`, `for status in iter`
//! - Non-blocking: `try_recv()`, `try_iter()`
//! - Timeout: `recv_timeout()`, `timeout_iter()`
//!
//! Each subscription has its own bounded buffer. When a consumer falls behind,
//! newer snapshots are dropped for that consumer only; the current state is
//! always available from the store snapshot.

use std::sync::mpsc;
use std::time::Duration;

use crate::status::DeviceStatus;

/// Blocking iterator over status snapshots
///
/// All methods are synchronous - no async/await required.
///
/// # Example
///
/// ```rust,ignore
/// let updates = deck.subscribe();
///
/// // Blocking iteration
/// for status in updates {
///     println!("{:?} track {}", status.mecha_status, status.track_number);
/// }
/// ```
pub struct StatusIterator {
    rx: mpsc::Receiver<DeviceStatus>,
}

impl StatusIterator {
    pub(crate) fn new(rx: mpsc::Receiver<DeviceStatus>) -> Self {
        Self { rx }
    }

    /// Block until the next snapshot is available
    ///
    /// Returns `None` once the store has been dropped.
    pub fn recv(&self) -> Option<DeviceStatus> {
        self.rx.recv().ok()
    }

    /// Block until the next snapshot or timeout expires
    pub fn recv_timeout(&self, timeout: Duration) -> Option<DeviceStatus> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Try to receive a snapshot without blocking
    pub fn try_recv(&self) -> Option<DeviceStatus> {
        self.rx.try_recv().ok()
    }

    /// Iterator over the snapshots currently buffered
    pub fn try_iter(&self) -> TryIter<'_> {
        TryIter { inner: self }
    }

    /// Iterator that waits up to `timeout` for each snapshot
    pub fn timeout_iter(&self, timeout: Duration) -> TimeoutIter<'_> {
        TimeoutIter {
            inner: self,
            timeout,
        }
    }

    /// Drain the buffer and return only the newest snapshot
    pub fn latest(&self) -> Option<DeviceStatus> {
        self.try_iter().last()
    }
}

impl Iterator for StatusIterator {
    type Item = DeviceStatus;

    fn next(&mut self) -> Option<Self::Item> {
        self.recv()
    }
}

/// Non-blocking iterator over currently buffered snapshots
pub struct TryIter<'a> {
    inner: &'a StatusIterator,
}

impl<'a> Iterator for TryIter<'a> {
    type Item = DeviceStatus;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.try_recv()
    }
}

/// Blocking iterator with timeout
pub struct TimeoutIter<'a> {
    inner: &'a StatusIterator,
    timeout: Duration,
}

impl<'a> Iterator for TimeoutIter<'a> {
    type Item = DeviceStatus;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.recv_timeout(self.timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;

    fn status_with_track(track: u16) -> DeviceStatus {
        DeviceStatus {
            track_number: track,
            ..DeviceStatus::default()
        }
    }

    #[test]
    fn test_try_recv_empty() {
        let (tx, rx) = mpsc::sync_channel::<DeviceStatus>(4);
        let iter = StatusIterator::new(rx);

        assert!(iter.try_recv().is_none());

        drop(tx);
    }

    #[test]
    fn test_recv_timeout() {
        let (tx, rx) = mpsc::sync_channel::<DeviceStatus>(4);
        let iter = StatusIterator::new(rx);

        let start = Instant::now();
        assert!(iter.recv_timeout(Duration::from_millis(50)).is_none());
        assert!(start.elapsed() >= Duration::from_millis(45));

        drop(tx);
    }

    #[test]
    fn test_try_iter_and_latest() {
        let (tx, rx) = mpsc::sync_channel(4);
        let iter = StatusIterator::new(rx);

        for track in 1..=3 {
            tx.send(status_with_track(track)).unwrap();
        }
        assert_eq!(iter.try_iter().count(), 3);

        tx.send(status_with_track(8)).unwrap();
        tx.send(status_with_track(9)).unwrap();
        assert_eq!(iter.latest().unwrap().track_number, 9);
        assert!(iter.try_recv().is_none());
    }

    #[test]
    fn test_blocking_recv() {
        let (tx, rx) = mpsc::sync_channel(1);
        let iter = StatusIterator::new(rx);

        thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            tx.send(status_with_track(5)).unwrap();
        });

        assert_eq!(iter.recv().unwrap().track_number, 5);
    }

    #[test]
    fn test_channel_closed() {
        let (tx, rx) = mpsc::sync_channel::<DeviceStatus>(1);
        let mut iter = StatusIterator::new(rx);
        drop(tx);

        assert!(iter.recv().is_none());
        assert!(iter.next().is_none());
    }
}
