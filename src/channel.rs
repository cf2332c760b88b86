//! Mailbox channels
//!
//! Every actor reads from exactly one message channel and one control channel.
//! Both are flume channels wrapped with lightweight counters so a handle can
//! report how much traffic an actor has seen.

use crate::error::{Error, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Cache line size for padding (typically 64 bytes on x86-64)
const CACHE_LINE_SIZE: usize = 64;

/// Channel configuration
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Buffer capacity; `None` means unbounded
    pub capacity: Option<usize>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self { capacity: None }
    }
}

impl ChannelConfig {
    /// Create a new channel configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound the channel to `capacity` messages
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }
}

/// Statistics for channel traffic
#[repr(align(64))]
#[derive(Debug)]
pub struct ChannelStats {
    /// Number of messages sent
    pub messages_sent: AtomicU64,

    /// Number of messages received
    pub messages_received: AtomicU64,

    /// Number of send errors
    pub send_errors: AtomicU64,

    _padding: [u8; CACHE_LINE_SIZE - 24],
}

impl Default for ChannelStats {
    fn default() -> Self {
        Self {
            messages_sent: AtomicU64::new(0),
            messages_received: AtomicU64::new(0),
            send_errors: AtomicU64::new(0),
            _padding: [0; CACHE_LINE_SIZE - 24],
        }
    }
}

impl ChannelStats {
    /// Get the number of messages sent
    pub fn sent(&self) -> u64 {
        self.messages_sent.load(Ordering::Relaxed)
    }

    /// Get the number of messages received
    pub fn received(&self) -> u64 {
        self.messages_received.load(Ordering::Relaxed)
    }

    /// Get the number of send errors
    pub fn send_errors(&self) -> u64 {
        self.send_errors.load(Ordering::Relaxed)
    }
}

/// Sender half of a channel
pub struct Sender<T> {
    inner: flume::Sender<T>,
    stats: Arc<ChannelStats>,
}

impl<T> Clone for Sender<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            stats: Arc::clone(&self.stats),
        }
    }
}

impl<T> Sender<T> {
    /// Send a message, blocking while a bounded channel is full
    pub fn send(&self, msg: T) -> Result<()> {
        match self.inner.send(msg) {
            Ok(()) => {
                self.stats.messages_sent.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(e) => {
                self.stats.send_errors.fetch_add(1, Ordering::Relaxed);
                Err(e.into())
            }
        }
    }

    /// Get channel statistics
    pub fn stats(&self) -> Arc<ChannelStats> {
        Arc::clone(&self.stats)
    }
}

/// Receiver half of a channel
pub struct Receiver<T> {
    inner: flume::Receiver<T>,
    stats: Arc<ChannelStats>,
}

impl<T> Receiver<T> {
    /// Receive a message, blocking until one arrives
    pub fn recv(&self) -> Result<T> {
        let msg = self.inner.recv()?;
        self.stats.messages_received.fetch_add(1, Ordering::Relaxed);
        Ok(msg)
    }

    /// Receive a message, giving up after `timeout`
    pub fn recv_timeout(&self, timeout: Duration) -> Result<T> {
        let msg = self.inner.recv_timeout(timeout).map_err(|e| match e {
            flume::RecvTimeoutError::Timeout => Error::Timeout,
            flume::RecvTimeoutError::Disconnected => {
                Error::ReceiveError("channel disconnected".to_string())
            }
        })?;
        self.stats.messages_received.fetch_add(1, Ordering::Relaxed);
        Ok(msg)
    }

    /// Try to receive a message without blocking; `Ok(None)` when empty
    pub fn try_recv(&self) -> Result<Option<T>> {
        match self.inner.try_recv() {
            Ok(msg) => {
                self.stats.messages_received.fetch_add(1, Ordering::Relaxed);
                Ok(Some(msg))
            }
            Err(flume::TryRecvError::Empty) => Ok(None),
            Err(flume::TryRecvError::Disconnected) => {
                Err(Error::ReceiveError("channel disconnected".to_string()))
            }
        }
    }

    /// Number of messages waiting
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether no messages are waiting
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Get channel statistics
    pub fn stats(&self) -> Arc<ChannelStats> {
        Arc::clone(&self.stats)
    }
}

/// Channel factory
pub struct Channel;

impl Channel {
    /// Create a new channel with the given configuration
    pub fn new<T>(config: ChannelConfig) -> (Sender<T>, Receiver<T>) {
        let stats = Arc::new(ChannelStats::default());
        let (tx, rx) = match config.capacity {
            Some(capacity) => flume::bounded(capacity),
            None => flume::unbounded(),
        };

        (
            Sender {
                inner: tx,
                stats: Arc::clone(&stats),
            },
            Receiver { inner: rx, stats },
        )
    }

    /// Create a bounded MPSC channel
    pub fn mpsc<T>(capacity: usize) -> (Sender<T>, Receiver<T>) {
        Self::new(ChannelConfig::new().with_capacity(capacity))
    }

    /// Create an unbounded MPSC channel
    pub fn mpsc_unbounded<T>() -> (Sender<T>, Receiver<T>) {
        Self::new(ChannelConfig::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mpsc_channel() {
        let (tx, rx) = Channel::mpsc::<i32>(10);

        tx.send(42).unwrap();
        tx.send(43).unwrap();

        assert_eq!(rx.recv().unwrap(), 42);
        assert_eq!(rx.recv().unwrap(), 43);

        assert_eq!(tx.stats().sent(), 2);
        assert_eq!(rx.stats().received(), 2);
    }

    #[test]
    fn try_recv_reports_empty_as_none() {
        let (tx, rx) = Channel::mpsc_unbounded::<i32>();
        assert_eq!(rx.try_recv().unwrap(), None);
        tx.send(7).unwrap();
        assert_eq!(rx.try_recv().unwrap(), Some(7));
    }

    #[test]
    fn recv_timeout_expires() {
        let (_tx, rx) = Channel::mpsc_unbounded::<i32>();
        let err = rx.recv_timeout(Duration::from_millis(5)).unwrap_err();
        assert_eq!(err, Error::Timeout);
    }

    #[test]
    fn send_to_dropped_receiver_counts_error() {
        let (tx, rx) = Channel::mpsc_unbounded::<i32>();
        drop(rx);
        assert!(tx.send(1).is_err());
        assert_eq!(tx.stats().send_errors(), 1);
    }
}
