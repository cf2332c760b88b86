//! Envelopes and lifecycle signals shared by every actor

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Opaque address of an actor. Allocated once per spawn and never reused.
pub type ActorId = u64;

/// A generic envelope for typed messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// The actual message payload
    pub payload: T,

    /// Source actor; replies go here
    pub source: Option<ActorId>,

    /// Target actor
    pub target: Option<ActorId>,

    /// Timestamp (in microseconds since epoch)
    pub timestamp: u64,
}

impl<T> Envelope<T> {
    /// Create a new envelope with the given payload
    pub fn new(payload: T) -> Self {
        Self {
            payload,
            source: None,
            target: None,
            timestamp: current_timestamp_micros(),
        }
    }

    /// Set the source actor
    pub fn with_source(mut self, source: ActorId) -> Self {
        self.source = Some(source);
        self
    }

    /// Set the target actor
    pub fn with_target(mut self, target: ActorId) -> Self {
        self.target = Some(target);
        self
    }
}

/// Out-of-band control messages, processed ahead of the mailbox
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    /// Stop after the current message and run the shutdown hook
    Stop,

    /// Exit immediately without running the shutdown hook (simulated process loss)
    Kill,
}

/// Delivered to every watcher when an actor's thread exits, for any reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Terminated(pub ActorId);

/// Get current timestamp in microseconds
fn current_timestamp_micros() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or_default()
}
