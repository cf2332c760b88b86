//! Error types for the cracking cluster

use crate::message::ActorId;
use thiserror::Error;

/// Result type alias for cluster operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the runtime, the transfer protocol and the solvers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Actor thread is not running
    #[error("actor is not running")]
    ActorNotRunning,

    /// No mailbox is registered for this id
    #[error("actor not found: {0}")]
    ActorNotFound(ActorId),

    /// Actor thread panicked
    #[error("actor panicked: {0}")]
    ActorPanicked(String),

    /// The OS refused to start an actor thread
    #[error("failed to spawn actor thread: {0}")]
    SpawnFailed(String),

    /// Channel send error
    #[error("channel send error: {0}")]
    SendError(String),

    /// Channel receive error
    #[error("channel receive error: {0}")]
    ReceiveError(String),

    /// Timeout
    #[error("operation timed out")]
    Timeout,

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// An input row could not be turned into a task
    #[error("invalid record for line {line}: {reason}")]
    InvalidRecord {
        /// Raw line identifier field, or `?` when it is missing
        line: String,
        /// What was wrong with the row
        reason: String,
    },

    /// A hash was not 64 hex digits
    #[error("invalid digest {0:?}")]
    InvalidDigest(String),

    /// A chunk violated the transfer framing
    #[error("malformed chunk: {0}")]
    MalformedChunk(String),

    /// Payload (de)serialization failed
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A worker reported a line it was not assigned
    #[error("worker {worker} reported line {line_id} it was not assigned")]
    UnexpectedResult {
        /// Reporting worker
        worker: ActorId,
        /// Line it reported
        line_id: u32,
    },

    /// Reading the input failed
    #[error("I/O error: {0}")]
    Io(String),

    /// A message that needs a reply address arrived without one
    #[error("message {0} requires a sender")]
    MissingSender(&'static str),

    /// A search scanned its whole space without a match
    #[error("search exhausted for line {line_id}: {what}")]
    SearchExhausted {
        /// Line of the task being solved
        line_id: u32,
        /// Which search gave up
        what: String,
    },
}

impl Error {
    /// Fatal errors terminate the actor that raised them instead of being logged and skipped.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::SearchExhausted { .. })
    }
}

impl<T> From<flume::SendError<T>> for Error {
    fn from(err: flume::SendError<T>) -> Self {
        Error::SendError(err.to_string())
    }
}

impl From<flume::RecvError> for Error {
    fn from(err: flume::RecvError) -> Self {
        Error::ReceiveError(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
