//! # hashcrack
//!
//! Distributed password cracking on a shared-nothing actor runtime.
//!
//! Every endpoint is an actor with its own thread, state and mailbox; the
//! only thing shared between threads is the [`Router`] directory of
//! mailboxes. A scheduler buffers input rows and hands them to idle workers.
//! Each worker first solves the row's hints, each of which reveals one
//! alphabet character absent from the password, then enumerates the password
//! over the shrunk alphabet. Both searches yield after a bounded time slice
//! so a worker stays responsive while it computes.
//!
//! ## Architecture
//!
//! ```text
//!                 ReadRequest / Batch
//!   ┌──────────┐ <──────────────────> ┌─────────────┐  Collect / Finish  ┌───────────┐
//!   │  Source  │                      │  Scheduler  │ ─────────────────> │ Collector │
//!   └──────────┘                      └─────────────┘                    └───────────┘
//!                                      │    ▲    ▲
//!                  Welcome, Assign     │    │    │  Register, PasswordCracked,
//!                  (chunked)           ▼    │    │  Terminated (death-watch)
//!                                    ┌────────────┐
//!                                    │  Worker N  │ ── ContinueHint / ContinuePassword ──┐
//!                                    └────────────┘ <────────────────────────────────────┘
//! ```
//!
//! Large payloads travel through [`MessageTransfer`], a stop-and-wait chunk
//! protocol with one chunk in flight per transfer.

#![warn(missing_docs, rust_2018_idioms)]

pub mod actor;
pub mod channel;
pub mod cluster;
pub mod collector;
pub mod dispatch;
pub mod error;
pub mod hash;
pub mod hint;
pub mod message;
pub mod password;
pub mod permutation;
pub mod probe;
pub mod protocol;
pub mod router;
pub mod scheduler;
pub mod search;
pub mod source;
pub mod transfer;
pub mod worker;

// Re-exports
pub use actor::{spawn, Actor, ActorConfig, ActorHandle, Context};
pub use channel::{Channel, ChannelConfig, Receiver, Sender};
pub use cluster::{Cluster, ClusterConfig};
pub use collector::{ResultCollector, Solution};
pub use dispatch::{Directive, Dispatcher};
pub use error::{Error, Result};
pub use hash::{sha256_hex, Digest};
pub use hint::{CrackedHint, HintSolver};
pub use message::{ActorId, Envelope, Terminated};
pub use password::PasswordSolver;
pub use protocol::{CrackedPassword, LargeMessage, Message, Record, Task, WelcomePayload};
pub use router::Router;
pub use scheduler::{Scheduler, SchedulerConfig};
pub use search::SearchStep;
pub use source::{parse_records, LineSource, SourceConfig};
pub use transfer::MessageTransfer;
pub use worker::{CrackerConfig, HintStrategy, Worker};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::actor::{spawn, Actor, ActorConfig, ActorHandle, Context};
    pub use crate::cluster::{Cluster, ClusterConfig};
    pub use crate::error::{Error, Result};
    pub use crate::message::{ActorId, Envelope};
    pub use crate::protocol::{Message, Record, Task};
    pub use crate::router::Router;
    pub use crate::worker::{CrackerConfig, HintStrategy};
}
