//! Messages exchanged between the scheduler, workers, the input source and
//! the collector.
//!
//! Everything travels as a [`Message`] inside an [`Envelope`](crate::message::Envelope).
//! Payloads that may exceed the transport's safe message size are wrapped in
//! [`LargeMessage`] and sent through [`MessageTransfer`](crate::transfer::MessageTransfer).

use crate::error::{Error, Result};
use crate::hash::Digest;
use crate::message::{ActorId, Terminated};
use crate::transfer::{Chunk, ChunkAck};
use ahash::AHashSet;
use serde::{Deserialize, Serialize};

/// One raw input row: `[lineID, name, alphabet, length, passwordHash, hint...]`
pub type Record = Vec<String>;

const FIELD_ID: usize = 0;
const FIELD_NAME: usize = 1;
const FIELD_ALPHABET: usize = 2;
const FIELD_LENGTH: usize = 3;
const FIELD_HASH: usize = 4;
const FIRST_HINT: usize = 5;

/// A unit of work: crack one password
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Input line this task came from
    pub line_id: u32,
    /// Free-text name carried along from the input row
    pub name: String,
    /// Unique characters the password may use
    pub alphabet: String,
    /// Exact password length
    pub password_length: usize,
    /// SHA-256 of the password
    pub password_hash: Digest,
    /// SHA-256 of permutations of the alphabet, each with one character removed
    pub hints: Vec<Digest>,
}

impl Task {
    /// Parse and validate an input row
    pub fn from_record(record: &[String]) -> Result<Self> {
        let line = record
            .get(FIELD_ID)
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|| "?".to_string());
        let invalid = |reason: String| Error::InvalidRecord {
            line: line.clone(),
            reason,
        };

        if record.len() < FIRST_HINT {
            return Err(invalid(format!(
                "expected at least {} fields, got {}",
                FIRST_HINT,
                record.len()
            )));
        }

        let line_id = record[FIELD_ID]
            .trim()
            .parse::<u32>()
            .map_err(|e| invalid(format!("line id: {}", e)))?;
        let password_length = record[FIELD_LENGTH]
            .trim()
            .parse::<usize>()
            .map_err(|e| invalid(format!("password length: {}", e)))?;

        let alphabet = record[FIELD_ALPHABET].trim().to_string();
        let mut seen = AHashSet::new();
        if let Some(dup) = alphabet.chars().find(|c| !seen.insert(*c)) {
            return Err(invalid(format!("duplicate alphabet character {:?}", dup)));
        }

        let password_hash = record[FIELD_HASH]
            .parse::<Digest>()
            .map_err(|e: Error| invalid(e.to_string()))?;
        let hints = record[FIRST_HINT..]
            .iter()
            .filter(|h| !h.trim().is_empty())
            .map(|h| h.parse::<Digest>())
            .collect::<Result<Vec<Digest>>>()
            .map_err(|e| invalid(e.to_string()))?;

        if !hints.is_empty() && alphabet.is_empty() {
            return Err(invalid("hints given for an empty alphabet".to_string()));
        }

        Ok(Self {
            line_id,
            name: record[FIELD_NAME].clone(),
            alphabet,
            password_length,
            password_hash,
            hints,
        })
    }

    /// Rebuild the input row this task was parsed from
    pub fn to_record(&self) -> Record {
        let mut record = vec![
            self.line_id.to_string(),
            self.name.clone(),
            self.alphabet.clone(),
            self.password_length.to_string(),
            self.password_hash.to_hex(),
        ];
        record.extend(self.hints.iter().map(Digest::to_hex));
        record
    }
}

/// A worker's answer for one task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrackedPassword {
    /// Input line the password belongs to
    pub line_id: u32,
    /// The recovered password
    pub password: String,
    /// Worker that cracked it
    pub reporter: ActorId,
}

/// Opaque blob handed to every newly registered worker
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WelcomePayload(pub Vec<u8>);

impl WelcomePayload {
    /// A payload of `len` zero bytes
    pub fn zeroed(len: usize) -> Self {
        Self(vec![0; len])
    }

    /// Size in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the payload is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for WelcomePayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WelcomePayload({} bytes)", self.0.len())
    }
}

/// Payloads that only travel through the chunked transfer protocol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LargeMessage {
    /// Scheduler → new worker
    Welcome(WelcomePayload),
    /// Scheduler → idle worker
    Assign(Task),
    /// Worker → scheduler
    PasswordCracked(CrackedPassword),
}

/// Every message any endpoint in the cluster understands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    /// Begin processing (scheduler)
    Start,
    /// A watched actor exited
    Terminated(ActorId),

    /// Ask the input source for the next batch
    ReadRequest,
    /// Rows from the input source; empty means exhausted
    Batch(Vec<Record>),

    /// A worker announces itself to the scheduler
    Register,
    /// A worker finished its task
    PasswordCracked(CrackedPassword),
    /// A worker could not solve its task; the task is dropped, not retried
    TaskFailed {
        /// Line of the failed task
        line_id: u32,
        /// Why it failed
        reason: String,
    },

    /// Opaque data for a freshly registered worker
    Welcome(WelcomePayload),
    /// A task for an idle worker
    Assign(Task),
    /// Self-addressed continuation of one hint solver
    ContinueHint {
        /// Task epoch the continuation belongs to
        epoch: u64,
        /// Solver slot to resume
        slot: usize,
    },
    /// Self-addressed continuation of the password solver
    ContinuePassword {
        /// Task epoch the continuation belongs to
        epoch: u64,
    },

    /// A result for the collector
    Collect {
        /// Input line
        line_id: u32,
        /// Recovered password
        password: String,
    },
    /// No more results will follow
    Finish,

    /// One slice of a large message
    Chunk(Chunk),
    /// Receipt for one slice
    ChunkAck(ChunkAck),
}

impl Message {
    /// Short variant name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Start => "Start",
            Message::Terminated(_) => "Terminated",
            Message::ReadRequest => "ReadRequest",
            Message::Batch(_) => "Batch",
            Message::Register => "Register",
            Message::PasswordCracked(_) => "PasswordCracked",
            Message::TaskFailed { .. } => "TaskFailed",
            Message::Welcome(_) => "Welcome",
            Message::Assign(_) => "Assign",
            Message::ContinueHint { .. } => "ContinueHint",
            Message::ContinuePassword { .. } => "ContinuePassword",
            Message::Collect { .. } => "Collect",
            Message::Finish => "Finish",
            Message::Chunk(_) => "Chunk",
            Message::ChunkAck(_) => "ChunkAck",
        }
    }
}

impl From<Terminated> for Message {
    fn from(t: Terminated) -> Self {
        Message::Terminated(t.0)
    }
}

impl From<LargeMessage> for Message {
    fn from(large: LargeMessage) -> Self {
        match large {
            LargeMessage::Welcome(payload) => Message::Welcome(payload),
            LargeMessage::Assign(task) => Message::Assign(task),
            LargeMessage::PasswordCracked(cracked) => Message::PasswordCracked(cracked),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::sha256_hex;

    fn row(fields: &[&str]) -> Record {
        fields.iter().map(|s| s.to_string()).collect()
    }

    fn sample() -> Record {
        row(&[
            "7",
            "Alice",
            "ABCDE",
            "3",
            &sha256_hex("ABA"),
            &sha256_hex("EDCB"),
            &sha256_hex("CBDE"),
        ])
    }

    #[test]
    fn parses_and_rebuilds_row() {
        let record = sample();
        let task = Task::from_record(&record).unwrap();
        assert_eq!(task.line_id, 7);
        assert_eq!(task.alphabet, "ABCDE");
        assert_eq!(task.password_length, 3);
        assert_eq!(task.hints.len(), 2);
        assert_eq!(task.password_hash, Digest::of("ABA"));
        assert_eq!(task.to_record(), record);
    }

    #[test]
    fn rejects_duplicate_alphabet_characters() {
        let mut record = sample();
        record[2] = "ABCA".into();
        let err = Task::from_record(&record).unwrap_err();
        assert!(err.to_string().contains("duplicate alphabet character 'A'"), "{err}");
    }

    #[test]
    fn rejects_short_and_malformed_rows() {
        assert!(Task::from_record(&row(&["1", "x", "AB"])).is_err());

        let mut bad_len = sample();
        bad_len[3] = "three".into();
        assert!(Task::from_record(&bad_len).is_err());

        let mut bad_hint = sample();
        bad_hint[6] = "nothex".into();
        assert!(matches!(
            Task::from_record(&bad_hint),
            Err(Error::InvalidRecord { line, .. }) if line == "7"
        ));
    }

    #[test]
    fn large_messages_map_onto_plain_messages() {
        let cracked = CrackedPassword {
            line_id: 1,
            password: "AB".into(),
            reporter: 4,
        };
        assert_eq!(
            Message::from(LargeMessage::PasswordCracked(cracked.clone())),
            Message::PasswordCracked(cracked)
        );
        assert_eq!(Message::from(Terminated(3)), Message::Terminated(3));
    }
}
