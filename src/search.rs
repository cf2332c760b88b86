//! Outcome of one time-boxed slice of a resumable search

use std::time::Duration;

/// Default wall-clock budget for one slice of a search
pub const DEFAULT_TIME_SLICE: Duration = Duration::from_secs(1);

/// What a solver reports when it hands control back
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchStep<T> {
    /// The budget ran out; the cursor is saved and the next call resumes it
    Yielded,
    /// A candidate matched
    Cracked(T),
    /// The whole space was scanned without a match
    Exhausted,
}

impl<T> SearchStep<T> {
    /// Whether the solver wants to be resumed
    pub fn is_yielded(&self) -> bool {
        matches!(self, SearchStep::Yielded)
    }
}
