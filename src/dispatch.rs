//! Scheduling core
//!
//! [`Dispatcher`] owns the input buffer, the registered and idle worker sets
//! and the worker → task map. Every event returns the [`Directive`]s the
//! hosting actor must carry out, so the assignment policy, backpressure and
//! termination rule can be tested without threads.
//!
//! Invariants:
//! - a worker is either idle or holds exactly one assignment, never both
//! - a task is assigned again only after its worker was lost
//! - `Finish` is emitted once, when the source is drained, the buffer is
//!   empty and no assignment is outstanding

use crate::error::{Error, Result};
use crate::message::ActorId;
use crate::protocol::{Record, Task};
use ahash::{AHashMap, AHashSet};
use std::collections::VecDeque;

/// Default buffer size at or below which more input is requested
pub const DEFAULT_LOW_WATER_MARK: usize = 10;

/// An action the scheduler actor must perform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Send `task` to `worker`
    Assign {
        /// Idle worker that now owns the task
        worker: ActorId,
        /// The task
        task: Task,
    },
    /// Ask the source for another batch
    RequestBatch,
    /// All work is done; release these workers
    Finish {
        /// Every registered worker, ascending
        workers: Vec<ActorId>,
    },
}

/// Pure scheduling state machine
#[derive(Debug)]
pub struct Dispatcher {
    low_water_mark: usize,
    buffer: VecDeque<Record>,
    workers: AHashSet<ActorId>,
    idle: VecDeque<ActorId>,
    assignments: AHashMap<ActorId, Task>,
    started: bool,
    drained: bool,
    read_in_flight: bool,
    finished: bool,
    completed: usize,
    failed: Vec<u32>,
    rejected: usize,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_LOW_WATER_MARK)
    }
}

impl Dispatcher {
    /// Create a dispatcher that refills at `low_water_mark` buffered rows
    pub fn new(low_water_mark: usize) -> Self {
        Self {
            low_water_mark,
            buffer: VecDeque::new(),
            workers: AHashSet::new(),
            idle: VecDeque::new(),
            assignments: AHashMap::new(),
            started: false,
            drained: false,
            read_in_flight: false,
            finished: false,
            completed: 0,
            failed: Vec::new(),
            rejected: 0,
        }
    }

    /// Enable assignment. Nothing is assigned or requested before this.
    pub fn start(&mut self) -> Vec<Directive> {
        self.started = true;
        self.pump()
    }

    /// Add a worker to the registered and idle sets
    pub fn register_worker(&mut self, worker: ActorId) -> Vec<Directive> {
        if self.finished {
            return Vec::new();
        }
        if self.workers.insert(worker) {
            self.idle.push_back(worker);
        } else {
            tracing::debug!(worker, "worker registered twice");
        }
        self.pump()
    }

    /// Buffer a batch from the source; an empty batch means the source is drained
    pub fn submit_lines(&mut self, batch: Vec<Record>) -> Vec<Directive> {
        self.read_in_flight = false;
        if batch.is_empty() {
            if !self.drained {
                tracing::info!(buffered = self.buffer.len(), "input source drained");
            }
            self.drained = true;
        } else {
            self.buffer.extend(batch);
        }
        self.pump()
    }

    /// A worker finished `line_id`; it becomes idle again.
    ///
    /// Fails without side effects if `line_id` is not the worker's current assignment.
    pub fn report_result(&mut self, worker: ActorId, line_id: u32) -> Result<Vec<Directive>> {
        match self.assignments.get(&worker) {
            Some(task) if task.line_id == line_id => {}
            _ => return Err(Error::UnexpectedResult { worker, line_id }),
        }
        self.assignments.remove(&worker);
        self.completed += 1;
        self.idle.push_back(worker);
        Ok(self.pump())
    }

    /// A worker gave up on its task. The line is recorded as failed and not
    /// requeued; the worker is retired because it is about to exit.
    pub fn task_failed(&mut self, worker: ActorId, line_id: u32) -> Vec<Directive> {
        match self.assignments.get(&worker) {
            Some(task) if task.line_id == line_id => {
                self.assignments.remove(&worker);
                self.failed.push(line_id);
            }
            _ => {
                tracing::warn!(worker, line_id, "failure report for a task the worker does not hold");
            }
        }
        self.forget(worker);
        self.pump()
    }

    /// Remove a worker; its task, if any, goes back to the front of the buffer
    pub fn worker_lost(&mut self, worker: ActorId) -> Vec<Directive> {
        if let Some(task) = self.assignments.remove(&worker) {
            tracing::warn!(worker, line_id = task.line_id, "worker lost, requeueing task");
            self.buffer.push_front(task.to_record());
        }
        self.forget(worker);
        self.pump()
    }

    fn forget(&mut self, worker: ActorId) {
        self.workers.remove(&worker);
        self.idle.retain(|w| *w != worker);
    }

    /// Run assignment, backpressure and the termination check
    fn pump(&mut self) -> Vec<Directive> {
        let mut directives = Vec::new();
        if !self.started || self.finished {
            return directives;
        }

        while !self.idle.is_empty() {
            let Some(record) = self.buffer.pop_front() else {
                break;
            };
            let task = match Task::from_record(&record) {
                Ok(task) => task,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unparseable record");
                    self.rejected += 1;
                    continue;
                }
            };
            let Some(worker) = self.idle.pop_front() else {
                break;
            };
            tracing::debug!(worker, line_id = task.line_id, "assigning task");
            self.assignments.insert(worker, task.clone());
            directives.push(Directive::Assign { worker, task });
        }

        if self.buffer.len() <= self.low_water_mark && !self.drained && !self.read_in_flight {
            self.read_in_flight = true;
            directives.push(Directive::RequestBatch);
        }

        if self.drained && self.buffer.is_empty() && self.assignments.is_empty() {
            self.finished = true;
            let mut workers: Vec<ActorId> = self.workers.iter().copied().collect();
            workers.sort_unstable();
            directives.push(Directive::Finish { workers });
        }

        directives
    }

    /// Whether `Finish` has been emitted
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Rows waiting for a worker
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Registered workers without a task
    pub fn idle_count(&self) -> usize {
        self.idle.len()
    }

    /// Registered workers
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// The task `worker` currently holds
    pub fn assignment_of(&self, worker: ActorId) -> Option<&Task> {
        self.assignments.get(&worker)
    }

    /// Lines reported as unsolvable
    pub fn failed_lines(&self) -> &[u32] {
        &self.failed
    }

    /// Results accepted so far
    pub fn completed(&self) -> usize {
        self.completed
    }

    /// Records dropped because they did not parse
    pub fn rejected(&self) -> usize {
        self.rejected
    }
}
