//! Cracking worker
//!
//! A worker holds at most one task. It solves the task's hints first, each
//! solved hint shrinking the working alphabet, and once every hint is solved
//! it enumerates the password over what is left. Both searches run in
//! bounded slices; between slices the worker re-queues a continuation to
//! itself so chunk traffic and other messages are interleaved with the search.

use crate::actor::{Actor, Context};
use crate::error::{Error, Result};
use crate::hint::HintSolver;
use crate::message::{ActorId, Envelope};
use crate::password::PasswordSolver;
use crate::protocol::{CrackedPassword, LargeMessage, Message, Task};
use crate::search::{SearchStep, DEFAULT_TIME_SLICE};
use crate::transfer::{MessageTransfer, DEFAULT_CHUNK_SIZE};
use std::time::{Duration, Instant};

/// How hints are distributed over solvers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HintStrategy {
    /// One solver per hint, each resumed independently
    #[default]
    PerHint,
    /// One solver testing every permutation against all unsolved hints
    Shared,
}

/// Worker configuration
#[derive(Debug, Clone)]
pub struct CrackerConfig {
    /// Wall-clock budget of one search slice
    pub time_slice: Duration,

    /// How hints are mapped onto solvers
    pub hint_strategy: HintStrategy,

    /// Chunk size for large messages sent by this worker
    pub chunk_size: usize,
}

impl Default for CrackerConfig {
    fn default() -> Self {
        Self {
            time_slice: DEFAULT_TIME_SLICE,
            hint_strategy: HintStrategy::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl CrackerConfig {
    /// Create a new worker configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the slice budget
    pub fn with_time_slice(mut self, slice: Duration) -> Self {
        self.time_slice = slice;
        self
    }

    /// Set the hint strategy
    pub fn with_hint_strategy(mut self, strategy: HintStrategy) -> Self {
        self.hint_strategy = strategy;
        self
    }

    /// Set the chunk size
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }
}

/// The task in progress and its search cursors
struct Job {
    task: Task,
    alphabet: Vec<char>,
    solved: usize,
    hint_solvers: Vec<Option<HintSolver>>,
    password: Option<PasswordSolver>,
}

/// Worker-local state
pub struct WorkerState {
    transfer: MessageTransfer,
    registered_at: Instant,
    epoch: u64,
    job: Option<Job>,
}

/// Actor that cracks one task at a time for a scheduler
pub struct Worker {
    scheduler: ActorId,
    config: CrackerConfig,
}

impl Worker {
    /// Worker that registers with `scheduler`
    pub fn new(scheduler: ActorId, config: CrackerConfig) -> Self {
        Self { scheduler, config }
    }

    fn start_task(
        &mut self,
        state: &mut WorkerState,
        task: Task,
        ctx: &mut Context<Message>,
    ) -> Result<()> {
        // The scheduler only assigns to idle workers; the dropped task is never reported.
        if let Some(old) = &state.job {
            tracing::error!(
                worker = ctx.id(),
                line_id = old.task.line_id,
                next = task.line_id,
                "assigned while busy, dropping unfinished task"
            );
        }
        state.epoch += 1;
        let epoch = state.epoch;

        let alphabet: Vec<char> = task.alphabet.chars().collect();
        let hints = task.hints.iter().copied().enumerate();
        let hint_solvers: Vec<Option<HintSolver>> = match self.config.hint_strategy {
            HintStrategy::PerHint => hints
                .map(|hint| Some(HintSolver::new(&alphabet, [hint])))
                .collect(),
            HintStrategy::Shared if task.hints.is_empty() => Vec::new(),
            HintStrategy::Shared => vec![Some(HintSolver::new(&alphabet, hints))],
        };

        tracing::info!(
            worker = ctx.id(),
            line_id = task.line_id,
            hints = task.hints.len(),
            alphabet = %task.alphabet,
            "starting task"
        );

        let slots = hint_solvers.len();
        let no_hints = task.hints.is_empty();
        state.job = Some(Job {
            task,
            alphabet,
            solved: 0,
            hint_solvers,
            password: None,
        });

        for slot in 0..slots {
            ctx.tell_self(Message::ContinueHint { epoch, slot })?;
        }
        if no_hints {
            Self::start_password(state, ctx)?;
        }
        Ok(())
    }

    fn start_password(state: &mut WorkerState, ctx: &mut Context<Message>) -> Result<()> {
        let epoch = state.epoch;
        let Some(job) = state.job.as_mut() else {
            return Ok(());
        };
        tracing::debug!(
            worker = ctx.id(),
            line_id = job.task.line_id,
            alphabet = %job.alphabet.iter().collect::<String>(),
            "hints solved, enumerating password"
        );
        job.password = Some(PasswordSolver::new(
            &job.alphabet,
            job.task.password_length,
            job.task.password_hash,
        ));
        ctx.tell_self(Message::ContinuePassword { epoch })
    }

    fn continue_hint(
        &mut self,
        state: &mut WorkerState,
        epoch: u64,
        slot: usize,
        ctx: &mut Context<Message>,
    ) -> Result<()> {
        if epoch != state.epoch {
            tracing::trace!(worker = ctx.id(), epoch, "stale hint continuation");
            return Ok(());
        }
        let Some(job) = state.job.as_mut() else {
            return Ok(());
        };
        let line_id = job.task.line_id;
        let Some(solver) = job.hint_solvers.get_mut(slot).and_then(Option::as_mut) else {
            return Ok(());
        };

        match solver.resume(self.config.time_slice) {
            SearchStep::Yielded => ctx.tell_self(Message::ContinueHint { epoch, slot }),
            SearchStep::Cracked(hit) => {
                let more = solver.remaining() > 0;
                if more {
                    ctx.tell_self(Message::ContinueHint { epoch, slot })?;
                } else {
                    job.hint_solvers[slot] = None;
                }

                if let Some(pos) = job.alphabet.iter().position(|c| *c == hit.excluded) {
                    job.alphabet.remove(pos);
                }
                job.solved += 1;
                tracing::debug!(
                    worker = ctx.id(),
                    line_id,
                    hint = hit.hint,
                    excluded = %hit.excluded,
                    solved = job.solved,
                    "hint cracked"
                );

                if job.solved == job.task.hints.len() {
                    Self::start_password(state, ctx)?;
                }
                Ok(())
            }
            SearchStep::Exhausted => {
                self.fail(state, ctx, line_id, format!("hint solver {} found no match", slot))
            }
        }
    }

    fn continue_password(
        &mut self,
        state: &mut WorkerState,
        epoch: u64,
        ctx: &mut Context<Message>,
    ) -> Result<()> {
        if epoch != state.epoch {
            tracing::trace!(worker = ctx.id(), epoch, "stale password continuation");
            return Ok(());
        }
        let Some(job) = state.job.as_mut() else {
            return Ok(());
        };
        let line_id = job.task.line_id;
        let Some(solver) = job.password.as_mut() else {
            return Ok(());
        };

        match solver.resume(self.config.time_slice) {
            SearchStep::Yielded => ctx.tell_self(Message::ContinuePassword { epoch }),
            SearchStep::Cracked(password) => {
                tracing::info!(worker = ctx.id(), line_id, "password cracked");
                state.job = None;
                let report = LargeMessage::PasswordCracked(CrackedPassword {
                    line_id,
                    password,
                    reporter: ctx.id(),
                });
                state.transfer.transmit(ctx, &report, self.scheduler)
            }
            SearchStep::Exhausted => self.fail(
                state,
                ctx,
                line_id,
                "password enumeration found no match".to_string(),
            ),
        }
    }

    /// Report a corrupt task upward, then fail fatally so this worker terminates.
    fn fail(
        &mut self,
        state: &mut WorkerState,
        ctx: &mut Context<Message>,
        line_id: u32,
        what: String,
    ) -> Result<()> {
        tracing::error!(worker = ctx.id(), line_id, %what, "search exhausted, task input is corrupt");
        state.job = None;
        let failed = Message::TaskFailed {
            line_id,
            reason: what.clone(),
        };
        if let Err(e) = ctx.send(self.scheduler, failed) {
            tracing::warn!(worker = ctx.id(), error = %e, "could not report failed task");
        }
        Err(Error::SearchExhausted { line_id, what })
    }
}

impl Actor for Worker {
    type State = WorkerState;
    type Message = Message;

    fn init(&mut self, ctx: &mut Context<Message>) -> Result<WorkerState> {
        ctx.watch(self.scheduler)?;
        ctx.send(self.scheduler, Message::Register)?;
        tracing::info!(worker = ctx.id(), scheduler = self.scheduler, "registered");
        Ok(WorkerState {
            transfer: MessageTransfer::new(ctx.id(), self.config.chunk_size),
            registered_at: Instant::now(),
            epoch: 0,
            job: None,
        })
    }

    fn handle_message(
        &mut self,
        state: &mut WorkerState,
        message: Envelope<Message>,
        ctx: &mut Context<Message>,
    ) -> Result<()> {
        match message.payload {
            Message::Chunk(chunk) => state.transfer.receive_chunk(ctx, chunk),
            Message::ChunkAck(ack) => state.transfer.receive_ack(ctx, ack),
            Message::Welcome(payload) => {
                tracing::info!(
                    worker = ctx.id(),
                    bytes = payload.len(),
                    elapsed_ms = state.registered_at.elapsed().as_millis() as u64,
                    "welcome payload received"
                );
                Ok(())
            }
            Message::Assign(task) => self.start_task(state, task, ctx),
            Message::ContinueHint { epoch, slot } => self.continue_hint(state, epoch, slot, ctx),
            Message::ContinuePassword { epoch } => self.continue_password(state, epoch, ctx),
            Message::Terminated(id) if id == self.scheduler => {
                tracing::info!(worker = ctx.id(), "scheduler terminated, stopping");
                ctx.stop();
                Ok(())
            }
            other => {
                tracing::debug!(worker = ctx.id(), kind = other.kind(), "ignoring message");
                Ok(())
            }
        }
    }

    fn shutdown(&mut self, state: WorkerState) -> Result<()> {
        if let Some(job) = state.job {
            tracing::info!(line_id = job.task.line_id, "stopping with unfinished task");
        }
        Ok(())
    }
}
