//! Scheduler actor
//!
//! Hosts a [`Dispatcher`] and turns its directives into messages: tasks go to
//! workers through the chunk protocol, results go to the collector, and batch
//! requests go to the input source. Workers are death-watched; a worker's
//! `Terminated` is the only signal that its task must be requeued.

use crate::actor::{Actor, Context};
use crate::dispatch::{Directive, Dispatcher, DEFAULT_LOW_WATER_MARK};
use crate::error::{Error, Result};
use crate::message::{ActorId, Envelope};
use crate::protocol::{CrackedPassword, LargeMessage, Message, WelcomePayload};
use crate::transfer::{MessageTransfer, DEFAULT_CHUNK_SIZE};
use std::time::Instant;

/// Scheduler configuration
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Buffered rows at or below which another batch is requested
    pub low_water_mark: usize,

    /// Chunk size for tasks and welcome payloads
    pub chunk_size: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            low_water_mark: DEFAULT_LOW_WATER_MARK,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl SchedulerConfig {
    /// Create a new scheduler configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the refill threshold
    pub fn with_low_water_mark(mut self, mark: usize) -> Self {
        self.low_water_mark = mark;
        self
    }

    /// Set the chunk size
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }
}

/// Scheduler-local state
pub struct SchedulerState {
    dispatch: Dispatcher,
    transfer: MessageTransfer,
    started_at: Option<Instant>,
}

/// Master actor: buffers input, assigns tasks, recovers lost work
pub struct Scheduler {
    source: ActorId,
    collector: ActorId,
    welcome: WelcomePayload,
    config: SchedulerConfig,
}

impl Scheduler {
    /// Scheduler reading from `source` and reporting to `collector`
    pub fn new(source: ActorId, collector: ActorId, config: SchedulerConfig) -> Self {
        Self {
            source,
            collector,
            welcome: WelcomePayload::default(),
            config,
        }
    }

    /// Blob sent to every worker on registration
    pub fn with_welcome(mut self, welcome: WelcomePayload) -> Self {
        self.welcome = welcome;
        self
    }

    fn register(
        &mut self,
        state: &mut SchedulerState,
        worker: ActorId,
        ctx: &mut Context<Message>,
    ) -> Result<()> {
        ctx.watch(worker)?;
        tracing::info!(worker, welcome_bytes = self.welcome.len(), "worker registered");
        let welcome = LargeMessage::Welcome(self.welcome.clone());
        if let Err(e) = state.transfer.transmit(ctx, &welcome, worker) {
            tracing::warn!(worker, error = %e, "could not send welcome payload");
        }
        let directives = state.dispatch.register_worker(worker);
        self.execute(state, directives, ctx)
    }

    fn cracked(
        &mut self,
        state: &mut SchedulerState,
        cracked: CrackedPassword,
        ctx: &mut Context<Message>,
    ) -> Result<()> {
        let CrackedPassword {
            line_id,
            password,
            reporter,
        } = cracked;
        let directives = match state.dispatch.report_result(reporter, line_id) {
            Ok(directives) => directives,
            Err(e) => {
                tracing::warn!(error = %e, "dropping result");
                return Ok(());
            }
        };
        tracing::info!(worker = reporter, line_id, "password received");
        // The collector must have every result before it can see Finish.
        let collected = ctx.send(self.collector, Message::Collect { line_id, password });
        if let Err(e) = &collected {
            tracing::error!(line_id, error = %e, "could not forward result");
        }
        let executed = self.execute(state, directives, ctx);
        collected.and(executed)
    }

    /// Carry out every directive the dispatcher returned.
    ///
    /// The dispatcher has already committed to them, so a failed send never
    /// skips the rest; the first error is returned once all have run.
    fn execute(
        &mut self,
        state: &mut SchedulerState,
        directives: Vec<Directive>,
        ctx: &mut Context<Message>,
    ) -> Result<()> {
        let mut outcome = Ok(());
        for directive in directives {
            match directive {
                Directive::Assign { worker, task } => {
                    let line_id = task.line_id;
                    let assign = LargeMessage::Assign(task);
                    if let Err(e) = state.transfer.transmit(ctx, &assign, worker) {
                        // The worker is gone; its Terminated will requeue the task.
                        tracing::warn!(worker, line_id, error = %e, "could not send task");
                    }
                }
                Directive::RequestBatch => {
                    if let Err(e) = ctx.send(self.source, Message::ReadRequest) {
                        tracing::error!(error = %e, "could not request input");
                        outcome = outcome.and(Err(e));
                    }
                }
                Directive::Finish { workers } => {
                    if let Err(e) = self.finish(state, workers, ctx) {
                        outcome = outcome.and(Err(e));
                    }
                }
            }
        }
        outcome
    }

    fn finish(
        &mut self,
        state: &mut SchedulerState,
        workers: Vec<ActorId>,
        ctx: &mut Context<Message>,
    ) -> Result<()> {
        let signalled = ctx.send(self.collector, Message::Finish);
        if let Err(e) = &signalled {
            tracing::error!(error = %e, "could not signal finish");
        }
        for worker in &workers {
            ctx.unwatch(*worker);
            if let Err(e) = ctx.stop_actor(*worker) {
                tracing::debug!(worker, error = %e, "worker already gone");
            }
        }
        if let Err(e) = ctx.stop_actor(self.source) {
            tracing::debug!(error = %e, "source already gone");
        }

        let elapsed_ms = state
            .started_at
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or_default();
        tracing::info!(
            completed = state.dispatch.completed(),
            failed = state.dispatch.failed_lines().len(),
            rejected = state.dispatch.rejected(),
            workers = workers.len(),
            elapsed_ms,
            "all tasks done"
        );
        ctx.stop();
        signalled
    }
}

impl Actor for Scheduler {
    type State = SchedulerState;
    type Message = Message;

    fn init(&mut self, ctx: &mut Context<Message>) -> Result<SchedulerState> {
        tracing::debug!(
            scheduler = ctx.id(),
            source = self.source,
            collector = self.collector,
            "scheduler ready"
        );
        Ok(SchedulerState {
            dispatch: Dispatcher::new(self.config.low_water_mark),
            transfer: MessageTransfer::new(ctx.id(), self.config.chunk_size),
            started_at: None,
        })
    }

    fn handle_message(
        &mut self,
        state: &mut SchedulerState,
        message: Envelope<Message>,
        ctx: &mut Context<Message>,
    ) -> Result<()> {
        let source = message.source;
        match message.payload {
            Message::Start => {
                if state.started_at.is_some() {
                    tracing::warn!("scheduler already started");
                    return Ok(());
                }
                tracing::info!("starting");
                state.started_at = Some(Instant::now());
                let directives = state.dispatch.start();
                self.execute(state, directives, ctx)
            }
            Message::Register => {
                let worker = source.ok_or(Error::MissingSender("Register"))?;
                self.register(state, worker, ctx)
            }
            Message::Batch(rows) => {
                tracing::debug!(rows = rows.len(), "batch received");
                let directives = state.dispatch.submit_lines(rows);
                self.execute(state, directives, ctx)
            }
            Message::PasswordCracked(cracked) => self.cracked(state, cracked, ctx),
            Message::TaskFailed { line_id, reason } => {
                let worker = source.ok_or(Error::MissingSender("TaskFailed"))?;
                tracing::warn!(worker, line_id, %reason, "task failed, not retrying");
                state.transfer.cancel_destination(worker);
                state.transfer.cancel_origin(worker);
                let directives = state.dispatch.task_failed(worker, line_id);
                self.execute(state, directives, ctx)
            }
            Message::Terminated(id) => {
                let cancelled = state.transfer.cancel_destination(id);
                let abandoned = state.transfer.cancel_origin(id);
                tracing::info!(worker = id, cancelled, abandoned, "worker terminated");
                let directives = state.dispatch.worker_lost(id);
                self.execute(state, directives, ctx)
            }
            Message::Chunk(chunk) => state.transfer.receive_chunk(ctx, chunk),
            Message::ChunkAck(ack) => state.transfer.receive_ack(ctx, ack),
            other => {
                tracing::debug!(kind = other.kind(), "ignoring message");
                Ok(())
            }
        }
    }
}
