//! Actor abstraction
//!
//! Actors are isolated execution units with their own state and mailbox.
//! Each runs on its own thread and handles one message at a time; the only
//! way to reach another actor is to send it a message through the [`Router`].

use crate::channel::{Channel, ChannelConfig, ChannelStats};
use crate::error::{Error, Result};
use crate::message::{ActorId, ControlMessage, Envelope, Terminated};
use crate::router::{Mailbox, Router};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Global actor ID counter. Zero is never handed out.
static ACTOR_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Actor configuration
#[derive(Debug, Clone)]
pub struct ActorConfig {
    /// Actor name (for logging and thread names)
    pub name: Option<String>,

    /// CPU core to pin this actor's thread to (None = no pinning)
    pub cpu_affinity: Option<usize>,

    /// Mailbox capacity (None = unbounded)
    pub queue_capacity: Option<usize>,

    /// Stack size for the actor thread (None = default)
    pub stack_size: Option<usize>,

    /// How long an idle actor blocks on its mailbox before rechecking control messages
    pub poll_interval: Duration,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            name: None,
            cpu_affinity: None,
            queue_capacity: None,
            stack_size: None,
            poll_interval: Duration::from_millis(10),
        }
    }
}

impl ActorConfig {
    /// Create a new actor configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the actor name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set CPU affinity
    pub fn with_cpu_affinity(mut self, cpu: usize) -> Self {
        self.cpu_affinity = Some(cpu);
        self
    }

    /// Bound the mailbox.
    ///
    /// Actors that send continuations to themselves can deadlock on a full
    /// bounded mailbox; only bound actors that never do.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = Some(capacity);
        self
    }

    /// Set stack size
    pub fn with_stack_size(mut self, size: usize) -> Self {
        self.stack_size = Some(size);
        self
    }

    /// Set the idle poll interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// Trait for actor message handlers
pub trait Actor: Send + Sized + 'static {
    /// The type of state this actor maintains; built on the actor's own thread
    type State;

    /// The type of messages this actor processes
    type Message: From<Terminated> + Send + 'static;

    /// Initialize the actor state
    fn init(&mut self, ctx: &mut Context<Self::Message>) -> Result<Self::State>;

    /// Handle an incoming message
    fn handle_message(
        &mut self,
        state: &mut Self::State,
        message: Envelope<Self::Message>,
        ctx: &mut Context<Self::Message>,
    ) -> Result<()>;

    /// Called when the actor stops gracefully (not on kill or fatal error)
    fn shutdown(&mut self, _state: Self::State) -> Result<()> {
        Ok(())
    }
}

/// What a running handler can do besides mutating its own state
pub struct Context<M> {
    id: ActorId,
    router: Router<M>,
    stopping: bool,
}

impl<M> Context<M>
where
    M: From<Terminated> + Send + 'static,
{
    pub(crate) fn new(id: ActorId, router: Router<M>) -> Self {
        Self {
            id,
            router,
            stopping: false,
        }
    }

    /// This actor's own address
    pub fn id(&self) -> ActorId {
        self.id
    }

    /// The router this actor is registered with
    pub fn router(&self) -> &Router<M> {
        &self.router
    }

    /// Send `message` to `target`, stamped with this actor as source
    pub fn send(&self, target: ActorId, message: M) -> Result<()> {
        self.router.tell(self.id, target, message)
    }

    /// Send an envelope unchanged, preserving its original source
    pub fn forward(&self, target: ActorId, envelope: Envelope<M>) -> Result<()> {
        self.router.send(target, envelope)
    }

    /// Queue a message behind everything already in this actor's mailbox
    pub fn tell_self(&self, message: M) -> Result<()> {
        self.router.tell(self.id, self.id, message)
    }

    /// Receive [`Terminated`] when `target` exits
    pub fn watch(&self, target: ActorId) -> Result<()> {
        self.router.watch(self.id, target)
    }

    /// Stop receiving [`Terminated`] for `target`
    pub fn unwatch(&self, target: ActorId) {
        self.router.unwatch(self.id, target)
    }

    /// Ask another actor to stop after its current message
    pub fn stop_actor(&self, target: ActorId) -> Result<()> {
        self.router.stop(target)
    }

    /// Stop this actor once the current handler returns
    pub fn stop(&mut self) {
        self.stopping = true;
    }

    /// Whether [`stop`](Self::stop) has been called
    pub fn is_stopping(&self) -> bool {
        self.stopping
    }
}

/// Handle for managing a running actor
pub struct ActorHandle<M> {
    id: ActorId,
    name: String,
    router: Router<M>,
    thread_handle: Option<JoinHandle<Result<()>>>,
    running: Arc<AtomicBool>,
    stats: Arc<ChannelStats>,
}

impl<M> ActorHandle<M>
where
    M: From<Terminated> + Send + 'static,
{
    /// Get the actor ID
    pub fn id(&self) -> ActorId {
        self.id
    }

    /// Get the actor name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Send a message with no source to the actor
    pub fn send(&self, message: M) -> Result<()> {
        self.router.send(self.id, Envelope::new(message))
    }

    /// Check if the actor thread is still running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Mailbox traffic counters
    pub fn mailbox_stats(&self) -> Arc<ChannelStats> {
        Arc::clone(&self.stats)
    }

    /// Stop the actor gracefully and wait for its thread
    pub fn stop(&mut self) -> Result<()> {
        if self.thread_handle.is_none() {
            return Err(Error::ActorNotRunning);
        }
        match self.router.stop(self.id) {
            Ok(()) | Err(Error::ActorNotFound(_)) => {}
            Err(e) => return Err(e),
        }
        self.join()
    }

    /// Kill the actor without running its shutdown hook and wait for its thread
    pub fn kill(&mut self) -> Result<()> {
        if self.thread_handle.is_none() {
            return Err(Error::ActorNotRunning);
        }
        match self.router.kill(self.id) {
            Ok(()) | Err(Error::ActorNotFound(_)) => {}
            Err(e) => return Err(e),
        }
        self.join()
    }

    /// Wait for the actor thread to exit on its own
    pub fn join(&mut self) -> Result<()> {
        match self.thread_handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| Error::ActorPanicked(self.name.clone()))?,
            None => Ok(()),
        }
    }
}

/// Why the message loop ended
enum Exit {
    Stopped,
    Killed,
    Failed(Error),
}

/// Deregisters the actor when its thread unwinds or returns, so watchers
/// hear about every exit including panics.
struct ExitGuard<M>
where
    M: From<Terminated> + Send + 'static,
{
    id: ActorId,
    router: Router<M>,
    running: Arc<AtomicBool>,
}

impl<M> Drop for ExitGuard<M>
where
    M: From<Terminated> + Send + 'static,
{
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
        self.router.deregister(self.id);
    }
}

/// Spawn an actor on its own thread and register it with `router`
pub fn spawn<A>(
    router: &Router<A::Message>,
    mut actor: A,
    config: ActorConfig,
) -> Result<ActorHandle<A::Message>>
where
    A: Actor,
{
    let id = ACTOR_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
    let name = match &config.name {
        Some(name) => format!("{}-{}", name, id),
        None => format!("actor-{}", id),
    };

    let (message_tx, message_rx) = Channel::new(ChannelConfig {
        capacity: config.queue_capacity,
    });
    let (control_tx, control_rx) = Channel::mpsc(16);
    let stats = message_tx.stats();

    router.register(id, Mailbox::new(name.clone(), message_tx, control_tx));

    let running = Arc::new(AtomicBool::new(true));
    let guard = ExitGuard {
        id,
        router: router.clone(),
        running: Arc::clone(&running),
    };
    let ctx_router = router.clone();
    let actor_config = config.clone();

    let mut thread_builder = thread::Builder::new().name(name.clone());
    if let Some(stack_size) = config.stack_size {
        thread_builder = thread_builder.stack_size(stack_size);
    }

    let thread_handle = thread_builder
        .spawn(move || {
            let _guard = guard;

            if let Some(cpu) = actor_config.cpu_affinity {
                if let Some(core_ids) = core_affinity::get_core_ids() {
                    if let Some(core) = core_ids.get(cpu % core_ids.len().max(1)) {
                        core_affinity::set_for_current(*core);
                    }
                }
            }

            let mut ctx = Context::new(id, ctx_router);
            let mut state = actor.init(&mut ctx).map_err(|e| {
                tracing::error!(actor = id, error = %e, "actor failed to initialize");
                e
            })?;

            let exit = loop {
                match control_rx.try_recv() {
                    Ok(Some(ControlMessage::Stop)) => break Exit::Stopped,
                    Ok(Some(ControlMessage::Kill)) => break Exit::Killed,
                    Ok(None) => {}
                    Err(_) => break Exit::Stopped,
                }
                if ctx.is_stopping() {
                    break Exit::Stopped;
                }

                match message_rx.recv_timeout(actor_config.poll_interval) {
                    Ok(envelope) => {
                        if let Err(e) = actor.handle_message(&mut state, envelope, &mut ctx) {
                            if e.is_fatal() {
                                tracing::error!(actor = id, error = %e, "fatal error, terminating actor");
                                break Exit::Failed(e);
                            }
                            tracing::warn!(actor = id, error = %e, "error handling message");
                        }
                    }
                    Err(Error::Timeout) => {}
                    Err(_) => break Exit::Stopped,
                }
            };

            match exit {
                Exit::Stopped => actor.shutdown(state),
                Exit::Killed => {
                    tracing::debug!(actor = id, "actor killed");
                    Ok(())
                }
                Exit::Failed(e) => Err(e),
            }
        })
        .map_err(|e| {
            router.deregister(id);
            Error::SpawnFailed(e.to_string())
        })?;

    Ok(ActorHandle {
        id,
        name,
        router: router.clone(),
        thread_handle: Some(thread_handle),
        running,
        stats,
    })
}
