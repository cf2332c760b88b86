//! In-process cluster
//!
//! Boots one source, one collector, one scheduler and a pool of workers on a
//! shared router, starts the scheduler and waits for the collector's sorted
//! output. Workers can be added or killed while the cluster runs.

use crate::actor::{spawn, ActorConfig, ActorHandle};
use crate::channel::{Channel, Receiver};
use crate::collector::{ResultCollector, Solution};
use crate::error::{Error, Result};
use crate::message::ActorId;
use crate::protocol::{Message, Record, WelcomePayload};
use crate::router::Router;
use crate::scheduler::{Scheduler, SchedulerConfig};
use crate::source::{LineSource, SourceConfig};
use crate::worker::{CrackerConfig, Worker};
use ahash::AHashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Default size of the blob every worker receives on registration
pub const DEFAULT_WELCOME_BYTES: usize = 1 << 20;

/// Cluster configuration
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    /// Workers spawned at launch
    pub num_workers: usize,

    /// Configuration shared by every worker
    pub worker: CrackerConfig,

    /// Scheduler configuration
    pub scheduler: SchedulerConfig,

    /// Input source configuration
    pub source: SourceConfig,

    /// Thread template for workers
    pub actor: ActorConfig,

    /// Pin worker threads to cores round-robin
    pub enable_cpu_affinity: bool,

    /// Blob handed to each worker on registration
    pub welcome: WelcomePayload,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            num_workers: num_cpus::get(),
            worker: CrackerConfig::default(),
            scheduler: SchedulerConfig::default(),
            source: SourceConfig::default(),
            actor: ActorConfig::default(),
            enable_cpu_affinity: false,
            welcome: WelcomePayload::zeroed(DEFAULT_WELCOME_BYTES),
        }
    }
}

impl ClusterConfig {
    /// Create a new cluster configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of workers spawned at launch
    pub fn with_num_workers(mut self, num: usize) -> Self {
        self.num_workers = num;
        self
    }

    /// Set the worker configuration
    pub fn with_worker_config(mut self, config: CrackerConfig) -> Self {
        self.worker = config;
        self
    }

    /// Set the scheduler configuration
    pub fn with_scheduler_config(mut self, config: SchedulerConfig) -> Self {
        self.scheduler = config;
        self
    }

    /// Set the source configuration
    pub fn with_source_config(mut self, config: SourceConfig) -> Self {
        self.source = config;
        self
    }

    /// Set the worker thread template
    pub fn with_actor_config(mut self, config: ActorConfig) -> Self {
        self.actor = config;
        self
    }

    /// Enable CPU affinity pinning
    pub fn with_cpu_affinity(mut self, enable: bool) -> Self {
        self.enable_cpu_affinity = enable;
        self
    }

    /// Set the welcome payload
    pub fn with_welcome(mut self, welcome: WelcomePayload) -> Self {
        self.welcome = welcome;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.worker.chunk_size == 0 || self.scheduler.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunk_size must be at least 1".into()));
        }
        if self.worker.time_slice.is_zero() {
            return Err(Error::InvalidConfig("time_slice must be positive".into()));
        }
        Ok(())
    }
}

/// A running cluster
pub struct Cluster {
    config: ClusterConfig,
    router: Router<Message>,
    source: ActorHandle<Message>,
    collector: ActorHandle<Message>,
    scheduler: ActorHandle<Message>,
    workers: Mutex<AHashMap<ActorId, ActorHandle<Message>>>,
    spawned: AtomicUsize,
    results: Receiver<Vec<Solution>>,
}

impl Cluster {
    /// Spawn every role, start the scheduler and feed it `records`
    pub fn launch(config: ClusterConfig, records: Vec<Record>) -> Result<Self> {
        config.validate()?;
        let router = Router::new();

        let (output, results) = Channel::mpsc(1);
        let collector = spawn(
            &router,
            ResultCollector::new(output),
            ActorConfig::new().with_name("collector"),
        )?;
        let source = spawn(
            &router,
            LineSource::new(records, config.source.clone())?,
            ActorConfig::new().with_name("source"),
        )?;
        let scheduler = spawn(
            &router,
            Scheduler::new(source.id(), collector.id(), config.scheduler.clone())
                .with_welcome(config.welcome.clone()),
            ActorConfig::new().with_name("scheduler"),
        )?;

        let cluster = Self {
            config,
            router,
            source,
            collector,
            scheduler,
            workers: Mutex::new(AHashMap::new()),
            spawned: AtomicUsize::new(0),
            results,
        };
        for _ in 0..cluster.config.num_workers {
            cluster.add_worker()?;
        }
        cluster.scheduler.send(Message::Start)?;
        tracing::info!(workers = cluster.config.num_workers, "cluster launched");
        Ok(cluster)
    }

    /// Spawn one more worker; it registers with the scheduler on its own
    pub fn add_worker(&self) -> Result<ActorId> {
        let index = self.spawned.fetch_add(1, Ordering::Relaxed);
        let mut actor_config = self.config.actor.clone();
        if self.config.enable_cpu_affinity {
            actor_config.cpu_affinity = Some(index % num_cpus::get());
        }
        if actor_config.name.is_none() {
            actor_config.name = Some("worker".to_string());
        }

        let worker = Worker::new(self.scheduler.id(), self.config.worker.clone());
        let handle = spawn(&self.router, worker, actor_config)?;
        let id = handle.id();
        self.workers.lock().insert(id, handle);
        Ok(id)
    }

    /// Kill a worker without letting it shut down, as if its process died
    pub fn kill_worker(&self, id: ActorId) -> Result<()> {
        let handle = self.workers.lock().remove(&id);
        let mut handle = handle.ok_or(Error::ActorNotFound(id))?;
        tracing::info!(worker = id, "killing worker");
        match handle.kill() {
            Ok(()) | Err(Error::ActorNotRunning) => Ok(()),
            // A worker that already failed on its own is still gone.
            Err(e) if e.is_fatal() => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Ids of workers spawned by this cluster and not killed, ascending
    pub fn worker_ids(&self) -> Vec<ActorId> {
        let mut ids: Vec<ActorId> = self.workers.lock().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// The shared router
    pub fn router(&self) -> &Router<Message> {
        &self.router
    }

    /// Address of the scheduler
    pub fn scheduler_id(&self) -> ActorId {
        self.scheduler.id()
    }

    /// Block until the collector emits its results, or `timeout` passes
    pub fn wait(&self, timeout: Duration) -> Result<Vec<Solution>> {
        self.results.recv_timeout(timeout)
    }
}

impl Drop for Cluster {
    fn drop(&mut self) {
        self.router.stop_all();
        for (_, mut worker) in self.workers.get_mut().drain() {
            // Workers that failed fatally report it here; there is nobody left to tell.
            let _ = worker.join();
        }
        for handle in [&mut self.scheduler, &mut self.source, &mut self.collector] {
            if let Err(e) = handle.join() {
                tracing::warn!(actor = handle.id(), error = %e, "actor exited with error");
            }
        }
    }
}
