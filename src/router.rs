//! Address directory and death-watch
//!
//! The router maps an [`ActorId`] to the actor's mailbox. It is the only
//! structure shared between actor threads and it holds no application
//! state: senders are cloned out of the lock before anything is delivered.
//!
//! Liveness is signalled by death-watch. When an actor's thread exits, for
//! whatever reason, every watcher receives [`Terminated`] in its mailbox.

use crate::channel::{ChannelStats, Sender};
use crate::error::{Error, Result};
use crate::message::{ActorId, ControlMessage, Envelope, Terminated};
use ahash::{AHashMap, AHashSet};
use parking_lot::RwLock;
use std::sync::Arc;

pub(crate) struct Mailbox<M> {
    name: String,
    messages: Sender<Envelope<M>>,
    control: Sender<ControlMessage>,
    watchers: AHashSet<ActorId>,
}

impl<M> Mailbox<M> {
    pub(crate) fn new(
        name: String,
        messages: Sender<Envelope<M>>,
        control: Sender<ControlMessage>,
    ) -> Self {
        Self {
            name,
            messages,
            control,
            watchers: AHashSet::new(),
        }
    }
}

/// Shared directory of live actors
pub struct Router<M> {
    mailboxes: Arc<RwLock<AHashMap<ActorId, Mailbox<M>>>>,
}

impl<M> Clone for Router<M> {
    fn clone(&self) -> Self {
        Self {
            mailboxes: Arc::clone(&self.mailboxes),
        }
    }
}

impl<M> Default for Router<M>
where
    M: From<Terminated> + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<M> Router<M>
where
    M: From<Terminated> + Send + 'static,
{
    /// Create an empty router
    pub fn new() -> Self {
        Self {
            mailboxes: Arc::new(RwLock::new(AHashMap::new())),
        }
    }

    /// Deliver an envelope to `target`
    pub fn send(&self, target: ActorId, envelope: Envelope<M>) -> Result<()> {
        let tx = self
            .mailboxes
            .read()
            .get(&target)
            .map(|mailbox| mailbox.messages.clone())
            .ok_or(Error::ActorNotFound(target))?;
        tx.send(envelope.with_target(target))
    }

    /// Deliver `message` to `to`, stamped as coming from `from`
    pub fn tell(&self, from: ActorId, to: ActorId, message: M) -> Result<()> {
        self.send(to, Envelope::new(message).with_source(from))
    }

    /// Subscribe `watcher` to the termination of `target`.
    ///
    /// If `target` is already gone the notification is delivered immediately.
    pub fn watch(&self, watcher: ActorId, target: ActorId) -> Result<()> {
        {
            let mut mailboxes = self.mailboxes.write();
            if let Some(mailbox) = mailboxes.get_mut(&target) {
                mailbox.watchers.insert(watcher);
                return Ok(());
            }
        }
        self.send(
            watcher,
            Envelope::new(M::from(Terminated(target))).with_source(target),
        )
    }

    /// Cancel a previous [`watch`](Self::watch)
    pub fn unwatch(&self, watcher: ActorId, target: ActorId) {
        if let Some(mailbox) = self.mailboxes.write().get_mut(&target) {
            mailbox.watchers.remove(&watcher);
        }
    }

    /// Ask an actor to stop after its current message
    pub fn stop(&self, id: ActorId) -> Result<()> {
        self.control(id, ControlMessage::Stop)
    }

    /// Make an actor exit immediately, skipping its shutdown hook
    pub fn kill(&self, id: ActorId) -> Result<()> {
        self.control(id, ControlMessage::Kill)
    }

    /// Stop every registered actor
    pub fn stop_all(&self) {
        for id in self.ids() {
            // An actor may exit on its own between listing and stopping.
            let _ = self.stop(id);
        }
    }

    /// Whether a mailbox is registered for `id`
    pub fn contains(&self, id: ActorId) -> bool {
        self.mailboxes.read().contains_key(&id)
    }

    /// Name the actor was spawned with
    pub fn name_of(&self, id: ActorId) -> Option<String> {
        self.mailboxes.read().get(&id).map(|m| m.name.clone())
    }

    /// Number of live actors
    pub fn len(&self) -> usize {
        self.mailboxes.read().len()
    }

    /// Whether no actors are live
    pub fn is_empty(&self) -> bool {
        self.mailboxes.read().is_empty()
    }

    /// Ids of all live actors
    pub fn ids(&self) -> Vec<ActorId> {
        self.mailboxes.read().keys().copied().collect()
    }

    /// Mailbox statistics for a live actor
    pub fn stats(&self, id: ActorId) -> Option<Arc<ChannelStats>> {
        self.mailboxes.read().get(&id).map(|m| m.messages.stats())
    }

    fn control(&self, id: ActorId, control: ControlMessage) -> Result<()> {
        let tx = self
            .mailboxes
            .read()
            .get(&id)
            .map(|mailbox| mailbox.control.clone())
            .ok_or(Error::ActorNotFound(id))?;
        tx.send(control)
    }

    pub(crate) fn register(&self, id: ActorId, mailbox: Mailbox<M>) {
        self.mailboxes.write().insert(id, mailbox);
    }

    /// Remove `id` and notify its watchers.
    pub(crate) fn deregister(&self, id: ActorId) {
        let removed = self.mailboxes.write().remove(&id);
        let Some(mailbox) = removed else {
            return;
        };
        tracing::debug!(actor = id, name = %mailbox.name, watchers = mailbox.watchers.len(), "actor terminated");
        for watcher in mailbox.watchers {
            if let Err(e) = self.tell(id, watcher, M::from(Terminated(id))) {
                tracing::debug!(actor = id, watcher, error = %e, "watcher already gone");
            }
        }
    }
}
