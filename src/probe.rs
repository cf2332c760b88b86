//! Diagnostic actor that hands every envelope it receives to a channel.
//!
//! A probe gives a plain thread an address on the router, which is how tests
//! stand in for a source, a collector or a worker.

use crate::actor::{spawn, Actor, ActorConfig, ActorHandle, Context};
use crate::channel::{Channel, Receiver, Sender};
use crate::error::Result;
use crate::message::{Envelope, Terminated};
use crate::router::Router;

/// Forwards envelopes to its output channel
pub struct Probe<M> {
    output: Sender<Envelope<M>>,
}

impl<M> Probe<M> {
    /// Probe writing to `output`
    pub fn new(output: Sender<Envelope<M>>) -> Self {
        Self { output }
    }
}

impl<M> Actor for Probe<M>
where
    M: From<Terminated> + Send + 'static,
{
    type State = ();
    type Message = M;

    fn init(&mut self, _ctx: &mut Context<M>) -> Result<()> {
        Ok(())
    }

    fn handle_message(
        &mut self,
        _state: &mut (),
        message: Envelope<M>,
        _ctx: &mut Context<M>,
    ) -> Result<()> {
        self.output.send(message)
    }
}

/// Spawn a probe named `name` and return its handle and inbox
pub fn spawn_probe<M>(router: &Router<M>, name: &str) -> Result<(ActorHandle<M>, Receiver<Envelope<M>>)>
where
    M: From<Terminated> + Send + 'static,
{
    let (tx, rx) = Channel::mpsc_unbounded();
    let handle = spawn(router, Probe::new(tx), ActorConfig::new().with_name(name))?;
    Ok((handle, rx))
}
