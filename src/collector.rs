//! Result collector
//!
//! Accumulates recovered passwords in arrival order. On `Finish` it sorts
//! them by line, logs each one, hands the list to its output channel and
//! stops.

use crate::actor::{Actor, Context};
use crate::channel::Sender;
use crate::error::Result;
use crate::message::Envelope;
use crate::protocol::Message;

/// One recovered password
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Solution {
    /// Input line
    pub line_id: u32,
    /// The password
    pub password: String,
}

/// Actor gathering results until `Finish`
pub struct ResultCollector {
    output: Sender<Vec<Solution>>,
}

impl ResultCollector {
    /// Collector that emits the sorted results on `output`
    pub fn new(output: Sender<Vec<Solution>>) -> Self {
        Self { output }
    }
}

impl Actor for ResultCollector {
    type State = Vec<Solution>;
    type Message = Message;

    fn init(&mut self, _ctx: &mut Context<Message>) -> Result<Vec<Solution>> {
        Ok(Vec::new())
    }

    fn handle_message(
        &mut self,
        results: &mut Vec<Solution>,
        message: Envelope<Message>,
        ctx: &mut Context<Message>,
    ) -> Result<()> {
        match message.payload {
            Message::Collect { line_id, password } => {
                tracing::debug!(line_id, "result collected");
                results.push(Solution { line_id, password });
                Ok(())
            }
            Message::Finish => {
                let mut sorted = std::mem::take(results);
                sorted.sort();
                for solution in &sorted {
                    tracing::info!(line_id = solution.line_id, password = %solution.password, "cracked");
                }
                ctx.stop();
                self.output.send(sorted)
            }
            other => {
                tracing::debug!(kind = other.kind(), "ignoring message");
                Ok(())
            }
        }
    }
}
