#![allow(dead_code)]

use hashcrack::actor::ActorHandle;
use hashcrack::channel::Receiver;
use hashcrack::probe::spawn_probe;
use hashcrack::transfer::{MessageTransfer, DEFAULT_CHUNK_SIZE};
use hashcrack::{sha256_hex, ActorId, Envelope, LargeMessage, Message, Record, Router};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

pub const WAIT: Duration = Duration::from_secs(10);

/// Input row for `password` over `alphabet`, with one hint for every
/// alphabet character the password does not use.
pub fn record(line_id: u32, alphabet: &str, password: &str) -> Record {
    let mut row = vec![
        line_id.to_string(),
        format!("user{}", line_id),
        alphabet.to_string(),
        password.chars().count().to_string(),
        sha256_hex(password),
    ];
    for missing in alphabet.chars().filter(|c| !password.contains(*c)) {
        let rest: String = alphabet.chars().rev().filter(|c| *c != missing).collect();
        row.push(sha256_hex(&rest));
    }
    row
}

/// A probe driven from the test thread. It speaks the chunk protocol, so it
/// can stand in for a worker, a scheduler, a source or a collector.
pub struct Endpoint {
    pub router: Router<Message>,
    pub handle: ActorHandle<Message>,
    inbox: Receiver<Envelope<Message>>,
    transfer: MessageTransfer,
    stash: VecDeque<Envelope<Message>>,
}

impl Endpoint {
    pub fn spawn(router: &Router<Message>, name: &str) -> Self {
        let (handle, inbox) = spawn_probe(router, name).unwrap();
        let transfer = MessageTransfer::new(handle.id(), DEFAULT_CHUNK_SIZE);
        Self {
            router: router.clone(),
            handle,
            inbox,
            transfer,
            stash: VecDeque::new(),
        }
    }

    pub fn id(&self) -> ActorId {
        self.handle.id()
    }

    pub fn send(&self, to: ActorId, message: Message) {
        self.router.tell(self.id(), to, message).unwrap();
    }

    pub fn send_large(&mut self, to: ActorId, message: LargeMessage) {
        let chunk = self.transfer.send(&message, self.id(), to).unwrap();
        self.send(to, Message::Chunk(chunk));
    }

    /// Next message other than chunk traffic. Chunks are acked and
    /// reassembled; a completed large message is returned with its origin
    /// as source.
    pub fn next(&mut self) -> Envelope<Message> {
        self.try_next(WAIT).expect("no message arrived in time")
    }

    pub fn try_next(&mut self, timeout: Duration) -> Option<Envelope<Message>> {
        if let Some(envelope) = self.stash.pop_front() {
            return Some(envelope);
        }
        loop {
            let envelope = self.inbox.recv_timeout(timeout).ok()?;
            match envelope.payload {
                Message::Chunk(chunk) => {
                    let reply_to = chunk.reply_to;
                    let (ack, delivery) = self.transfer.on_chunk(chunk).unwrap();
                    self.send(reply_to, Message::ChunkAck(ack));
                    if let Some(delivery) = delivery {
                        let large: LargeMessage = delivery.decode().unwrap();
                        return Some(Envelope::new(Message::from(large)).with_source(delivery.origin));
                    }
                }
                Message::ChunkAck(ack) => {
                    if let Some(next) = self.transfer.on_ack(&ack) {
                        self.send(next.destination, Message::Chunk(next));
                    }
                }
                _ => return Some(envelope),
            }
        }
    }

    /// Wait for the first message matching `want`; anything received
    /// before it is handed out again by later calls.
    pub fn next_matching(&mut self, want: impl Fn(&Message) -> bool) -> Envelope<Message> {
        let mut skipped = Vec::new();
        let found = loop {
            let envelope = self.next();
            if want(&envelope.payload) {
                break envelope;
            }
            skipped.push(envelope);
        };
        self.stash.extend(skipped);
        found
    }

    /// Assert nothing but chunk traffic arrives for `period`
    pub fn expect_quiet(&mut self, period: Duration) {
        if let Some(envelope) = self.try_next(period) {
            panic!("unexpected {:?}", envelope.payload.kind());
        }
    }
}

/// Poll until `id` has left the router
pub fn wait_gone(router: &Router<Message>, id: ActorId) -> bool {
    let deadline = Instant::now() + WAIT;
    while router.contains(id) {
        if Instant::now() > deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    true
}
