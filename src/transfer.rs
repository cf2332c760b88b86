//! Chunked large-message transfer
//!
//! Payloads bigger than the transport's safe message size are serialized,
//! split into fixed-size chunks and moved stop-and-wait: the sender keeps the
//! chunk array and puts exactly one chunk in flight, advancing only when the
//! receiver acknowledges it. The receiver reassembles by index, delivers the
//! payload to its true destination with the original sender preserved, drops
//! the buffer, and only then acknowledges the final chunk.
//!
//! There is no retry. A transfer whose ack never comes back stays parked until
//! [`MessageTransfer::cancel_destination`] is called for the lost peer; a
//! half-received one from a lost peer is dropped by
//! [`MessageTransfer::cancel_origin`].
//!
//! [`MessageTransfer`] itself is a pure state machine; the `transmit` /
//! `receive_*` methods glue it to an actor [`Context`].

use crate::actor::Context;
use crate::error::{Error, Result};
use crate::message::{ActorId, Envelope};
use crate::protocol::{LargeMessage, Message};
use ahash::AHashMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Default chunk payload size: 256 KiB minus framing slack
pub const DEFAULT_CHUNK_SIZE: usize = 262_144 - 10;

/// Identifies one transfer; unique per sending endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId {
    /// Endpoint that split the payload
    pub endpoint: ActorId,
    /// Per-endpoint counter
    pub sequence: u64,
}

/// One slice of a serialized payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Transfer this chunk belongs to
    pub message_id: MessageId,
    /// Position of this chunk
    pub index: u32,
    /// Number of chunks in the transfer
    pub total: u32,
    /// Raw bytes
    pub bytes: Vec<u8>,
    /// Logical sender of the payload
    pub origin: ActorId,
    /// Logical recipient of the payload
    pub destination: ActorId,
    /// Endpoint holding the chunk array; acks go here
    pub reply_to: ActorId,
}

/// Receipt for one chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkAck {
    /// Transfer being acknowledged
    pub message_id: MessageId,
    /// Index of the chunk received
    pub index: u32,
}

/// A fully reassembled payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Transfer it arrived on
    pub message_id: MessageId,
    /// Logical sender
    pub origin: ActorId,
    /// Logical recipient
    pub destination: ActorId,
    /// Reassembled bytes
    pub bytes: Vec<u8>,
}

impl Delivery {
    /// Deserialize the payload
    pub fn decode<P: DeserializeOwned>(&self) -> Result<P> {
        Ok(bincode::deserialize(&self.bytes)?)
    }
}

struct Outgoing {
    origin: ActorId,
    destination: ActorId,
    chunks: Vec<Vec<u8>>,
    in_flight: u32,
}

struct Incoming {
    slots: Vec<Option<Vec<u8>>>,
    received: usize,
}

/// Sender and receiver state of one endpoint
pub struct MessageTransfer {
    endpoint: ActorId,
    chunk_size: usize,
    next_sequence: u64,
    outgoing: AHashMap<MessageId, Outgoing>,
    incoming: AHashMap<MessageId, Incoming>,
}

impl MessageTransfer {
    /// Transfer state for `endpoint`, splitting at `chunk_size` bytes
    pub fn new(endpoint: ActorId, chunk_size: usize) -> Self {
        Self {
            endpoint,
            chunk_size: chunk_size.max(1),
            next_sequence: 0,
            outgoing: AHashMap::new(),
            incoming: AHashMap::new(),
        }
    }

    /// Chunk size in bytes
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Transfers still waiting for an ack
    pub fn outgoing_len(&self) -> usize {
        self.outgoing.len()
    }

    /// Reassembly buffers still open
    pub fn incoming_len(&self) -> usize {
        self.incoming.len()
    }

    /// Serialize `payload` and start a transfer; returns the first chunk to put on the wire
    pub fn send<P: Serialize>(
        &mut self,
        payload: &P,
        origin: ActorId,
        destination: ActorId,
    ) -> Result<Chunk> {
        let bytes = bincode::serialize(payload)?;
        Ok(self.send_bytes(&bytes, origin, destination))
    }

    /// Start a transfer of raw bytes; returns the first chunk to put on the wire.
    ///
    /// An empty payload still produces one (empty) chunk.
    pub fn send_bytes(&mut self, bytes: &[u8], origin: ActorId, destination: ActorId) -> Chunk {
        let message_id = MessageId {
            endpoint: self.endpoint,
            sequence: self.next_sequence,
        };
        self.next_sequence += 1;

        let mut chunks: Vec<Vec<u8>> = bytes.chunks(self.chunk_size).map(<[u8]>::to_vec).collect();
        if chunks.is_empty() {
            chunks.push(Vec::new());
        }

        let outgoing = Outgoing {
            origin,
            destination,
            chunks,
            in_flight: 0,
        };
        let first = Self::chunk_at(self.endpoint, message_id, &outgoing, 0);
        tracing::debug!(
            endpoint = self.endpoint,
            sequence = message_id.sequence,
            bytes = bytes.len(),
            chunks = first.total,
            destination,
            "starting transfer"
        );
        self.outgoing.insert(message_id, outgoing);
        first
    }

    /// Handle an acknowledgment; returns the next chunk to send, if any
    pub fn on_ack(&mut self, ack: &ChunkAck) -> Option<Chunk> {
        let Some(outgoing) = self.outgoing.get_mut(&ack.message_id) else {
            tracing::debug!(endpoint = self.endpoint, ?ack, "ack for unknown transfer");
            return None;
        };
        if ack.index != outgoing.in_flight {
            tracing::debug!(
                endpoint = self.endpoint,
                ?ack,
                in_flight = outgoing.in_flight,
                "stale ack"
            );
            return None;
        }

        let next = ack.index + 1;
        if next as usize >= outgoing.chunks.len() {
            self.outgoing.remove(&ack.message_id);
            return None;
        }
        outgoing.in_flight = next;
        let outgoing = &self.outgoing[&ack.message_id];
        Some(Self::chunk_at(self.endpoint, ack.message_id, outgoing, next))
    }

    /// Store a received chunk. Returns the ack to send back and, once the
    /// final chunk is in, the reassembled payload.
    pub fn on_chunk(&mut self, chunk: Chunk) -> Result<(ChunkAck, Option<Delivery>)> {
        let Chunk {
            message_id,
            index,
            total,
            bytes,
            origin,
            destination,
            ..
        } = chunk;

        if total == 0 || index >= total {
            return Err(Error::MalformedChunk(format!(
                "chunk {} of {} for {:?}",
                index, total, message_id
            )));
        }

        let incoming = self.incoming.entry(message_id).or_insert_with(|| Incoming {
            slots: vec![None; total as usize],
            received: 0,
        });
        if incoming.slots.len() != total as usize {
            let expected = incoming.slots.len();
            self.incoming.remove(&message_id);
            return Err(Error::MalformedChunk(format!(
                "{:?} announced {} chunks, earlier chunks announced {}",
                message_id, total, expected
            )));
        }

        let slot = &mut incoming.slots[index as usize];
        if slot.is_none() {
            incoming.received += 1;
        }
        *slot = Some(bytes);

        let ack = ChunkAck { message_id, index };
        if index + 1 < total {
            return Ok((ack, None));
        }

        let Some(incoming) = self.incoming.remove(&message_id) else {
            return Ok((ack, None));
        };
        if incoming.received != incoming.slots.len() {
            return Err(Error::MalformedChunk(format!(
                "{:?} finished with {} of {} chunks",
                message_id,
                incoming.received,
                incoming.slots.len()
            )));
        }

        let bytes = incoming.slots.into_iter().flatten().flatten().collect();
        Ok((
            ack,
            Some(Delivery {
                message_id,
                origin,
                destination,
                bytes,
            }),
        ))
    }

    /// Drop every unfinished outgoing transfer aimed at `destination`
    pub fn cancel_destination(&mut self, destination: ActorId) -> usize {
        let before = self.outgoing.len();
        self.outgoing.retain(|_, t| t.destination != destination);
        before - self.outgoing.len()
    }

    /// Drop every half-reassembled transfer sent by `origin`
    pub fn cancel_origin(&mut self, origin: ActorId) -> usize {
        let before = self.incoming.len();
        self.incoming.retain(|id, _| id.endpoint != origin);
        before - self.incoming.len()
    }

    /// Send `payload` to `destination` through the chunk protocol
    pub fn transmit(
        &mut self,
        ctx: &Context<Message>,
        payload: &LargeMessage,
        destination: ActorId,
    ) -> Result<()> {
        let chunk = self.send(payload, ctx.id(), destination)?;
        let message_id = chunk.message_id;
        if let Err(e) = ctx.send(destination, Message::Chunk(chunk)) {
            self.outgoing.remove(&message_id);
            return Err(e);
        }
        Ok(())
    }

    /// Handle a chunk addressed to this endpoint: deliver when complete, then ack
    pub fn receive_chunk(&mut self, ctx: &Context<Message>, chunk: Chunk) -> Result<()> {
        let reply_to = chunk.reply_to;
        let (ack, delivery) = self.on_chunk(chunk)?;

        let mut outcome = Ok(());
        if let Some(delivery) = delivery {
            outcome = delivery.decode::<LargeMessage>().and_then(|large| {
                let envelope = Envelope::new(Message::from(large)).with_source(delivery.origin);
                ctx.forward(delivery.destination, envelope)
            });
        }

        ctx.send(reply_to, Message::ChunkAck(ack))?;
        outcome
    }

    /// Handle an ack addressed to this endpoint: put the next chunk on the wire
    pub fn receive_ack(&mut self, ctx: &Context<Message>, ack: ChunkAck) -> Result<()> {
        let Some(next) = self.on_ack(&ack) else {
            return Ok(());
        };
        if let Err(e) = ctx.send(next.destination, Message::Chunk(next)) {
            self.outgoing.remove(&ack.message_id);
            return Err(e);
        }
        Ok(())
    }

    fn chunk_at(endpoint: ActorId, message_id: MessageId, outgoing: &Outgoing, index: u32) -> Chunk {
        Chunk {
            message_id,
            index,
            total: outgoing.chunks.len() as u32,
            bytes: outgoing.chunks[index as usize].clone(),
            origin: outgoing.origin,
            destination: outgoing.destination,
            reply_to: endpoint,
        }
    }
}
