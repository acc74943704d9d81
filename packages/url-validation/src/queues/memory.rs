//! In-memory FIFO queue for tests.

use std::collections::VecDeque;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::QueueResult;
use crate::traits::queue::{QueueClient, QueueMessage};

#[derive(Debug, Default)]
struct State {
    pending: VecDeque<QueueMessage>,
    in_flight: Vec<QueueMessage>,
    published: Vec<String>,
    next_receipt: u64,
}

/// A [`QueueClient`] backed by a `VecDeque`.
///
/// Received messages stay in flight until deleted. Published bodies are
/// appended to the queue and also recorded for assertions.
#[derive(Debug, Default)]
pub struct MemoryQueue {
    state: RwLock<State>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a queue pre-loaded with the given message bodies.
    pub fn with_bodies<I, S>(bodies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let queue = Self::new();
        for body in bodies {
            queue.push(body);
        }
        queue
    }

    /// Enqueue a body.
    pub fn push(&self, body: impl Into<String>) {
        let mut state = self.state.write().unwrap();
        state.next_receipt += 1;
        let receipt = format!("memory-{}", state.next_receipt);
        state.pending.push_back(QueueMessage::new(receipt, body));
    }

    /// Bodies waiting to be received.
    pub fn pending_bodies(&self) -> Vec<String> {
        self.state
            .read()
            .unwrap()
            .pending
            .iter()
            .map(|message| message.body.clone())
            .collect()
    }

    /// Messages received but not yet deleted.
    pub fn in_flight(&self) -> Vec<QueueMessage> {
        self.state.read().unwrap().in_flight.clone()
    }

    /// Every body passed to `publish_batch`, in order.
    pub fn published(&self) -> Vec<String> {
        self.state.read().unwrap().published.clone()
    }
}

#[async_trait]
impl QueueClient for MemoryQueue {
    async fn receive_batch(&self) -> QueueResult<Option<QueueMessage>> {
        let mut state = self.state.write().unwrap();
        let message = state.pending.pop_front();
        if let Some(message) = &message {
            state.in_flight.push(message.clone());
        }
        Ok(message)
    }

    async fn delete_batch(&self, message: &QueueMessage) -> QueueResult<()> {
        self.state
            .write()
            .unwrap()
            .in_flight
            .retain(|m| m.receipt != message.receipt);
        Ok(())
    }

    async fn publish_batch(&self, message: &QueueMessage) -> QueueResult<()> {
        self.state.write().unwrap().published.push(message.body.clone());
        self.push(message.body.clone());
        Ok(())
    }
}
