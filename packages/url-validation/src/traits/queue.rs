use async_trait::async_trait;

use crate::error::QueueResult;

/// A message received from the job queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    /// Backend handle used to delete the message
    pub receipt: String,
    /// Message body, kept verbatim so it can be republished unchanged
    pub body: String,
}

impl QueueMessage {
    pub fn new(receipt: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            receipt: receipt.into(),
            body: body.into(),
        }
    }
}

/// Batch receive/delete/publish against the job queue.
#[async_trait]
pub trait QueueClient: Send + Sync {
    /// Receive at most one batch. `None` means the queue is currently empty.
    async fn receive_batch(&self) -> QueueResult<Option<QueueMessage>>;

    /// Remove a received batch from the queue.
    async fn delete_batch(&self, message: &QueueMessage) -> QueueResult<()>;

    /// Publish `message.body` as a new message.
    async fn publish_batch(&self, message: &QueueMessage) -> QueueResult<()>;
}
