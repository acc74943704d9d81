//! Amazon SQS job queue.

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_sqs::Client;
use tracing::{debug, info};

use crate::error::{QueueError, QueueResult};
use crate::traits::queue::{QueueClient, QueueMessage};

/// A [`QueueClient`] talking to one SQS queue.
pub struct SqsQueue {
    client: Client,
    queue_url: String,
}

impl SqsQueue {
    /// Wrap an existing client and queue URL.
    pub fn new(client: Client, queue_url: impl Into<String>) -> Self {
        Self {
            client,
            queue_url: queue_url.into(),
        }
    }

    /// Connect with the default AWS credential chain and look the queue up by name.
    pub async fn connect(queue_name: &str, region: Option<String>) -> QueueResult<Self> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region));
        }
        let config = loader.load().await;
        let client = Client::new(&config);

        let output = client
            .get_queue_url()
            .queue_name(queue_name)
            .send()
            .await
            .map_err(QueueError::backend)?;
        let queue_url = output
            .queue_url()
            .ok_or_else(|| QueueError::MalformedMessage {
                reason: format!("no URL returned for queue {queue_name}"),
            })?
            .to_string();

        info!(queue = %queue_name, region = ?config.region(), "Connected to SQS");
        Ok(Self::new(client, queue_url))
    }

    pub fn queue_url(&self) -> &str {
        &self.queue_url
    }
}

#[async_trait]
impl QueueClient for SqsQueue {
    async fn receive_batch(&self) -> QueueResult<Option<QueueMessage>> {
        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(1)
            .send()
            .await
            .map_err(QueueError::backend)?;

        let Some(message) = output.messages().first() else {
            return Ok(None);
        };

        let receipt = message
            .receipt_handle()
            .ok_or_else(|| QueueError::MalformedMessage {
                reason: "message has no receipt handle".to_string(),
            })?;
        let body = message.body().unwrap_or_default();
        debug!(message_id = ?message.message_id(), "Received message");

        Ok(Some(QueueMessage::new(receipt, body)))
    }

    async fn delete_batch(&self, message: &QueueMessage) -> QueueResult<()> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(&message.receipt)
            .send()
            .await
            .map_err(QueueError::backend)?;
        Ok(())
    }

    async fn publish_batch(&self, message: &QueueMessage) -> QueueResult<()> {
        let output = self
            .client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(&message.body)
            .send()
            .await
            .map_err(QueueError::backend)?;
        debug!(message_id = ?output.message_id(), "Published message");
        Ok(())
    }
}
