//! PostgreSQL-backed job queue.
//!
//! Messages live in `queue_message`. Receiving a message hides it for a
//! visibility timeout instead of deleting it, so a consumer that dies between
//! receive and delete does not lose the message.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use tracing::{debug, info};

use crate::error::{QueueError, QueueResult};
use crate::traits::queue::{QueueClient, QueueMessage};

/// Default time a received message stays hidden from other consumers.
pub const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(30);

/// A named queue stored in Postgres.
pub struct PostgresQueue {
    pool: PgPool,
    queue: String,
    visibility_timeout: Duration,
}

impl PostgresQueue {
    pub fn new(pool: PgPool, queue: impl Into<String>) -> Self {
        Self {
            pool,
            queue: queue.into(),
            visibility_timeout: DEFAULT_VISIBILITY_TIMEOUT,
        }
    }

    pub fn with_visibility_timeout(mut self, timeout: Duration) -> Self {
        self.visibility_timeout = timeout;
        self
    }

    pub fn name(&self) -> &str {
        &self.queue
    }

    /// Create the `queue_message` table if it does not exist yet.
    pub async fn ensure_schema(&self) -> QueueResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS queue_message (
                id BIGSERIAL PRIMARY KEY,
                queue TEXT NOT NULL,
                body TEXT NOT NULL,
                visible_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                enqueued_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS queue_message_ready_idx ON queue_message (queue, visible_at, id)",
        )
        .execute(&self.pool)
        .await?;

        info!(queue = %self.queue, "Queue schema ready");
        Ok(())
    }

    /// Number of messages in this queue, visible or not.
    pub async fn len(&self) -> QueueResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM queue_message WHERE queue = $1")
            .bind(&self.queue)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn is_empty(&self) -> QueueResult<bool> {
        Ok(self.len().await? == 0)
    }

    /// Enqueue a raw body.
    pub async fn send(&self, body: &str) -> QueueResult<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO queue_message (queue, body) VALUES ($1, $2) RETURNING id",
        )
        .bind(&self.queue)
        .bind(body)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }
}

#[async_trait]
impl QueueClient for PostgresQueue {
    async fn receive_batch(&self) -> QueueResult<Option<QueueMessage>> {
        let visibility_secs = self.visibility_timeout.as_secs_f64();
        let row = sqlx::query_as::<_, (i64, String)>(
            r#"
            UPDATE queue_message
            SET visible_at = NOW() + make_interval(secs => $2)
            WHERE id = (
                SELECT id FROM queue_message
                WHERE queue = $1 AND visible_at <= NOW()
                ORDER BY id
                FOR UPDATE SKIP LOCKED
                LIMIT 1
            )
            RETURNING id, body
            "#,
        )
        .bind(&self.queue)
        .bind(visibility_secs)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, body)| {
            debug!(queue = %self.queue, message_id = id, "Received message");
            QueueMessage::new(id.to_string(), body)
        }))
    }

    async fn delete_batch(&self, message: &QueueMessage) -> QueueResult<()> {
        let id: i64 = message
            .receipt
            .parse()
            .map_err(|_| QueueError::MalformedMessage {
                reason: format!("receipt {:?} is not a message id", message.receipt),
            })?;

        sqlx::query("DELETE FROM queue_message WHERE id = $1 AND queue = $2")
            .bind(id)
            .bind(&self.queue)
            .execute(&self.pool)
            .await?;
        debug!(queue = %self.queue, message_id = id, "Deleted message");
        Ok(())
    }

    async fn publish_batch(&self, message: &QueueMessage) -> QueueResult<()> {
        let id = self.send(&message.body).await?;
        debug!(queue = %self.queue, message_id = id, "Published message");
        Ok(())
    }
}
