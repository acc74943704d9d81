//! Typed errors for the URL validation pipeline.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so the consumer can tell
//! recoverable per-job conditions apart from batch-fatal ones.

use std::error::Error as StdError;

use thiserror::Error;

/// Errors raised by a [`RecordStore`](crate::traits::store::RecordStore).
///
/// Every storage error is fatal for the batch being processed.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database driver failure (connection, constraint, syntax)
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A value could not be encoded for storage
    #[error("encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// Backend is unavailable (used by non-SQL stores)
    #[error("store unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Errors raised by a [`QueueClient`](crate::traits::queue::QueueClient).
#[derive(Debug, Error)]
pub enum QueueError {
    /// Postgres-backed queue failure
    #[error("queue database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Messaging backend failure (SQS, in-memory fault)
    #[error("queue backend error: {0}")]
    Backend(#[source] Box<dyn StdError + Send + Sync>),

    /// A received message is missing a required attribute
    #[error("malformed queue message: {reason}")]
    MalformedMessage { reason: String },
}

impl QueueError {
    pub fn backend<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::Backend(Box::new(error))
    }
}

/// Errors raised by the [`ConsumerLoop`](crate::consumer::ConsumerLoop).
#[derive(Debug, Error)]
pub enum ConsumerError {
    /// Storage fault while processing a job
    #[error("storage failure: {0}")]
    Store(#[from] StoreError),

    /// Queue fault while polling, deleting or republishing
    #[error("queue failure: {0}")]
    Queue(#[from] QueueError),

    /// Batch body or one of its jobs could not be decoded
    #[error("malformed payload: {reason}")]
    MalformedPayload { reason: String },

    /// A batch failed, was recorded and requeued; the process should stop
    #[error("batch failed and was requeued: {source}")]
    BatchFailed {
        #[source]
        source: Box<ConsumerError>,
    },
}

impl ConsumerError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedPayload {
            reason: reason.into(),
        }
    }
}

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result type alias for queue operations.
pub type QueueResult<T> = std::result::Result<T, QueueError>;

/// Result type alias for consumer operations.
pub type Result<T> = std::result::Result<T, ConsumerError>;

/// Render an error and its whole `source()` chain, one cause per line.
///
/// This is the text stored in the `error` column of error records.
pub fn error_trace(error: &(dyn StdError + 'static)) -> String {
    let mut trace = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        trace.push_str("\nCaused by: ");
        trace.push_str(&cause.to_string());
        source = cause.source();
    }
    trace
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_includes_every_cause() {
        let inner = StoreError::Unavailable {
            reason: "connection reset".to_string(),
        };
        let outer = ConsumerError::BatchFailed {
            source: Box::new(ConsumerError::Store(inner)),
        };

        let trace = error_trace(&outer);
        let lines: Vec<&str> = trace.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("batch failed and was requeued"));
        assert_eq!(lines[2], "Caused by: store unavailable: connection reset");
    }
}
