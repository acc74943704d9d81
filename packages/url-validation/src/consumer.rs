//! The queue-draining consumer loop.
//!
//! ```text
//! ConsumerLoop::run
//!     │
//!     ├─► receive_batch ──► None ──► done (queue drained)
//!     ├─► delete_batch (before any processing)
//!     └─► for each job
//!             ├─► validate
//!             ├─► 600? record_error + commit
//!             └─► persist + commit
//!
//! receive/delete failure: record error, stop
//! any other failure: rollback, record batch error, republish whole batch, stop
//! ```

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::error::{error_trace, ConsumerError, Result, StoreResult};
use crate::traits::queue::{QueueClient, QueueMessage};
use crate::traits::store::RecordStore;
use crate::traits::validator::UrlValidator;
use crate::types::{ErrorRecord, JobBatch, JobKind, Outcome, PendingJob, PersistOutcome, ValidationResult};

/// Request timeout for project URL batches.
pub const DEFAULT_URL_TIMEOUT: Duration = Duration::from_secs(15);

/// Request timeout for tweet bundles.
pub const DEFAULT_TWEET_TIMEOUT: Duration = Duration::from_secs(5);

/// Runtime settings for [`ConsumerLoop`].
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    pub url_timeout: Duration,
    pub tweet_timeout: Duration,
    /// Public address written on every error record
    pub source_ip: String,
}

impl ConsumerConfig {
    pub fn new(source_ip: impl Into<String>) -> Self {
        Self {
            url_timeout: DEFAULT_URL_TIMEOUT,
            tweet_timeout: DEFAULT_TWEET_TIMEOUT,
            source_ip: source_ip.into(),
        }
    }

    pub fn with_url_timeout(mut self, timeout: Duration) -> Self {
        self.url_timeout = timeout;
        self
    }

    pub fn with_tweet_timeout(mut self, timeout: Duration) -> Self {
        self.tweet_timeout = timeout;
        self
    }

    pub fn timeout_for(&self, kind: JobKind) -> Duration {
        match kind {
            JobKind::Url => self.url_timeout,
            JobKind::Tweet => self.tweet_timeout,
        }
    }
}

/// Counters for a completed [`ConsumerLoop::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub batches: usize,
    pub jobs: usize,
    pub transport_failures: usize,
    pub scheme_rejections: usize,
}

/// Drains the queue, validating and persisting every job.
///
/// Single-threaded by construction: one job at a time, one transaction per
/// job. Collaborators are injected so the loop can run against fakes.
pub struct ConsumerLoop<Q, V, S> {
    queue: Q,
    validator: V,
    store: S,
    config: ConsumerConfig,
}

impl<Q, V, S> ConsumerLoop<Q, V, S>
where
    Q: QueueClient,
    V: UrlValidator,
    S: RecordStore,
{
    pub fn new(queue: Q, validator: V, store: S, config: ConsumerConfig) -> Self {
        Self {
            queue,
            validator,
            store,
            config,
        }
    }

    pub fn queue(&self) -> &Q {
        &self.queue
    }

    pub fn validator(&self) -> &V {
        &self.validator
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &ConsumerConfig {
        &self.config
    }

    pub fn into_parts(self) -> (Q, V, S) {
        (self.queue, self.validator, self.store)
    }

    /// Process batches until the queue is observed empty.
    ///
    /// Returns [`ConsumerError::BatchFailed`] after a batch failure has been
    /// recorded and the batch republished. Receive and delete failures are
    /// recorded and returned as [`ConsumerError::Queue`]. The caller is
    /// expected to exit.
    pub async fn run(&self) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        loop {
            let received = match self.queue.receive_batch().await {
                Ok(received) => received,
                Err(error) => {
                    let error = self
                        .record_queue_failure(Value::Null, JobKind::Url, error.into())
                        .await;
                    return Err(error);
                }
            };
            let Some(message) = received else {
                info!(
                    batches = summary.batches,
                    jobs = summary.jobs,
                    "No more messages"
                );
                return Ok(summary);
            };

            // Deleted up front; failures are compensated by republishing
            if let Err(error) = self.queue.delete_batch(&message).await {
                let kind = JobBatch::decode(&message.body)
                    .map(|batch| batch.kind())
                    .unwrap_or(JobKind::Url);
                let payload = batch_payload(&message.body);
                return Err(self.record_queue_failure(payload, kind, error.into()).await);
            }

            let span = info_span!("batch", receipt = %message.receipt);
            self.process_batch(&message, &mut summary)
                .instrument(span)
                .await?;
            summary.batches += 1;
        }
    }

    /// Process one already-deleted batch, recovering on failure.
    pub async fn process_batch(&self, message: &QueueMessage, summary: &mut RunSummary) -> Result<()> {
        let (kind, processed) = match JobBatch::decode(&message.body) {
            Ok(batch) => {
                info!(jobs = batch.len(), kind = ?batch.kind(), "Message received");
                (batch.kind(), self.process_jobs(&batch, summary).await)
            }
            Err(error) => (JobKind::Url, Err(error)),
        };

        match processed {
            Ok(()) => Ok(()),
            Err(error) => Err(self.recover(message, kind, error).await),
        }
    }

    async fn process_jobs(&self, batch: &JobBatch, summary: &mut RunSummary) -> Result<()> {
        let kind = batch.kind();
        let timeout = self.config.timeout_for(kind);

        for index in 0..batch.len() {
            let job = batch.job(index)?;
            info!(url = %job.url, context = ?job.context, "Accessing URL");

            let result = self.validator.validate(&job.url, timeout).await;

            match &result.outcome {
                Outcome::SchemeRejected => summary.scheme_rejections += 1,
                Outcome::TransportFailed { trace } => {
                    summary.transport_failures += 1;
                    let record = ErrorRecord::new(
                        job.payload.clone(),
                        trace.clone(),
                        kind.internal_module_tag(),
                        &self.config.source_ip,
                    );
                    self.commit_error(&record).await?;
                    info!(url = %job.url, "Saved record with error information");
                }
                Outcome::Http { .. } => {}
            }

            let outcome = self.commit_result(&job, &result).await?;
            debug!(
                final_url = %result.final_url,
                status = result.status_code(),
                inserted = outcome.inserted,
                "Committed job"
            );
            summary.jobs += 1;
        }

        Ok(())
    }

    /// Persist one job's result in its own transaction.
    async fn commit_result(&self, job: &PendingJob, result: &ValidationResult) -> Result<PersistOutcome> {
        let mut tx = self.store.begin().await?;
        match self.store.persist(&mut tx, &job.context, result).await {
            Ok(outcome) => {
                self.store.commit(tx).await?;
                Ok(outcome)
            }
            Err(error) => {
                if let Err(rollback_error) = self.store.rollback(tx).await {
                    warn!(error = %rollback_error, "Rollback failed");
                }
                Err(error.into())
            }
        }
    }

    async fn commit_error(&self, record: &ErrorRecord) -> StoreResult<()> {
        let mut tx = self.store.begin().await?;
        if let Err(error) = self.store.record_error(&mut tx, record).await {
            if let Err(rollback_error) = self.store.rollback(tx).await {
                warn!(error = %rollback_error, "Rollback failed");
            }
            return Err(error);
        }
        self.store.commit(tx).await
    }

    /// Record a receive or delete failure. Nothing is republished since the
    /// message is either absent or still on the queue.
    async fn record_queue_failure(&self, payload: Value, kind: JobKind, error: ConsumerError) -> ConsumerError {
        error!(error = %error, "Queue operation failed");

        let record = ErrorRecord::new(
            payload,
            error_trace(&error),
            kind.module_tag(),
            &self.config.source_ip,
        );
        match self.commit_error(&record).await {
            Ok(()) => info!("Saved record with error information"),
            Err(store_error) => error!(error = %store_error, "Failed to save queue error record"),
        }
        error
    }

    /// Record the failure against the whole batch and put the batch back.
    async fn recover(&self, message: &QueueMessage, kind: JobKind, error: ConsumerError) -> ConsumerError {
        error!(error = %error, "Batch failed");

        let record = ErrorRecord::new(
            batch_payload(&message.body),
            error_trace(&error),
            kind.module_tag(),
            &self.config.source_ip,
        );
        match self.commit_error(&record).await {
            Ok(()) => info!("Saved record with error information"),
            Err(store_error) => error!(error = %store_error, "Failed to save batch error record"),
        }

        match self.queue.publish_batch(message).await {
            Ok(()) => info!("Enqueued batch after exception"),
            Err(queue_error) => error!(error = %queue_error, "Failed to requeue batch"),
        }

        ConsumerError::BatchFailed {
            source: Box::new(error),
        }
    }
}

// Undecodable bodies are kept as a JSON string.
fn batch_payload(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}
