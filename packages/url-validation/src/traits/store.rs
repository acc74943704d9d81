use async_trait::async_trait;

use crate::error::StoreResult;
use crate::types::{ErrorRecord, JobContext, PersistOutcome, ValidationResult};

/// Durable sink for validation results and error records.
///
/// All writes go through an explicit transaction. Nothing written inside a
/// transaction is visible until [`RecordStore::commit`].
#[async_trait]
pub trait RecordStore: Send + Sync {
    type Transaction: Send;

    // Transaction support
    async fn begin(&self) -> StoreResult<Self::Transaction>;
    async fn commit(&self, tx: Self::Transaction) -> StoreResult<()>;
    async fn rollback(&self, tx: Self::Transaction) -> StoreResult<()>;

    /// Write a validation result to the destination chosen by `context`.
    ///
    /// For project jobs this is an idempotent insert into `url` (first writer
    /// wins) plus an unconditional insert into `url_history`. For tweet jobs
    /// it is an idempotent insert into `tweet_url`.
    async fn persist(
        &self,
        tx: &mut Self::Transaction,
        context: &JobContext,
        result: &ValidationResult,
    ) -> StoreResult<PersistOutcome>;

    /// Append an error record.
    async fn record_error(
        &self,
        tx: &mut Self::Transaction,
        record: &ErrorRecord,
    ) -> StoreResult<()>;
}
