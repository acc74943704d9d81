//! Queue-driven URL validation.
//!
//! Consumes batches of "check this URL" jobs, resolves each URL over HTTP
//! (following redirects), classifies the outcome and records the result, its
//! redirect history and any failures.
//!
//! # Usage
//!
//! ```rust,ignore
//! use url_validation::{ConsumerConfig, ConsumerLoop, HttpValidator, PostgresQueue, PostgresRecordStore};
//!
//! let store = PostgresRecordStore::new(pool.clone());
//! let queue = PostgresQueue::new(pool, "url_validation");
//! let consumer = ConsumerLoop::new(queue, HttpValidator::new()?, store, ConsumerConfig::new(ip));
//!
//! let summary = consumer.run().await?;
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Collaborator abstractions (UrlValidator, RecordStore, QueueClient)
//! - [`types`] - Jobs, validation results and stored rows
//! - [`validator`] - HTTP validator
//! - [`stores`] - Record stores (MemoryRecordStore, PostgresRecordStore)
//! - [`queues`] - Queue clients (MemoryQueue, PostgresQueue, SqsQueue)
//! - [`consumer`] - The consume → validate → persist → recover loop
//! - [`testing`] - Mock implementations for testing

pub mod consumer;
pub mod error;
pub mod queues;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;
pub mod validator;

// Re-export core types at crate root
pub use consumer::{ConsumerConfig, ConsumerLoop, RunSummary};
pub use error::{error_trace, ConsumerError, QueueError, StoreError};
pub use queues::{MemoryQueue, PostgresQueue};
pub use stores::{MemoryRecordStore, PostgresRecordStore};
pub use traits::{
    queue::{QueueClient, QueueMessage},
    store::RecordStore,
    validator::UrlValidator,
};
pub use types::{
    DomainParts, ErrorRecord, JobBatch, JobContext, JobKind, Outcome, PendingJob, PersistOutcome,
    RedirectHop, Tweet, TweetJob, UrlComponents, UrlJob, ValidationResult,
};
pub use validator::{HttpValidator, HttpValidatorConfig};

#[cfg(feature = "sqs")]
pub use queues::SqsQueue;
