//! Queue client implementations.
//!
//! Available backends:
//! - `MemoryQueue` - In-memory FIFO (tests)
//! - `PostgresQueue` - `queue_message` table in PostgreSQL
//! - `SqsQueue` - Amazon SQS (requires `sqs` feature)

pub mod memory;
pub mod postgres;

#[cfg(feature = "sqs")]
pub mod sqs;

pub use memory::MemoryQueue;
pub use postgres::PostgresQueue;

#[cfg(feature = "sqs")]
pub use sqs::SqsQueue;
