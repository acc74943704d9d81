//! Record store implementations.
//!
//! Available backends:
//! - `MemoryRecordStore` - In-memory storage (tests, dry runs)
//! - `PostgresRecordStore` - PostgreSQL storage

pub mod memory;
pub mod postgres;

pub use memory::{MemoryRecordStore, MemoryTransaction};
pub use postgres::PostgresRecordStore;
