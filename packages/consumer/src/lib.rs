//! Process wiring for the URL validation consumer.
//!
//! The pipeline itself lives in `url_validation`; this crate loads
//! configuration, sets up logging, discovers the source IP and connects the
//! queue backend.

pub mod config;
pub mod source_ip;
pub mod telemetry;

pub use config::{Config, QueueBackend};
