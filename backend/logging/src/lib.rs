//! Structured logging for the command bridge.
//!
//! Console output, optional daily-rolling NDJSON files, and the dispatch
//! audit events written by the executor.

pub mod event_logger;
pub mod logger;

pub use event_logger::{DispatchEvent, DispatchLogEntry, EventLogger};
pub use logger::init_logger;
