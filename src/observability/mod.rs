//! # Observability
//!
//! Structured logging for command and server events.

pub mod logger;

pub use logger::{Logger, Severity};
