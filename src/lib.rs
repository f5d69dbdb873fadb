//! Mesh node telemetry collector
//!
//! Requests respondd status from mesh nodes over UDP, decodes the compressed
//! replies and merges them into a per-node registry.

pub mod aggregator;
pub mod collector;
pub mod core;
pub mod infrastructure;
pub mod pipeline;
pub mod sink;
pub mod udp;

#[cfg(test)]
pub mod test_utils;

// Re-export commonly used types
pub use collector::{Collector, Shutdown, QUEUE_CAPACITY};
pub use crate::core::{Node, NodeId, NodeRegistry, Nodes, ResponseData};
pub use infrastructure::config::{CollectorConfig, Config};
pub use sink::{LogSink, StatsSink};

use std::time::Duration;
use thiserror::Error;

/// Main error type for the collector
#[derive(Error, Debug)]
pub enum CollectorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid address '{address}': {reason}")]
    Address { address: String, reason: String },

    #[error("Collector already started")]
    AlreadyStarted,

    #[error("Invalid collector interval: {0:?}")]
    InvalidInterval(Duration),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, CollectorError>;
