//! Infrastructure
//!
//! Non-pipeline concerns:
//! - Configuration
//! - Logging
//! - Metrics

pub mod config;
pub mod logging;
pub mod metrics;

pub use metrics::{CollectorMetrics, MetricsSnapshot};
