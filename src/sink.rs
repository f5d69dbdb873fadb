//! Time-series sink contract
//!
//! The collector pushes per-node statistics and one-minute global aggregates
//! into a [`StatsSink`]. A database client lives behind this trait; the crate
//! itself only ships [`LogSink`], which writes every call to the log.

use crate::core::{CounterMap, Fields, Node, NodeId};
use std::collections::BTreeMap;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Per-node statistics
pub const MEASUREMENT_NODE: &str = "node";
/// Global scalar aggregates
pub const MEASUREMENT_GLOBAL: &str = "global";
/// Node count per firmware release
pub const MEASUREMENT_FIRMWARE: &str = "firmware";
/// Node count per hardware model
pub const MEASUREMENT_MODEL: &str = "model";

/// Tags of a time-series point
pub type Tags = BTreeMap<String, String>;

/// Destination for derived statistics
pub trait StatsSink: Send + Sync {
    /// Store the statistics of one merged node
    fn add(&self, node_id: &NodeId, node: &Node);

    /// Store one timestamped point
    fn add_point(&self, measurement: &str, tags: &Tags, fields: &Fields, time: OffsetDateTime);

    /// Store a set of counters, one point per key
    fn add_counter_map(&self, measurement: &str, counts: &CounterMap);
}

/// Sink that logs every write at INFO under the `sink` target
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl LogSink {
    pub fn new() -> Self {
        Self
    }
}

impl StatsSink for LogSink {
    fn add(&self, node_id: &NodeId, node: &Node) {
        let Some(stats) = &node.statistics else {
            return;
        };
        let clients = stats.clients.map(|c| c.total).unwrap_or_default();
        tracing::info!(
            target: "sink",
            measurement = MEASUREMENT_NODE,
            node_id = %node_id,
            uptime = stats.uptime.unwrap_or_default(),
            loadavg = stats.loadavg.unwrap_or_default(),
            clients,
            "node point"
        );
    }

    fn add_point(&self, measurement: &str, tags: &Tags, fields: &Fields, time: OffsetDateTime) {
        let timestamp = time.format(&Rfc3339).unwrap_or_else(|_| time.to_string());
        tracing::info!(
            target: "sink",
            measurement,
            ?tags,
            ?fields,
            %timestamp,
            "point"
        );
    }

    fn add_counter_map(&self, measurement: &str, counts: &CounterMap) {
        tracing::info!(target: "sink", measurement, ?counts, "counter map");
    }
}
