//! Merged node state and global aggregates

use super::response::{Neighbours, NodeId, NodeInfo, ResponseData, Statistics};
use std::collections::{BTreeMap, HashMap};
use time::OffsetDateTime;

/// Counts keyed by a string value (firmware release, model name)
pub type CounterMap = HashMap<String, u32>;

/// Numeric fields of a time-series point
pub type Fields = BTreeMap<String, f64>;

/// Per-node state after merging every response seen for the node
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub node_id: NodeId,
    pub first_seen: OffsetDateTime,
    pub last_seen: OffsetDateTime,
    pub nodeinfo: Option<NodeInfo>,
    pub statistics: Option<Statistics>,
    pub neighbours: Option<Neighbours>,
}

impl Node {
    /// Create an empty node first seen at `now`
    pub fn new(node_id: NodeId, now: OffsetDateTime) -> Self {
        Self {
            node_id,
            first_seen: now,
            last_seen: now,
            nodeinfo: None,
            statistics: None,
            neighbours: None,
        }
    }

    /// Merge a response into this node.
    ///
    /// Sections present in the response replace the stored ones; absent
    /// sections leave the stored state untouched.
    pub fn merge(&mut self, response: ResponseData, now: OffsetDateTime) {
        self.last_seen = now;
        if let Some(nodeinfo) = response.node_info {
            self.nodeinfo = Some(nodeinfo);
        }
        if let Some(statistics) = response.statistics {
            self.statistics = Some(statistics);
        }
        if let Some(neighbours) = response.neighbours {
            self.neighbours = Some(neighbours);
        }
    }

    /// True once statistics have been merged for this node
    #[inline]
    pub fn has_statistics(&self) -> bool {
        self.statistics.is_some()
    }
}

/// Aggregate snapshot over every node in the registry
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlobalStats {
    pub nodes: u64,
    /// Client totals are summed in u64; per-node counts are u32
    pub clients: u64,
    pub clients_wifi: u64,
    pub clients_wifi24: u64,
    pub clients_wifi5: u64,
    /// Node count per firmware release
    pub firmwares: CounterMap,
    /// Node count per hardware model
    pub models: CounterMap,
}

impl GlobalStats {
    /// Compute aggregates from a registry snapshot
    pub fn from_nodes(nodes: &[Node]) -> Self {
        let mut stats = Self::default();

        for node in nodes {
            stats.nodes += 1;

            if let Some(clients) = node.statistics.as_ref().and_then(|s| s.clients) {
                stats.clients += u64::from(clients.total);
                stats.clients_wifi += u64::from(clients.wifi);
                stats.clients_wifi24 += u64::from(clients.wifi24);
                stats.clients_wifi5 += u64::from(clients.wifi5);
            }

            if let Some(info) = &node.nodeinfo {
                if let Some(release) = info.firmware_release() {
                    *stats.firmwares.entry(release.to_string()).or_default() += 1;
                }
                if let Some(model) = info.model() {
                    *stats.models.entry(model.to_string()).or_default() += 1;
                }
            }
        }

        stats
    }

    /// Scalar fields written as the global point
    pub fn fields(&self) -> Fields {
        Fields::from([
            ("nodes".to_string(), self.nodes as f64),
            ("clients.total".to_string(), self.clients as f64),
            ("clients.wifi".to_string(), self.clients_wifi as f64),
            ("clients.wifi24".to_string(), self.clients_wifi24 as f64),
            ("clients.wifi5".to_string(), self.clients_wifi5 as f64),
        ])
    }
}
