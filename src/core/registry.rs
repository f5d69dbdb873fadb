//! Node registry
//!
//! The collector only talks to the registry through [`NodeRegistry`]. `Nodes`
//! is the in-memory implementation used by the binary: one map behind a
//! read/write lock, so the global stats worker can snapshot while the parser
//! merges.

use super::node::Node;
use super::response::{NodeId, ResponseData};
use parking_lot::RwLock;
use std::collections::HashMap;
use time::OffsetDateTime;

/// Keyed store of merged node state
///
/// Implementations must tolerate concurrent `snapshot` calls during `update`.
pub trait NodeRegistry: Send + Sync {
    /// Merge a response into the node's state and return the merged node
    fn update(&self, node_id: &NodeId, response: ResponseData) -> Node;

    /// Copy of every node currently known
    fn snapshot(&self) -> Vec<Node>;
}

/// In-memory registry with per-section last-writer-wins merge
#[derive(Debug, Default)]
pub struct Nodes {
    nodes: RwLock<HashMap<NodeId, Node>>,
}

impl Nodes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.read().is_empty()
    }
}

impl NodeRegistry for Nodes {
    fn update(&self, node_id: &NodeId, response: ResponseData) -> Node {
        let now = OffsetDateTime::now_utc();
        let mut nodes = self.nodes.write();

        let node = nodes.entry(node_id.clone()).or_insert_with(|| {
            tracing::debug!(target: "registry", node_id = %node_id, "new node");
            Node::new(node_id.clone(), now)
        });
        node.merge(response, now);
        node.clone()
    }

    fn snapshot(&self) -> Vec<Node> {
        self.nodes.read().values().cloned().collect()
    }
}
