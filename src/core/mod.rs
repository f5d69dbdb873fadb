//! Core types shared by every stage of the collector
//!
//! - NodeId / ResponseData: decoded respondd payloads
//! - Node / GlobalStats: merged per-node state and aggregates
//! - NodeRegistry / Nodes: keyed store of merged nodes

pub mod node;
pub mod registry;
pub mod response;

pub use node::{CounterMap, Fields, GlobalStats, Node};
pub use registry::{NodeRegistry, Nodes};
pub use response::{InvalidNodeId, NodeId, ResponseData, Section, NODE_ID_LEN, NODE_ID_PRIORITY};
