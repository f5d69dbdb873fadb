//! Decoded respondd payloads
//!
//! A response carries up to three independent sections. Only the fields the
//! collector aggregates on are typed; everything else a node reports is kept
//! verbatim in each section's `extra` map.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Required length of a node identifier (hex MAC without separators)
pub const NODE_ID_LEN: usize = 12;

/// Order in which sections are consulted for the node identifier.
///
/// The first section present in a response supplies the identifier, even if
/// that identifier turns out to be invalid.
pub const NODE_ID_PRIORITY: [Section; 3] =
    [Section::NodeInfo, Section::Neighbours, Section::Statistics];

/// Top-level section of a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    NodeInfo,
    Statistics,
    Neighbours,
}

impl Section {
    /// JSON key of the section
    pub const fn key(&self) -> &'static str {
        match self {
            Section::NodeInfo => "nodeinfo",
            Section::Statistics => "statistics",
            Section::Neighbours => "neighbours",
        }
    }
}

/// Validated 12-character node identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(String);

/// Identifier with the wrong length
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid node id '{0}': expected {} characters", NODE_ID_LEN)]
pub struct InvalidNodeId(pub String);

impl NodeId {
    /// Validate an identifier. Length is the only check.
    pub fn parse(raw: &str) -> Result<Self, InvalidNodeId> {
        if raw.len() == NODE_ID_LEN {
            Ok(Self(raw.to_string()))
        } else {
            Err(InvalidNodeId(raw.to_string()))
        }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One decoded datagram
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseData {
    #[serde(default, rename = "nodeinfo", skip_serializing_if = "Option::is_none")]
    pub node_info: Option<NodeInfo>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistics: Option<Statistics>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub neighbours: Option<Neighbours>,
}

impl ResponseData {
    /// Identifier of one section, if that section is present
    pub fn section_node_id(&self, section: Section) -> Option<&str> {
        match section {
            Section::NodeInfo => self.node_info.as_ref().map(|s| s.node_id.as_str()),
            Section::Statistics => self.statistics.as_ref().map(|s| s.node_id.as_str()),
            Section::Neighbours => self.neighbours.as_ref().map(|s| s.node_id.as_str()),
        }
    }

    /// Candidate identifier according to [`NODE_ID_PRIORITY`]
    ///
    /// Returns the section it was taken from together with the raw,
    /// unvalidated identifier.
    pub fn candidate_node_id(&self) -> Option<(Section, &str)> {
        NODE_ID_PRIORITY
            .iter()
            .find_map(|&section| self.section_node_id(section).map(|id| (section, id)))
    }
}

/// `nodeinfo` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeInfo {
    #[serde(default, alias = "id")]
    pub node_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardware: Option<Hardware>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub software: Option<Software>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NodeInfo {
    /// Hardware model name, if reported
    pub fn model(&self) -> Option<&str> {
        self.hardware.as_ref()?.model.as_deref()
    }

    /// Firmware release, if reported
    pub fn firmware_release(&self) -> Option<&str> {
        self.software.as_ref()?.firmware.as_ref()?.release.as_deref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Hardware {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nproc: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Software {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firmware: Option<Firmware>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Firmware {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,
}

/// `statistics` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    #[serde(default, alias = "id")]
    pub node_id: String,

    /// Seconds since boot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uptime: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idletime: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loadavg: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clients: Option<Clients>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Connected client counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clients {
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub wifi: u32,
    #[serde(default)]
    pub wifi24: u32,
    #[serde(default)]
    pub wifi5: u32,
}

/// `neighbours` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Neighbours {
    #[serde(default, alias = "id")]
    pub node_id: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
