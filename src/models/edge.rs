//! Knowledge edge model.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use super::NodeId;

/// Relationship kinds between knowledge nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    Related,
    Parent,
    ExampleOf,
    SharedTag,
    Similar,
}

impl EdgeType {
    pub const ALL: [EdgeType; 5] = [
        EdgeType::Related,
        EdgeType::Parent,
        EdgeType::ExampleOf,
        EdgeType::SharedTag,
        EdgeType::Similar,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeType::Related => "related",
            EdgeType::Parent => "parent",
            EdgeType::ExampleOf => "example_of",
            EdgeType::SharedTag => "shared_tag",
            EdgeType::Similar => "similar",
        }
    }

    /// Inferred rather than authored relationships.
    pub fn is_implicit(&self) -> bool {
        matches!(self, EdgeType::SharedTag | EdgeType::Similar)
    }
}

impl fmt::Display for EdgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EdgeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EdgeType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown edge type '{}'", s))
    }
}

/// Clamp a score into `[0, 1]`. NaN maps to 0.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

pub(crate) fn deserialize_unit<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    f64::deserialize(deserializer).map(clamp_unit)
}

fn default_weight() -> f64 {
    1.0
}

/// Identity of an edge within a view: at most one edge per key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeKey {
    pub source_id: NodeId,
    pub target_id: NodeId,
    pub edge_type: EdgeType,
}

/// A typed, weighted edge between two knowledge nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEdge {
    /// Backend identifier, absent for edges synthesized client-side.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub source_id: NodeId,
    pub target_id: NodeId,
    pub edge_type: EdgeType,
    #[serde(default = "default_weight", deserialize_with = "deserialize_unit")]
    pub weight: f64,
    #[serde(default)]
    pub is_auto_generated: bool,
}

impl KnowledgeEdge {
    pub fn new(source_id: NodeId, target_id: NodeId, edge_type: EdgeType, weight: f64) -> Self {
        Self {
            id: None,
            source_id,
            target_id,
            edge_type,
            weight: clamp_unit(weight),
            is_auto_generated: false,
        }
    }

    /// An edge the client derived itself (path segment, expansion spoke).
    pub fn derived(source_id: NodeId, target_id: NodeId, edge_type: EdgeType) -> Self {
        Self {
            is_auto_generated: true,
            ..Self::new(source_id, target_id, edge_type, 1.0)
        }
    }

    pub fn key(&self) -> EdgeKey {
        EdgeKey {
            source_id: self.source_id,
            target_id: self.target_id,
            edge_type: self.edge_type,
        }
    }

    pub fn touches(&self, node_id: NodeId) -> bool {
        self.source_id == node_id || self.target_id == node_id
    }

    pub fn is_self_loop(&self) -> bool {
        self.source_id == self.target_id
    }
}

/// Payload for creating an edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEdge {
    pub source_id: NodeId,
    pub target_id: NodeId,
    pub edge_type: EdgeType,
    pub weight: f64,
}

impl NewEdge {
    pub fn new(source_id: NodeId, target_id: NodeId, edge_type: EdgeType) -> Self {
        Self {
            source_id,
            target_id,
            edge_type,
            weight: 1.0,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = clamp_unit(weight);
        self
    }
}
