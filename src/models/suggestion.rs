//! Ranked connection suggestions.

use serde::{Deserialize, Serialize};

use super::edge::deserialize_unit;
use super::{EdgeType, NodeId, NodeType};

/// A candidate edge from the selected node to `target_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub target_id: NodeId,
    pub target_title: String,
    pub target_type: NodeType,
    pub edge_type: EdgeType,
    /// Ranking confidence in `[0, 1]`; becomes the edge weight on apply.
    #[serde(deserialize_with = "deserialize_unit")]
    pub confidence: f64,
    #[serde(default)]
    pub reason: String,
}

/// Schema index with no query example pointing at it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingExample {
    pub node_id: NodeId,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_name: Option<String>,
    pub suggestion: String,
}
