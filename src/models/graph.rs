//! Request and response shapes for the graph REST API.

use serde::{Deserialize, Serialize};

use super::{EdgeType, KnowledgeNode, NodeId, NodeType};

// ============================================================================
// Node Listing
// ============================================================================

/// Paged node listing filter (`GET /api/nodes`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeListQuery {
    pub tenant_ids: Vec<String>,
    pub node_types: Vec<NodeType>,
    /// 1-indexed page number.
    pub page: u32,
    pub page_size: u32,
}

/// One page of nodes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodePage {
    pub items: Vec<KnowledgeNode>,
    /// Total matching nodes across all pages.
    #[serde(default)]
    pub total: usize,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub page_size: u32,
}

impl NodePage {
    /// Whether pages beyond this one exist.
    pub fn has_more(&self) -> bool {
        let seen = (self.page.max(1) as usize - 1) * self.page_size as usize + self.items.len();
        !self.items.is_empty() && seen < self.total
    }
}

// ============================================================================
// Edge Listing
// ============================================================================

/// Which incident edges to return for a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeDirection {
    Outgoing,
    Incoming,
    #[default]
    Both,
}

impl EdgeDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeDirection::Outgoing => "outgoing",
            EdgeDirection::Incoming => "incoming",
            EdgeDirection::Both => "both",
        }
    }
}

/// Edge listing filter (`GET /api/edges`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgeListQuery {
    pub node_id: Option<NodeId>,
    pub edge_types: Vec<EdgeType>,
    pub direction: Option<EdgeDirection>,
}

impl EdgeListQuery {
    /// All edges incident to `node_id`.
    pub fn for_node(node_id: NodeId) -> Self {
        Self {
            node_id: Some(node_id),
            edge_types: Vec::new(),
            direction: Some(EdgeDirection::Both),
        }
    }
}

// ============================================================================
// Entry-Point Search
// ============================================================================

/// Body of `POST /api/context`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextRequest {
    pub query: String,
    pub tenant_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_types: Option<Vec<NodeType>>,
    pub entry_limit: u32,
    pub max_depth: u32,
    pub context_limit: u32,
}

/// A node matched directly by the query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryPoint {
    pub node: KnowledgeNode,
    #[serde(default)]
    pub score: f64,
}

/// A node reached by expanding from the entry points.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextNode {
    pub node: KnowledgeNode,
    #[serde(default)]
    pub depth: u32,
    /// Node ids from an entry point down to this node, when the backend
    /// reports how it got here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<NodeId>>,
}

/// Response of `POST /api/context`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextResponse {
    #[serde(default)]
    pub entry_points: Vec<EntryPoint>,
    #[serde(default)]
    pub context_nodes: Vec<ContextNode>,
}

// ============================================================================
// Neighbors, Paths, Stats
// ============================================================================

/// A node found by the server-side BFS.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Neighbor {
    pub node: KnowledgeNode,
    #[serde(default)]
    pub distance: u32,
}

/// Response of `GET /api/graph/neighbors/{id}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NeighborsResponse {
    #[serde(default)]
    pub neighbors: Vec<Neighbor>,
}

/// Response of `GET /api/graph/paths`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathsResponse {
    pub source_id: NodeId,
    pub target_id: NodeId,
    /// Each path lists node ids from source to target.
    #[serde(default)]
    pub paths: Vec<Vec<NodeId>>,
}

impl PathsResponse {
    pub fn shortest(&self) -> Option<&[NodeId]> {
        self.paths.iter().min_by_key(|p| p.len()).map(Vec::as_slice)
    }
}

/// Aggregate graph counts (`GET /api/graph/stats`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    #[serde(default)]
    pub density: f64,
    #[serde(default)]
    pub orphan_count: usize,
    #[serde(default)]
    pub avg_degree: f64,
}

/// Response of `POST /api/graph/reload`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReloadResult {
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge_count: Option<usize>,
}

// ============================================================================
// Bulk Edge Creation
// ============================================================================

/// Per-item failure in a bulk edge request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkEdgeError {
    /// Index into the submitted list.
    pub index: usize,
    pub error: String,
}

/// Response of `POST /api/edges/bulk`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkEdgeResult {
    pub created: usize,
    #[serde(default)]
    pub errors: Vec<BulkEdgeError>,
}

// ============================================================================
// Example Coverage
// ============================================================================

/// Example count for one schema index node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExampleCoverage {
    pub node_id: NodeId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_name: Option<String>,
    /// Incoming `example_of` edges.
    pub example_count: usize,
}
