//! In-memory store for the currently loaded view.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::models::{EdgeKey, EdgeType, KnowledgeEdge, KnowledgeNode, NodeId, NodeType};

/// Read-only projection selecting node and edge types for display.
///
/// `None` means "all types".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct GraphFilter {
    pub node_types: Option<BTreeSet<NodeType>>,
    pub edge_types: Option<BTreeSet<EdgeType>>,
}

impl GraphFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_node_types(mut self, types: impl IntoIterator<Item = NodeType>) -> Self {
        self.node_types = Some(types.into_iter().collect());
        self
    }

    pub fn with_edge_types(mut self, types: impl IntoIterator<Item = EdgeType>) -> Self {
        self.edge_types = Some(types.into_iter().collect());
        self
    }

    fn accepts_node(&self, node: &KnowledgeNode) -> bool {
        self.node_types
            .as_ref()
            .map_or(true, |types| types.contains(&node.node_type()))
    }

    fn accepts_edge(&self, edge: &KnowledgeEdge) -> bool {
        self.edge_types
            .as_ref()
            .map_or(true, |types| types.contains(&edge.edge_type))
    }
}

/// Owned node/edge subset produced by [`GraphModel::filter`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilteredGraph {
    pub nodes: Vec<KnowledgeNode>,
    pub edges: Vec<KnowledgeEdge>,
}

/// Counts of what a `load` or `merge` changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub added_nodes: usize,
    pub updated_nodes: usize,
    pub added_edges: usize,
    pub updated_edges: usize,
    /// Edges rejected for a missing endpoint or a self-loop.
    pub dropped_edges: usize,
}

impl MergeSummary {
    pub fn changed(&self) -> bool {
        self.added_nodes + self.updated_nodes + self.added_edges + self.updated_edges > 0
    }
}

/// Nodes and edges of the current view.
///
/// Invariants:
/// - node ids are unique;
/// - every edge's endpoints are present, and no edge is a self-loop;
/// - at most one edge per `(source_id, target_id, edge_type)`.
///
/// Nodes and edges keep insertion order so projections are stable.
#[derive(Debug, Clone, Default)]
pub struct GraphModel {
    nodes: Vec<KnowledgeNode>,
    node_index: HashMap<NodeId, usize>,
    edges: Vec<KnowledgeEdge>,
    edge_index: HashMap<EdgeKey, usize>,
    revision: u64,
}

impl GraphModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entire view. Edges referencing ids outside `nodes` are dropped.
    pub fn load(&mut self, nodes: Vec<KnowledgeNode>, edges: Vec<KnowledgeEdge>) -> MergeSummary {
        self.nodes.clear();
        self.node_index.clear();
        self.edges.clear();
        self.edge_index.clear();
        self.revision += 1;
        self.merge(nodes, edges)
    }

    /// Upsert nodes by id and edges by `(source, target, type)`.
    ///
    /// An existing node is replaced only when the supplied copy is newer
    /// (`updated_at` strictly later). A duplicate edge key keeps one edge and
    /// takes the latest weight.
    pub fn merge(&mut self, nodes: Vec<KnowledgeNode>, edges: Vec<KnowledgeEdge>) -> MergeSummary {
        let mut summary = MergeSummary::default();

        for mut node in nodes {
            node.x = None;
            node.y = None;
            match self.node_index.get(&node.id) {
                Some(&idx) => {
                    if node.updated_at > self.nodes[idx].updated_at {
                        self.nodes[idx] = node;
                        summary.updated_nodes += 1;
                    }
                }
                None => {
                    self.node_index.insert(node.id, self.nodes.len());
                    self.nodes.push(node);
                    summary.added_nodes += 1;
                }
            }
        }

        for edge in edges {
            if edge.is_self_loop()
                || !self.node_index.contains_key(&edge.source_id)
                || !self.node_index.contains_key(&edge.target_id)
            {
                summary.dropped_edges += 1;
                continue;
            }
            let key = edge.key();
            match self.edge_index.get(&key) {
                Some(&idx) => {
                    let stored = &mut self.edges[idx];
                    if stored.weight != edge.weight || (stored.id.is_none() && edge.id.is_some())
                    {
                        stored.weight = edge.weight;
                        stored.id = stored.id.or(edge.id);
                        summary.updated_edges += 1;
                    }
                }
                None => {
                    self.edge_index.insert(key, self.edges.len());
                    self.edges.push(edge);
                    summary.added_edges += 1;
                }
            }
        }

        if summary.changed() {
            self.revision += 1;
        }
        if summary.dropped_edges > 0 {
            tracing::debug!(dropped = summary.dropped_edges, "Dropped dangling edges");
        }
        summary
    }

    /// Remove one edge by key. Returns the removed edge.
    pub fn remove_edge(&mut self, key: &EdgeKey) -> Option<KnowledgeEdge> {
        let idx = self.edge_index.remove(key)?;
        let removed = self.edges.remove(idx);
        for i in self.edge_index.values_mut() {
            if *i > idx {
                *i -= 1;
            }
        }
        self.revision += 1;
        Some(removed)
    }

    /// Empty the view.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.node_index.clear();
        self.edges.clear();
        self.edge_index.clear();
        self.revision += 1;
    }

    /// Pure projection for display; stored state is untouched.
    ///
    /// Edges are kept only when both endpoints survive the node filter.
    pub fn filter(&self, filter: &GraphFilter) -> FilteredGraph {
        let nodes: Vec<KnowledgeNode> = self
            .nodes
            .iter()
            .filter(|n| filter.accepts_node(n))
            .cloned()
            .collect();
        let kept: HashSet<NodeId> = nodes.iter().map(|n| n.id).collect();
        let edges = self
            .edges
            .iter()
            .filter(|e| filter.accepts_edge(e))
            .filter(|e| kept.contains(&e.source_id) && kept.contains(&e.target_id))
            .cloned()
            .collect();
        FilteredGraph { nodes, edges }
    }

    /// All edges where the node is source or target.
    pub fn neighbors_of(&self, node_id: NodeId) -> Vec<&KnowledgeEdge> {
        self.edges.iter().filter(|e| e.touches(node_id)).collect()
    }

    pub fn node(&self, node_id: NodeId) -> Option<&KnowledgeNode> {
        self.node_index.get(&node_id).map(|&idx| &self.nodes[idx])
    }

    pub fn contains_node(&self, node_id: NodeId) -> bool {
        self.node_index.contains_key(&node_id)
    }

    pub fn edge(&self, key: &EdgeKey) -> Option<&KnowledgeEdge> {
        self.edge_index.get(key).map(|&idx| &self.edges[idx])
    }

    pub fn nodes(&self) -> &[KnowledgeNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[KnowledgeEdge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node count per type.
    pub fn type_histogram(&self) -> BTreeMap<NodeType, usize> {
        let mut histogram = BTreeMap::new();
        for node in &self.nodes {
            *histogram.entry(node.node_type()).or_insert(0) += 1;
        }
        histogram
    }

    /// Increments whenever the node/edge set changes.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}
