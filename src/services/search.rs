//! Incremental retrieval: entry-point search and neighbourhood expansion.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use futures::future::try_join;
use futures::stream::{self, StreamExt};
use serde::Serialize;

use crate::api::AppApi;
use crate::config::ExplorerConfig;
use crate::error::AppError;
use crate::models::{
    ContextRequest, ContextResponse, EdgeListQuery, EdgeType, KnowledgeEdge, KnowledgeNode,
    NodeId, NodeListQuery, NodeType,
};

use super::events::{EventBus, ViewEvent};
use super::tokens::RequestTokens;
use super::view::SharedView;

// ============================================================================
// Parameters and Outcomes
// ============================================================================

/// Input of [`SearchExpansionController::search`].
#[derive(Debug, Clone, PartialEq)]
pub struct SearchParams {
    /// Free text. Empty (or whitespace) lists nodes instead of searching.
    pub query: String,
    pub tenant_ids: Vec<String>,
    /// `None` means all node types.
    pub node_types: Option<Vec<NodeType>>,
    pub depth: u32,
    pub limit: u32,
    /// Keep `shared_tag` and `similar` edges.
    pub include_implicit: bool,
}

impl SearchParams {
    /// Parameters for `query` with the configured defaults.
    pub fn from_config(query: impl Into<String>, config: &ExplorerConfig) -> Self {
        Self {
            query: query.into(),
            tenant_ids: config.tenant_ids.clone(),
            node_types: None,
            depth: config.depth,
            limit: config.limit,
            include_implicit: config.include_implicit,
        }
    }
}

/// Result of one search. On failure every collection is empty and
/// `error` carries the message.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchOutcome {
    pub token: u64,
    pub total_nodes: usize,
    pub type_histogram: BTreeMap<NodeType, usize>,
    pub search_matches: BTreeSet<NodeId>,
    pub nodes: Vec<KnowledgeNode>,
    pub edges: Vec<KnowledgeEdge>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// A newer request superseded this one; nothing was committed.
    pub stale: bool,
}

impl SearchOutcome {
    fn failed(token: u64, message: String) -> Self {
        Self {
            token,
            error: Some(message),
            ..Default::default()
        }
    }

    fn stale(token: u64) -> Self {
        Self {
            token,
            stale: true,
            ..Default::default()
        }
    }
}

/// Input of [`SearchExpansionController::expand`].
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandParams {
    pub node_id: NodeId,
    pub depth: u32,
    pub node_types: Option<Vec<NodeType>>,
    /// Edge types traversed server-side. The first one labels the
    /// synthesized edges.
    pub edge_types: Vec<EdgeType>,
}

impl ExpandParams {
    pub fn new(node_id: NodeId, depth: u32) -> Self {
        Self {
            node_id,
            depth,
            node_types: None,
            edge_types: Vec::new(),
        }
    }
}

/// Result of one expansion.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExpandOutcome {
    pub token: u64,
    pub added_nodes: usize,
    pub added_edges: usize,
    /// Center plus the kept neighbours.
    pub nodes: Vec<KnowledgeNode>,
    pub edges: Vec<KnowledgeEdge>,
    /// Edges run from the center to each neighbour; edges between
    /// neighbours are not reconstructed.
    pub edges_approximate: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub stale: bool,
}

/// Nodes, edges and entry points fetched for one search, before commit.
struct Retrieved {
    nodes: Vec<KnowledgeNode>,
    edges: Vec<KnowledgeEdge>,
    matches: BTreeSet<NodeId>,
}

// ============================================================================
// Controller
// ============================================================================

/// Populates the shared view from the retrieval API.
///
/// Every call issues a request token. Responses that arrive after a newer
/// search are dropped instead of overwriting the view. Transport failures
/// never propagate: they become an empty outcome with `error` set while the
/// previous view stays in place.
#[derive(Clone)]
pub struct SearchExpansionController {
    api: AppApi,
    view: SharedView,
    tokens: Arc<RequestTokens>,
    events: EventBus,
    context_limit: u32,
    page_size: u32,
    max_concurrent_lookups: usize,
}

impl SearchExpansionController {
    pub fn new(
        api: AppApi,
        view: SharedView,
        tokens: Arc<RequestTokens>,
        events: EventBus,
        config: &ExplorerConfig,
    ) -> Self {
        Self {
            api,
            view,
            tokens,
            events,
            context_limit: config.context_limit,
            page_size: config.page_size.max(1),
            max_concurrent_lookups: config.max_concurrent_lookups.max(1),
        }
    }

    /// Replace the view with the result of `params`.
    pub async fn search(&self, params: &SearchParams) -> SearchOutcome {
        let token = self.tokens.issue_search();
        tracing::debug!(token, query = %params.query, tenants = ?params.tenant_ids, "Search issued");

        let result = self.retrieve(params).await;

        if !self.tokens.is_current_search(token) {
            return self.discard(token, SearchOutcome::stale(token));
        }

        match result {
            Ok(retrieved) => self.commit_search(token, retrieved),
            Err(err) => {
                let message = err.to_string();
                tracing::warn!(token, error = %message, "Search failed; keeping previous view");
                self.record_error(&message);
                SearchOutcome::failed(token, message)
            }
        }
    }

    /// Merge the neighbourhood of `params.node_id` into the view.
    pub async fn expand(&self, params: &ExpandParams) -> ExpandOutcome {
        let ticket = self.tokens.issue_expand();
        let token = ticket.token;
        tracing::debug!(token, node_id = params.node_id, depth = params.depth, "Expand issued");

        let result = try_join(
            self.api.get_node(params.node_id),
            self.api
                .neighbors(params.node_id, params.depth, &params.edge_types),
        )
        .await;

        if !self.tokens.is_current_expand(&ticket) {
            let outcome = ExpandOutcome {
                token,
                stale: true,
                ..Default::default()
            };
            return self.discard(token, outcome);
        }

        let (center, neighbors) = match result {
            Ok(fetched) => fetched,
            Err(err) => {
                let message = err.to_string();
                tracing::warn!(token, node_id = params.node_id, error = %message, "Expand failed");
                self.record_error(&message);
                return ExpandOutcome {
                    token,
                    error: Some(message),
                    ..Default::default()
                };
            }
        };

        let label = params.edge_types.first().copied().unwrap_or(EdgeType::Related);
        let center_id = center.id;
        let mut seen = HashSet::from([center_id]);
        let mut nodes = vec![center];
        let mut edges = Vec::new();
        for neighbor in neighbors.neighbors {
            let node = neighbor.node;
            if !accepts_type(params.node_types.as_deref(), node.node_type()) || !seen.insert(node.id)
            {
                continue;
            }
            edges.push(KnowledgeEdge::derived(center_id, node.id, label));
            nodes.push(node);
        }

        let summary = self.view.with(|state| {
            let summary = state.model.merge(nodes.clone(), edges.clone());
            state.last_error = None;
            summary
        });

        tracing::info!(
            token,
            node_id = center_id,
            added_nodes = summary.added_nodes,
            added_edges = summary.added_edges,
            "Expanded node"
        );
        self.events.publish(ViewEvent::ViewMerged {
            token,
            added_nodes: summary.added_nodes,
            added_edges: summary.added_edges,
        });

        ExpandOutcome {
            token,
            added_nodes: summary.added_nodes,
            added_edges: summary.added_edges,
            nodes,
            edges,
            edges_approximate: true,
            error: None,
            stale: false,
        }
    }

    fn commit_search(&self, token: u64, retrieved: Retrieved) -> SearchOutcome {
        let outcome = self.view.with(|state| {
            state.model.load(retrieved.nodes, retrieved.edges);
            state.search_matches = retrieved.matches;
            state.selection = None;
            state.last_error = None;
            SearchOutcome {
                token,
                total_nodes: state.model.node_count(),
                type_histogram: state.model.type_histogram(),
                search_matches: state.search_matches.clone(),
                nodes: state.model.nodes().to_vec(),
                edges: state.model.edges().to_vec(),
                error: None,
                stale: false,
            }
        });

        tracing::info!(
            token,
            nodes = outcome.nodes.len(),
            edges = outcome.edges.len(),
            matches = outcome.search_matches.len(),
            "Search committed"
        );
        self.events.publish(ViewEvent::ViewReplaced {
            token,
            nodes: outcome.nodes.len(),
            edges: outcome.edges.len(),
        });
        outcome
    }

    fn discard<T>(&self, token: u64, outcome: T) -> T {
        tracing::warn!(token, "Discarding superseded response");
        self.events.publish(ViewEvent::StaleResponseDiscarded { token });
        outcome
    }

    fn record_error(&self, message: &str) {
        self.view
            .with(|state| state.last_error = Some(message.to_string()));
        self.events.publish(ViewEvent::Error(message.to_string()));
    }

    // ========================================================================
    // Retrieval
    // ========================================================================

    async fn retrieve(&self, params: &SearchParams) -> Result<Retrieved, AppError> {
        let mut retrieved = if params.query.trim().is_empty() {
            self.retrieve_listing(params).await?
        } else {
            self.retrieve_context(params).await?
        };
        if !params.include_implicit {
            retrieved.edges.retain(|e| !e.edge_type.is_implicit());
        }
        Ok(retrieved)
    }

    /// No query: page through the node listing, then look up edges.
    async fn retrieve_listing(&self, params: &SearchParams) -> Result<Retrieved, AppError> {
        let limit = params.limit as usize;
        let mut nodes = Vec::new();
        let mut page = 1;

        while nodes.len() < limit {
            let query = NodeListQuery {
                tenant_ids: params.tenant_ids.clone(),
                node_types: params.node_types.clone().unwrap_or_default(),
                page,
                page_size: self.page_size,
            };
            let listing = self.api.list_nodes(&query).await?;
            let has_more = listing.has_more();
            nodes.extend(listing.items);
            if !has_more {
                break;
            }
            page += 1;
        }
        nodes.truncate(limit);

        let edges = self.lookup_edges(&nodes, params.include_implicit).await?;
        Ok(Retrieved {
            nodes,
            edges,
            matches: BTreeSet::new(),
        })
    }

    /// Query: one entry-point search, then path-derived or looked-up edges.
    async fn retrieve_context(&self, params: &SearchParams) -> Result<Retrieved, AppError> {
        let request = ContextRequest {
            query: params.query.clone(),
            tenant_ids: params.tenant_ids.clone(),
            node_types: params.node_types.clone(),
            entry_limit: params.limit,
            max_depth: params.depth,
            context_limit: self.context_limit,
        };
        let response = self.api.context_search(&request).await?;

        let matches: BTreeSet<NodeId> = response.entry_points.iter().map(|e| e.node.id).collect();
        let path_edges = edges_from_paths(&response);
        let nodes = union_nodes(response);

        let edges = match path_edges {
            Some(edges) => edges,
            None => self.lookup_edges(&nodes, params.include_implicit).await?,
        };

        Ok(Retrieved {
            nodes,
            edges,
            matches,
        })
    }

    /// One edge lookup per node, at most `max_concurrent_lookups` in flight.
    ///
    /// Keeps edges whose endpoints are both loaded, first occurrence per
    /// `(source, target)`. Implicit edges are dropped before deduplication
    /// when excluded, so they never shadow an authored edge on the same pair.
    /// Individual lookup failures are logged and skipped; the search fails
    /// only when every lookup fails.
    async fn lookup_edges(
        &self,
        nodes: &[KnowledgeNode],
        include_implicit: bool,
    ) -> Result<Vec<KnowledgeEdge>, AppError> {
        if nodes.is_empty() {
            return Ok(Vec::new());
        }
        let loaded: HashSet<NodeId> = nodes.iter().map(|n| n.id).collect();

        let results: Vec<(NodeId, Result<Vec<KnowledgeEdge>, AppError>)> =
            stream::iter(nodes.iter().map(|n| n.id).collect::<Vec<NodeId>>())
                .map(|id| async move { (id, self.api.list_edges(&EdgeListQuery::for_node(id)).await) })
                .buffered(self.max_concurrent_lookups)
                .collect()
                .await;

        let mut seen = HashSet::new();
        let mut edges = Vec::new();
        let mut first_error = None;
        let mut failures = 0;
        for (id, result) in results {
            match result {
                Ok(found) => {
                    for edge in found {
                        if !include_implicit && edge.edge_type.is_implicit() {
                            continue;
                        }
                        if loaded.contains(&edge.source_id)
                            && loaded.contains(&edge.target_id)
                            && seen.insert((edge.source_id, edge.target_id))
                        {
                            edges.push(edge);
                        }
                    }
                }
                Err(err) => {
                    tracing::warn!(node_id = id, error = %err, "Edge lookup failed");
                    failures += 1;
                    first_error.get_or_insert(err);
                }
            }
        }

        match first_error {
            Some(err) if failures == nodes.len() => Err(err),
            _ => Ok(edges),
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn accepts_type(filter: Option<&[NodeType]>, node_type: NodeType) -> bool {
    filter.map_or(true, |types| types.contains(&node_type))
}

/// Entry points first, then context nodes, deduplicated by id.
fn union_nodes(response: ContextResponse) -> Vec<KnowledgeNode> {
    let mut index: HashMap<NodeId, usize> = HashMap::new();
    let mut nodes = Vec::new();
    let candidates = response
        .entry_points
        .into_iter()
        .map(|e| e.node)
        .chain(response.context_nodes.into_iter().map(|c| c.node));
    for node in candidates {
        if !index.contains_key(&node.id) {
            index.insert(node.id, nodes.len());
            nodes.push(node);
        }
    }
    nodes
}

/// Consecutive path segments as `related` edges, or `None` when the
/// response carries no path information at all.
fn edges_from_paths(response: &ContextResponse) -> Option<Vec<KnowledgeEdge>> {
    let paths: Vec<&Vec<NodeId>> = response
        .context_nodes
        .iter()
        .filter_map(|c| c.path.as_ref())
        .collect();
    if paths.is_empty() {
        return None;
    }

    let mut seen = HashSet::new();
    let edges = paths
        .into_iter()
        .flat_map(|path| path.windows(2))
        .filter(|pair| pair[0] != pair[1] && seen.insert((pair[0], pair[1])))
        .map(|pair| KnowledgeEdge::derived(pair[0], pair[1], EdgeType::Related))
        .collect();
    Some(edges)
}
