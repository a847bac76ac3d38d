//! In-memory `GraphApi` used by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use kgconsole::api::GraphApi;
use kgconsole::config::{ApiConfig, Config, ExplorerConfig, LayoutConfig};
use kgconsole::context::Context;
use kgconsole::error::AppError;
use kgconsole::models::{
    BulkEdgeError, BulkEdgeResult, ConceptContent, ContextRequest, ContextResponse,
    EdgeListQuery, EdgeType, ExampleCoverage, GraphStats, HeatData, HeatPeriod, KnowledgeEdge,
    KnowledgeNode, Neighbor, NeighborsResponse, NewEdge, NodeContent, NodeId, NodeListQuery,
    NodePage, NodeType, PathsResponse, ReloadResult, SchemaIndexContent, Suggestion,
};

pub fn concept(id: NodeId, tenant: &str) -> KnowledgeNode {
    KnowledgeNode::new(
        id,
        tenant,
        format!("Concept {}", id),
        NodeContent::Concept(ConceptContent::default()),
    )
}

pub fn schema_index(id: NodeId, tenant: &str) -> KnowledgeNode {
    KnowledgeNode::new(
        id,
        tenant,
        format!("index_{}", id),
        NodeContent::SchemaIndex(SchemaIndexContent::default()),
    )
}

pub fn edge(id: i64, source: NodeId, target: NodeId, edge_type: EdgeType) -> KnowledgeEdge {
    KnowledgeEdge {
        id: Some(id),
        ..KnowledgeEdge::new(source, target, edge_type, 1.0)
    }
}

pub fn unavailable() -> AppError {
    AppError::Api {
        status: 503,
        message: "service unavailable".to_string(),
    }
}

pub fn test_config() -> Config {
    Config {
        api: ApiConfig {
            base_url: "http://backend.test".to_string(),
            timeout_secs: None,
        },
        explorer: ExplorerConfig {
            tenant_ids: vec!["t1".to_string()],
            ..Default::default()
        },
        layout: LayoutConfig::default(),
    }
}

/// Context over `api` with the test configuration.
pub fn context(api: &Arc<FakeGraphApi>) -> Context {
    Context::new(api.clone(), test_config())
}

/// Backend double with scripted responses, failures and latencies.
#[derive(Default)]
pub struct FakeGraphApi {
    pub nodes: Mutex<Vec<KnowledgeNode>>,
    pub edges: Mutex<Vec<KnowledgeEdge>>,
    /// `context_search` responses by query text.
    pub contexts: Mutex<HashMap<String, ContextResponse>>,
    /// Latency of `context_search` by query text.
    pub delays: Mutex<HashMap<String, Duration>>,
    pub suggestions: Mutex<HashMap<NodeId, Vec<Suggestion>>>,
    pub heat: Mutex<Vec<HeatData>>,
    pub coverage: Mutex<Vec<ExampleCoverage>>,
    /// Operation names that fail with a 503.
    pub failing: Mutex<HashSet<&'static str>>,
    /// Node ids whose edge lookup fails.
    pub failing_lookups: Mutex<HashSet<NodeId>>,
    /// Every call, in order.
    pub calls: Mutex<Vec<String>>,
    /// Payloads received by `create_edge`.
    pub edge_requests: Mutex<Vec<NewEdge>>,
    /// Payloads received by `create_edges_bulk`.
    pub bulk_requests: Mutex<Vec<Vec<NewEdge>>>,
    next_edge_id: AtomicI64,
}

impl FakeGraphApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_graph(nodes: Vec<KnowledgeNode>, edges: Vec<KnowledgeEdge>) -> Arc<Self> {
        let api = Self::default();
        *api.nodes.lock().unwrap() = nodes;
        *api.edges.lock().unwrap() = edges;
        api.next_edge_id.store(1000, Ordering::SeqCst);
        Arc::new(api)
    }

    pub fn fail(&self, operation: &'static str) {
        self.failing.lock().unwrap().insert(operation);
    }

    pub fn recover(&self, operation: &'static str) {
        self.failing.lock().unwrap().remove(operation);
    }

    pub fn set_context(&self, query: &str, response: ContextResponse) {
        self.contexts
            .lock()
            .unwrap()
            .insert(query.to_string(), response);
    }

    pub fn set_delay(&self, query: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(query.to_string(), delay);
    }

    pub fn calls_to(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.as_str() == operation)
            .count()
    }

    fn record(&self, operation: &'static str) -> Result<(), AppError> {
        self.calls.lock().unwrap().push(operation.to_string());
        if self.failing.lock().unwrap().contains(operation) {
            Err(unavailable())
        } else {
            Ok(())
        }
    }

    fn find_node(&self, id: NodeId) -> Option<KnowledgeNode> {
        self.nodes.lock().unwrap().iter().find(|n| n.id == id).cloned()
    }

    fn store_edge(&self, edge: &NewEdge) -> KnowledgeEdge {
        let stored = KnowledgeEdge {
            id: Some(self.next_edge_id.fetch_add(1, Ordering::SeqCst)),
            ..KnowledgeEdge::new(edge.source_id, edge.target_id, edge.edge_type, edge.weight)
        };
        self.edges.lock().unwrap().push(stored.clone());
        stored
    }
}

#[async_trait]
impl GraphApi for FakeGraphApi {
    async fn context_search(&self, request: &ContextRequest) -> Result<ContextResponse, AppError> {
        self.record("context_search")?;
        let delay = self.delays.lock().unwrap().get(&request.query).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self
            .contexts
            .lock()
            .unwrap()
            .get(&request.query)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_nodes(&self, query: &NodeListQuery) -> Result<NodePage, AppError> {
        self.record("list_nodes")?;
        let matching: Vec<KnowledgeNode> = self
            .nodes
            .lock()
            .unwrap()
            .iter()
            .filter(|n| query.tenant_ids.is_empty() || query.tenant_ids.contains(&n.tenant_id))
            .filter(|n| query.node_types.is_empty() || query.node_types.contains(&n.node_type()))
            .cloned()
            .collect();
        let page = query.page.max(1);
        let start = ((page - 1) * query.page_size) as usize;
        let items = matching
            .iter()
            .skip(start)
            .take(query.page_size as usize)
            .cloned()
            .collect();
        Ok(NodePage {
            items,
            total: matching.len(),
            page,
            page_size: query.page_size,
        })
    }

    async fn get_node(&self, id: NodeId) -> Result<KnowledgeNode, AppError> {
        self.record("get_node")?;
        self.find_node(id).ok_or(AppError::NodeNotFound(id))
    }

    async fn neighbors(
        &self,
        id: NodeId,
        depth: u32,
        edge_types: &[EdgeType],
    ) -> Result<NeighborsResponse, AppError> {
        self.record("neighbors")?;
        let edges = self.edges.lock().unwrap().clone();
        let mut seen = HashSet::from([id]);
        let mut queue = VecDeque::from([(id, 0)]);
        let mut neighbors = Vec::new();
        while let Some((current, distance)) = queue.pop_front() {
            if distance == depth {
                continue;
            }
            for e in edges.iter().filter(|e| e.touches(current)) {
                if !edge_types.is_empty() && !edge_types.contains(&e.edge_type) {
                    continue;
                }
                let other = if e.source_id == current {
                    e.target_id
                } else {
                    e.source_id
                };
                if seen.insert(other) {
                    if let Some(node) = self.find_node(other) {
                        neighbors.push(Neighbor {
                            node,
                            distance: distance + 1,
                        });
                    }
                    queue.push_back((other, distance + 1));
                }
            }
        }
        Ok(NeighborsResponse { neighbors })
    }

    async fn list_edges(&self, query: &EdgeListQuery) -> Result<Vec<KnowledgeEdge>, AppError> {
        self.record("list_edges")?;
        if let Some(id) = query.node_id {
            if self.failing_lookups.lock().unwrap().contains(&id) {
                return Err(unavailable());
            }
        }
        Ok(self
            .edges
            .lock()
            .unwrap()
            .iter()
            .filter(|e| query.node_id.map_or(true, |id| e.touches(id)))
            .filter(|e| query.edge_types.is_empty() || query.edge_types.contains(&e.edge_type))
            .cloned()
            .collect())
    }

    async fn create_edge(&self, edge: &NewEdge) -> Result<KnowledgeEdge, AppError> {
        self.record("create_edge")?;
        self.edge_requests.lock().unwrap().push(edge.clone());
        Ok(self.store_edge(edge))
    }

    async fn create_edges_bulk(&self, edges: &[NewEdge]) -> Result<BulkEdgeResult, AppError> {
        self.record("create_edges_bulk")?;
        self.bulk_requests.lock().unwrap().push(edges.to_vec());
        let mut result = BulkEdgeResult::default();
        for (index, edge) in edges.iter().enumerate() {
            if self.find_node(edge.target_id).is_none() {
                result.errors.push(BulkEdgeError {
                    index,
                    error: format!("Target node {} not found", edge.target_id),
                });
            } else {
                self.store_edge(edge);
                result.created += 1;
            }
        }
        Ok(result)
    }

    async fn delete_edge(&self, id: i64) -> Result<(), AppError> {
        self.record("delete_edge")?;
        self.edges.lock().unwrap().retain(|e| e.id != Some(id));
        Ok(())
    }

    async fn graph_stats(&self, _tenant_ids: &[String]) -> Result<GraphStats, AppError> {
        self.record("graph_stats")?;
        Ok(GraphStats {
            node_count: self.nodes.lock().unwrap().len(),
            edge_count: self.edges.lock().unwrap().len(),
            ..Default::default()
        })
    }

    async fn suggestions(&self, id: NodeId, _limit: u32) -> Result<Vec<Suggestion>, AppError> {
        self.record("suggestions")?;
        Ok(self
            .suggestions
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .unwrap_or_default())
    }

    async fn find_paths(
        &self,
        source_id: NodeId,
        target_id: NodeId,
        _max_depth: u32,
    ) -> Result<PathsResponse, AppError> {
        self.record("find_paths")?;
        Ok(PathsResponse {
            source_id,
            target_id,
            paths: Vec::new(),
        })
    }

    async fn reload_graph(&self) -> Result<ReloadResult, AppError> {
        self.record("reload_graph")?;
        Ok(ReloadResult {
            status: "ok".to_string(),
            ..Default::default()
        })
    }

    async fn orphans(&self, tenant_ids: &[String]) -> Result<Vec<KnowledgeNode>, AppError> {
        self.record("orphans")?;
        let edges = self.edges.lock().unwrap().clone();
        Ok(self
            .nodes
            .lock()
            .unwrap()
            .iter()
            .filter(|n| tenant_ids.is_empty() || tenant_ids.contains(&n.tenant_id))
            .filter(|n| !edges.iter().any(|e| e.touches(n.id)))
            .cloned()
            .collect())
    }

    async fn heat_stats(
        &self,
        _tenant_ids: &[String],
        _period: HeatPeriod,
    ) -> Result<Vec<HeatData>, AppError> {
        self.record("heat_stats")?;
        Ok(self.heat.lock().unwrap().clone())
    }

    async fn example_coverage(
        &self,
        _tenant_ids: &[String],
    ) -> Result<Vec<ExampleCoverage>, AppError> {
        self.record("example_coverage")?;
        Ok(self.coverage.lock().unwrap().clone())
    }
}

/// Five `t1` concepts with three edges, plus one `t2` node.
pub fn tenant_graph() -> Arc<FakeGraphApi> {
    let mut nodes: Vec<KnowledgeNode> = (1..=5).map(|id| concept(id, "t1")).collect();
    nodes.push(concept(99, "t2"));
    FakeGraphApi::with_graph(
        nodes,
        vec![
            edge(1, 1, 2, EdgeType::Related),
            edge(2, 2, 3, EdgeType::Parent),
            edge(3, 4, 5, EdgeType::SharedTag),
        ],
    )
}

pub fn node_type_count(nodes: &[KnowledgeNode], node_type: NodeType) -> usize {
    nodes.iter().filter(|n| n.node_type() == node_type).count()
}
