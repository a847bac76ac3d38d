//! Backend REST API abstraction.
//!
//! [`GraphApi`] is the seam between the exploration engine and the backend
//! service that owns persistence. [`HttpGraphApi`] talks JSON over HTTP;
//! tests substitute in-memory implementations.

mod http;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AppError;
use crate::models::{
    BulkEdgeResult, ContextRequest, ContextResponse, EdgeListQuery, EdgeType, ExampleCoverage,
    GraphStats, HeatData, HeatPeriod, KnowledgeEdge, KnowledgeNode, NeighborsResponse, NewEdge,
    NodeId, NodeListQuery, NodePage, PathsResponse, ReloadResult, Suggestion,
};

pub use http::HttpGraphApi;

/// Shared handle to the backend API.
pub type AppApi = Arc<dyn GraphApi>;

/// Operations the exploration engine consumes from the backend.
#[async_trait]
pub trait GraphApi: Send + Sync {
    /// `POST /api/context` - entry-point search plus expansion.
    async fn context_search(&self, request: &ContextRequest) -> Result<ContextResponse, AppError>;

    /// `GET /api/nodes` - paged node listing.
    async fn list_nodes(&self, query: &NodeListQuery) -> Result<NodePage, AppError>;

    /// `GET /api/nodes/{id}`.
    async fn get_node(&self, id: NodeId) -> Result<KnowledgeNode, AppError>;

    /// `GET /api/graph/neighbors/{id}` - server-side BFS up to `depth` hops.
    async fn neighbors(
        &self,
        id: NodeId,
        depth: u32,
        edge_types: &[EdgeType],
    ) -> Result<NeighborsResponse, AppError>;

    /// `GET /api/edges`.
    async fn list_edges(&self, query: &EdgeListQuery) -> Result<Vec<KnowledgeEdge>, AppError>;

    /// `POST /api/edges`.
    async fn create_edge(&self, edge: &NewEdge) -> Result<KnowledgeEdge, AppError>;

    /// `POST /api/edges/bulk` - per-item errors do not abort the batch.
    async fn create_edges_bulk(&self, edges: &[NewEdge]) -> Result<BulkEdgeResult, AppError>;

    /// `DELETE /api/edges/{id}`.
    async fn delete_edge(&self, id: i64) -> Result<(), AppError>;

    /// `GET /api/graph/stats`.
    async fn graph_stats(&self, tenant_ids: &[String]) -> Result<GraphStats, AppError>;

    /// `GET /api/graph/suggestions/{id}`.
    async fn suggestions(&self, id: NodeId, limit: u32) -> Result<Vec<Suggestion>, AppError>;

    /// `GET /api/graph/paths`.
    async fn find_paths(
        &self,
        source_id: NodeId,
        target_id: NodeId,
        max_depth: u32,
    ) -> Result<PathsResponse, AppError>;

    /// `POST /api/graph/reload` - force a backend graph rebuild.
    async fn reload_graph(&self) -> Result<ReloadResult, AppError>;

    /// `GET /api/graph/orphans`.
    async fn orphans(&self, tenant_ids: &[String]) -> Result<Vec<KnowledgeNode>, AppError>;

    /// `GET /api/metrics/heatmap` - usage statistics per node.
    async fn heat_stats(
        &self,
        tenant_ids: &[String],
        period: HeatPeriod,
    ) -> Result<Vec<HeatData>, AppError>;

    /// `GET /api/metrics/example-coverage` - example counts per schema index.
    async fn example_coverage(
        &self,
        tenant_ids: &[String],
    ) -> Result<Vec<ExampleCoverage>, AppError>;
}
