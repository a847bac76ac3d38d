//! HttpGraphApi - JSON over HTTP client for the backend service.

use std::fmt::Display;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use super::GraphApi;
use crate::config::ApiConfig;
use crate::error::AppError;
use crate::models::{
    BulkEdgeResult, ContextRequest, ContextResponse, EdgeListQuery, EdgeType, ExampleCoverage,
    GraphStats, HeatData, HeatPeriod, KnowledgeEdge, KnowledgeNode, NeighborsResponse, NewEdge,
    NodeId, NodeListQuery, NodePage, PathsResponse, ReloadResult, Suggestion,
};

/// Network client for the knowledge graph backend.
///
/// All paths are resolved against a configurable base URL.
#[derive(Clone)]
pub struct HttpGraphApi {
    base_url: String,
    client: Client,
}

impl HttpGraphApi {
    /// Create a client for the given base URL with no request timeout.
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    /// Create a client from configuration, applying the optional timeout.
    pub fn from_config(config: &ApiConfig) -> Result<Self, AppError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client: builder.build()?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request and decode a JSON body, mapping non-2xx responses
    /// to [`AppError::Api`].
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, AppError> {
        let response = Self::check(request.send().await?).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn check(response: Response) -> Result<Response, AppError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(AppError::Api {
            status: status.as_u16(),
            message: error_message(&body).unwrap_or_else(|| status.to_string()),
        })
    }
}

/// Pull a human-readable message out of an error body.
///
/// Accepts `{"error": "..."}`, `{"detail": "..."}` or a non-empty plain text body.
fn error_message(body: &str) -> Option<String> {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["error", "detail", "message"] {
            if let Some(msg) = value.get(key).and_then(|v| v.as_str()) {
                return Some(msg.to_string());
            }
        }
    }
    let trimmed = body.trim();
    (!trimmed.is_empty() && !trimmed.starts_with('{')).then(|| trimmed.to_string())
}

/// Comma-join a list parameter.
fn join<T: Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn tenant_params(tenant_ids: &[String]) -> Vec<(&'static str, String)> {
    if tenant_ids.is_empty() {
        Vec::new()
    } else {
        vec![("tenant_ids", join(tenant_ids))]
    }
}

fn node_list_params(query: &NodeListQuery) -> Vec<(&'static str, String)> {
    let mut params = tenant_params(&query.tenant_ids);
    if !query.node_types.is_empty() {
        params.push(("node_types", join(&query.node_types)));
    }
    params.push(("page", query.page.max(1).to_string()));
    params.push(("page_size", query.page_size.to_string()));
    params
}

fn edge_list_params(query: &EdgeListQuery) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();
    if let Some(node_id) = query.node_id {
        params.push(("node_id", node_id.to_string()));
    }
    if !query.edge_types.is_empty() {
        params.push(("edge_types", join(&query.edge_types)));
    }
    if let Some(direction) = query.direction {
        params.push(("direction", direction.as_str().to_string()));
    }
    params
}

#[async_trait]
impl GraphApi for HttpGraphApi {
    async fn context_search(&self, request: &ContextRequest) -> Result<ContextResponse, AppError> {
        let url = self.url("/api/context");
        tracing::debug!(url = %url, query = %request.query, "POST context search");
        self.send(self.client.post(&url).json(request)).await
    }

    async fn list_nodes(&self, query: &NodeListQuery) -> Result<NodePage, AppError> {
        let url = self.url("/api/nodes");
        tracing::debug!(url = %url, page = query.page, "GET nodes");
        self.send(self.client.get(&url).query(&node_list_params(query)))
            .await
    }

    async fn get_node(&self, id: NodeId) -> Result<KnowledgeNode, AppError> {
        let url = self.url(&format!("/api/nodes/{}", id));
        tracing::debug!(url = %url, "GET node");
        match self.send(self.client.get(&url)).await {
            Err(AppError::Api { status: 404, .. }) => Err(AppError::NodeNotFound(id)),
            other => other,
        }
    }

    async fn neighbors(
        &self,
        id: NodeId,
        depth: u32,
        edge_types: &[EdgeType],
    ) -> Result<NeighborsResponse, AppError> {
        let url = self.url(&format!("/api/graph/neighbors/{}", id));
        let mut params = vec![("depth", depth.to_string())];
        if !edge_types.is_empty() {
            params.push(("edge_types", join(edge_types)));
        }
        tracing::debug!(url = %url, depth, "GET neighbors");
        self.send(self.client.get(&url).query(&params)).await
    }

    async fn list_edges(&self, query: &EdgeListQuery) -> Result<Vec<KnowledgeEdge>, AppError> {
        let url = self.url("/api/edges");
        tracing::debug!(url = %url, node_id = ?query.node_id, "GET edges");
        self.send(self.client.get(&url).query(&edge_list_params(query)))
            .await
    }

    async fn create_edge(&self, edge: &NewEdge) -> Result<KnowledgeEdge, AppError> {
        let url = self.url("/api/edges");
        tracing::debug!(
            url = %url,
            source = edge.source_id,
            target = edge.target_id,
            "POST edge"
        );
        self.send(self.client.post(&url).json(edge)).await
    }

    async fn create_edges_bulk(&self, edges: &[NewEdge]) -> Result<BulkEdgeResult, AppError> {
        let url = self.url("/api/edges/bulk");
        tracing::debug!(url = %url, count = edges.len(), "POST edges bulk");
        let body = serde_json::json!({ "edges": edges });
        self.send(self.client.post(&url).json(&body)).await
    }

    async fn delete_edge(&self, id: i64) -> Result<(), AppError> {
        let url = self.url(&format!("/api/edges/{}", id));
        tracing::debug!(url = %url, "DELETE edge");
        Self::check(self.client.delete(&url).send().await?).await?;
        Ok(())
    }

    async fn graph_stats(&self, tenant_ids: &[String]) -> Result<GraphStats, AppError> {
        let url = self.url("/api/graph/stats");
        self.send(self.client.get(&url).query(&tenant_params(tenant_ids)))
            .await
    }

    async fn suggestions(&self, id: NodeId, limit: u32) -> Result<Vec<Suggestion>, AppError> {
        let url = self.url(&format!("/api/graph/suggestions/{}", id));
        tracing::debug!(url = %url, limit, "GET suggestions");
        self.send(self.client.get(&url).query(&[("limit", limit)]))
            .await
    }

    async fn find_paths(
        &self,
        source_id: NodeId,
        target_id: NodeId,
        max_depth: u32,
    ) -> Result<PathsResponse, AppError> {
        let url = self.url("/api/graph/paths");
        let params = [
            ("source_id", source_id.to_string()),
            ("target_id", target_id.to_string()),
            ("max_depth", max_depth.to_string()),
        ];
        self.send(self.client.get(&url).query(&params)).await
    }

    async fn reload_graph(&self) -> Result<ReloadResult, AppError> {
        let url = self.url("/api/graph/reload");
        tracing::info!(url = %url, "Requesting backend graph reload");
        self.send(self.client.post(&url)).await
    }

    async fn orphans(&self, tenant_ids: &[String]) -> Result<Vec<KnowledgeNode>, AppError> {
        let url = self.url("/api/graph/orphans");
        self.send(self.client.get(&url).query(&tenant_params(tenant_ids)))
            .await
    }

    async fn heat_stats(
        &self,
        tenant_ids: &[String],
        period: HeatPeriod,
    ) -> Result<Vec<HeatData>, AppError> {
        let url = self.url("/api/metrics/heatmap");
        let mut params = tenant_params(tenant_ids);
        params.push(("period", period.as_str().to_string()));
        tracing::debug!(url = %url, period = %period, "GET heat stats");
        self.send(self.client.get(&url).query(&params)).await
    }

    async fn example_coverage(
        &self,
        tenant_ids: &[String],
    ) -> Result<Vec<ExampleCoverage>, AppError> {
        let url = self.url("/api/metrics/example-coverage");
        self.send(self.client.get(&url).query(&tenant_params(tenant_ids)))
            .await
    }
}
