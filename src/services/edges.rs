//! Edge persistence.

use crate::api::AppApi;
use crate::error::AppError;
use crate::from_context;
use crate::models::{BulkEdgeError, BulkEdgeResult, KnowledgeEdge, NewEdge};

/// Creates and deletes edges through the backend.
///
/// Self-loops are rejected locally; they never reach the API.
#[derive(Clone)]
pub struct EdgeService {
    api: AppApi,
}

from_context!(EdgeService { api });

impl EdgeService {
    pub fn new(api: AppApi) -> Self {
        Self { api }
    }

    /// Persist one edge. The weight is clamped to `[0, 1]`.
    pub async fn create_edge(&self, edge: NewEdge) -> Result<KnowledgeEdge, AppError> {
        if edge.source_id == edge.target_id {
            return Err(AppError::SelfLoop(edge.source_id));
        }
        let weight = edge.weight;
        let edge = edge.with_weight(weight);
        let created = self.api.create_edge(&edge).await?;
        tracing::info!(
            source_id = created.source_id,
            target_id = created.target_id,
            edge_type = %created.edge_type,
            "Created edge"
        );
        Ok(created)
    }

    /// Persist many edges in one request.
    ///
    /// Error indices in the result refer to positions in `edges`, including
    /// self-loops rejected before the request was sent.
    pub async fn create_edges_bulk(&self, edges: &[NewEdge]) -> Result<BulkEdgeResult, AppError> {
        let batch = BulkBatch::partition(edges);

        let mut result = if batch.to_send.is_empty() {
            BulkEdgeResult::default()
        } else {
            self.api.create_edges_bulk(&batch.to_send).await?
        };

        let mut errors = batch.rejected;
        errors.extend(result.errors.drain(..).map(|e| BulkEdgeError {
            index: batch.origin.get(e.index).copied().unwrap_or(e.index),
            error: e.error,
        }));
        errors.sort_by_key(|e| e.index);
        result.errors = errors;

        tracing::info!(
            submitted = edges.len(),
            created = result.created,
            failed = result.errors.len(),
            "Bulk edge creation finished"
        );
        Ok(result)
    }

    pub async fn delete_edge(&self, id: i64) -> Result<(), AppError> {
        self.api.delete_edge(id).await?;
        tracing::info!(edge_id = id, "Deleted edge");
        Ok(())
    }
}

/// Bulk input split into what is sent and what was rejected locally.
struct BulkBatch {
    to_send: Vec<NewEdge>,
    /// `origin[i]` is the caller index of `to_send[i]`.
    origin: Vec<usize>,
    rejected: Vec<BulkEdgeError>,
}

impl BulkBatch {
    fn partition(edges: &[NewEdge]) -> Self {
        let mut batch = Self {
            to_send: Vec::with_capacity(edges.len()),
            origin: Vec::with_capacity(edges.len()),
            rejected: Vec::new(),
        };
        for (index, edge) in edges.iter().enumerate() {
            if edge.source_id == edge.target_id {
                batch.rejected.push(BulkEdgeError {
                    index,
                    error: AppError::SelfLoop(edge.source_id).to_string(),
                });
            } else {
                batch.to_send.push(edge.clone().with_weight(edge.weight));
                batch.origin.push(index);
            }
        }
        batch
    }
}
