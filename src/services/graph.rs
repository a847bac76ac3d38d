//! Graph-wide backend operations: statistics, path finding and rebuilds.

use crate::api::AppApi;
use crate::error::AppError;
use crate::from_context;
use crate::models::{GraphStats, NodeId, PathsResponse, ReloadResult};

const DEFAULT_PATH_DEPTH: u32 = 4;

/// Service for operations over the backend's whole graph rather than the
/// loaded view.
#[derive(Clone)]
pub struct GraphService {
    api: AppApi,
}

from_context!(GraphService { api });

impl GraphService {
    pub fn new(api: AppApi) -> Self {
        Self { api }
    }

    /// Node/edge counts, density and orphan count for the given tenants.
    pub async fn stats(&self, tenant_ids: &[String]) -> Result<GraphStats, AppError> {
        self.api.graph_stats(tenant_ids).await
    }

    /// Paths between two nodes, up to `max_depth` hops (0 selects the default).
    pub async fn find_paths(
        &self,
        source_id: NodeId,
        target_id: NodeId,
        max_depth: u32,
    ) -> Result<PathsResponse, AppError> {
        if source_id == target_id {
            return Err(AppError::Validation(
                "source and target must differ".to_string(),
            ));
        }
        let max_depth = if max_depth == 0 {
            DEFAULT_PATH_DEPTH
        } else {
            max_depth
        };
        let paths = self.api.find_paths(source_id, target_id, max_depth).await?;
        tracing::debug!(source_id, target_id, found = paths.paths.len(), "Found paths");
        Ok(paths)
    }

    /// Force the backend to rebuild its graph from storage.
    pub async fn reload(&self) -> Result<ReloadResult, AppError> {
        let result = self.api.reload_graph().await?;
        tracing::info!(status = %result.status, "Graph reloaded");
        Ok(result)
    }
}
