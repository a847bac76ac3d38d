//! Gap detection: orphans, schema indexes without examples, and
//! connection suggestions.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::api::AppApi;
use crate::error::AppError;
use crate::from_context;
use crate::graph::GraphModel;
use crate::models::{
    ExampleCoverage, KnowledgeEdge, KnowledgeNode, MissingExample, NewEdge, NodeId, Suggestion,
};

use super::edges::EdgeService;
use super::events::{EventBus, ViewEvent};

// ============================================================================
// Suggestion Cycle
// ============================================================================

/// Suggestions from the latest fetch and which of them were acted on.
#[derive(Debug, Default)]
struct SuggestionCycle {
    /// Node the suggestions were fetched for.
    source: Option<NodeId>,
    active: Vec<Suggestion>,
    handled: HashSet<NodeId>,
    in_flight: HashSet<NodeId>,
    cycle: u64,
}

impl SuggestionCycle {
    /// Claim `target_id` for an apply or dismiss in the current cycle.
    fn claim(&mut self, target_id: NodeId) -> Result<(NodeId, Suggestion), AppError> {
        let source = self.source.ok_or(AppError::NoSelection)?;
        if self.handled.contains(&target_id) || self.in_flight.contains(&target_id) {
            return Err(AppError::SuggestionAlreadyHandled(target_id));
        }
        let suggestion = self
            .active
            .iter()
            .find(|s| s.target_id == target_id)
            .cloned()
            .ok_or(AppError::UnknownSuggestion(target_id))?;
        Ok((source, suggestion))
    }

    fn resolve(&mut self, target_id: NodeId) {
        self.handled.insert(target_id);
        self.active.retain(|s| s.target_id != target_id);
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Surfaces actionable gaps in the knowledge graph.
///
/// Orphan detection is a pure query over a [`GraphModel`]. Missing-example
/// detection aggregates backend coverage counts. Suggestions are fetched per
/// node and can be applied or dismissed once each per fetch.
#[derive(Clone)]
pub struct GapDetectionEngine {
    api: AppApi,
    edges: EdgeService,
    events: EventBus,
    suggestions: Arc<Mutex<SuggestionCycle>>,
}

// Each resolved engine runs its own suggestion cycle.
from_context!(GapDetectionEngine { api, edges, events; suggestions });

impl GapDetectionEngine {
    pub fn new(api: AppApi, events: EventBus) -> Self {
        Self {
            edges: EdgeService::new(api.clone()),
            api,
            events,
            suggestions: Arc::default(),
        }
    }

    fn cycle(&self) -> MutexGuard<'_, SuggestionCycle> {
        self.suggestions.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Nodes with no incident edge.
    ///
    /// With a tenant, only that tenant's nodes are considered and only
    /// edges between two of them count.
    pub fn find_orphans(model: &GraphModel, tenant_id: Option<&str>) -> Vec<KnowledgeNode> {
        let in_scope = |node: &KnowledgeNode| tenant_id.map_or(true, |t| node.tenant_id == t);
        let scoped: HashSet<NodeId> = model
            .nodes()
            .iter()
            .filter(|n| in_scope(n))
            .map(|n| n.id)
            .collect();

        let mut connected = HashSet::new();
        for edge in model.edges() {
            if scoped.contains(&edge.source_id) && scoped.contains(&edge.target_id) {
                connected.insert(edge.source_id);
                connected.insert(edge.target_id);
            }
        }

        model
            .nodes()
            .iter()
            .filter(|n| scoped.contains(&n.id) && !connected.contains(&n.id))
            .cloned()
            .collect()
    }

    /// Orphans over the backend's full tenant-scoped graph.
    pub async fn remote_orphans(&self, tenant_ids: &[String]) -> Result<Vec<KnowledgeNode>, AppError> {
        let orphans = self.api.orphans(tenant_ids).await?;
        tracing::debug!(count = orphans.len(), "Fetched orphan nodes");
        Ok(orphans)
    }

    /// Schema indexes that have no `example_of` edge pointing at them.
    pub async fn missing_examples(
        &self,
        tenant_ids: &[String],
    ) -> Result<Vec<MissingExample>, AppError> {
        let coverage = self.api.example_coverage(tenant_ids).await?;
        Ok(flag_missing_examples(coverage))
    }

    // ========================================================================
    // Connection Suggestions
    // ========================================================================

    /// Fetch up to `limit` ranked suggestions for `node_id`, starting a new
    /// cycle. A fetch superseded by a later one is returned but not installed.
    pub async fn fetch_suggestions(
        &self,
        node_id: NodeId,
        limit: u32,
    ) -> Result<Vec<Suggestion>, AppError> {
        let cycle = {
            let mut state = self.cycle();
            state.cycle += 1;
            state.cycle
        };

        let mut suggestions = self.api.suggestions(node_id, limit).await?;
        suggestions.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then(a.target_id.cmp(&b.target_id))
        });
        suggestions.truncate(limit as usize);

        let installed = {
            let mut state = self.cycle();
            if state.cycle == cycle {
                state.source = Some(node_id);
                state.active = suggestions.clone();
                state.handled.clear();
                state.in_flight.clear();
                true
            } else {
                false
            }
        };

        if installed {
            tracing::debug!(node_id, count = suggestions.len(), "Fetched suggestions");
            self.events
                .publish(ViewEvent::SuggestionsChanged(suggestions.len()));
        }
        Ok(suggestions)
    }

    /// Suggestions not yet applied or dismissed.
    pub fn active_suggestions(&self) -> Vec<Suggestion> {
        self.cycle().active.clone()
    }

    /// Node the active suggestions belong to.
    pub fn suggestion_source(&self) -> Option<NodeId> {
        self.cycle().source
    }

    /// Persist the suggested edge with `weight = confidence`.
    ///
    /// The suggestion leaves the active list only if creation succeeds; a
    /// failed apply can be retried.
    pub async fn apply(&self, target_id: NodeId) -> Result<KnowledgeEdge, AppError> {
        let (cycle, source, suggestion) = {
            let mut state = self.cycle();
            let (source, suggestion) = state.claim(target_id)?;
            state.in_flight.insert(target_id);
            (state.cycle, source, suggestion)
        };

        let request = NewEdge::new(source, target_id, suggestion.edge_type)
            .with_weight(suggestion.confidence);
        let result = self.edges.create_edge(request).await;

        let remaining = {
            let mut state = self.cycle();
            state.in_flight.remove(&target_id);
            if result.is_ok() && state.cycle == cycle {
                state.resolve(target_id);
            }
            state.active.len()
        };

        match result {
            Ok(edge) => {
                tracing::info!(source_id = source, target_id, confidence = suggestion.confidence, "Applied suggestion");
                self.events.publish(ViewEvent::SuggestionsChanged(remaining));
                Ok(edge)
            }
            Err(err) => {
                tracing::warn!(source_id = source, target_id, error = %err, "Applying suggestion failed");
                self.events.publish(ViewEvent::Error(err.to_string()));
                Err(err)
            }
        }
    }

    /// Drop a suggestion without persisting anything.
    pub fn dismiss(&self, target_id: NodeId) -> Result<(), AppError> {
        let remaining = {
            let mut state = self.cycle();
            state.claim(target_id)?;
            state.resolve(target_id);
            state.active.len()
        };
        tracing::debug!(target_id, "Dismissed suggestion");
        self.events.publish(ViewEvent::SuggestionsChanged(remaining));
        Ok(())
    }
}

/// Turn coverage counts into flags for indexes with zero examples.
pub fn flag_missing_examples(coverage: Vec<ExampleCoverage>) -> Vec<MissingExample> {
    coverage
        .into_iter()
        .filter(|c| c.example_count == 0)
        .map(|c| {
            let suggestion = match &c.dataset_name {
                Some(dataset) => format!(
                    "Add a query example showing how to search '{}' ({})",
                    c.title, dataset
                ),
                None => format!("Add a query example showing how to search '{}'", c.title),
            };
            MissingExample {
                node_id: c.node_id,
                title: c.title,
                dataset_name: c.dataset_name,
                suggestion,
            }
        })
        .collect()
}
