//! Page-level controller tying the view, retrieval, layout, heat overlay,
//! edge authoring and suggestions together.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::api::AppApi;
use crate::config::Config;
use crate::context::Context;
use crate::error::AppError;
use crate::graph::{Direction, GraphFilter, HeatLevel, HeatStyle, HeatmapOverlay, LayoutEngine};
use crate::models::{
    EdgeKey, EdgeType, HeatData, HeatPeriod, KnowledgeEdge, KnowledgeNode, NewEdge, NodeId,
    Suggestion,
};

use super::authoring::ClickOutcome;
use super::debounce::Debouncer;
use super::edges::EdgeService;
use super::events::{EventBus, ViewEvent};
use super::gaps::GapDetectionEngine;
use super::search::{
    ExpandOutcome, ExpandParams, SearchExpansionController, SearchOutcome, SearchParams,
};
use super::tokens::RequestTokens;
use super::view::{SharedView, ViewState};

// ============================================================================
// View Mode
// ============================================================================

/// Which decoration the renderer applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    #[default]
    Graph,
    Heat,
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewMode::Graph => write!(f, "graph"),
            ViewMode::Heat => write!(f, "heat"),
        }
    }
}

impl FromStr for ViewMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "graph" => Ok(ViewMode::Graph),
            "heat" => Ok(ViewMode::Heat),
            other => Err(AppError::Validation(format!("unknown view mode '{}'", other))),
        }
    }
}

// ============================================================================
// Render Output
// ============================================================================

/// A positioned node with its display flags.
#[derive(Debug, Clone, Serialize)]
pub struct RenderNode {
    pub node: KnowledgeNode,
    pub is_search_match: bool,
    pub is_selected: bool,
    pub is_pending_source: bool,
    /// Heat decoration, present in [`ViewMode::Heat`] only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heat: Option<HeatData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heat_level: Option<HeatLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<HeatStyle>,
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, Serialize)]
pub struct RenderGraph {
    pub nodes: Vec<RenderNode>,
    pub edges: Vec<KnowledgeEdge>,
    pub direction: Direction,
    pub mode: ViewMode,
}

/// What a node click did.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeClick {
    /// Edge mode off: selection toggled to this value.
    Selected(Option<NodeId>),
    /// First endpoint of a new edge chosen.
    SourcePending(NodeId),
    /// Pending source clicked again.
    Unchanged,
    EdgeCreated(KnowledgeEdge),
}

// ============================================================================
// Type-ahead
// ============================================================================

/// Debounced search input bound to a session.
///
/// Each query the debouncer forwards runs one search with the base
/// parameters and the typed text.
pub struct TypeAhead {
    input: Debouncer<String>,
    task: JoinHandle<Option<SearchOutcome>>,
}

impl TypeAhead {
    /// Record the full query text after a keystroke.
    pub fn push(&self, query: impl Into<String>) {
        self.input.push(query.into());
    }

    /// Flush the pending query and wait for the searches to finish.
    ///
    /// Returns the outcome of the last search run, if any.
    pub async fn finish(self) -> Option<SearchOutcome> {
        drop(self.input);
        match self.task.await {
            Ok(last) => last,
            Err(err) => {
                tracing::warn!(error = %err, "Type-ahead task ended abnormally");
                None
            }
        }
    }
}

// ============================================================================
// Session
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct LayoutKey {
    revision: u64,
    direction: Direction,
    filter: GraphFilter,
}

#[derive(Debug, Default)]
struct UiState {
    mode: ViewMode,
    direction: Direction,
    heat_period: HeatPeriod,
    heat_stats: Option<HashMap<NodeId, HeatData>>,
    /// Tenants of the last search, used for heat statistics.
    tenant_ids: Vec<String>,
    layout_cache: Option<(LayoutKey, Vec<KnowledgeNode>)>,
    layout_runs: u64,
}

/// One exploration session over the shared view.
///
/// Lock order is view, then UI state; neither is held across an await.
pub struct ExplorerSession {
    api: AppApi,
    config: Arc<Config>,
    events: EventBus,
    view: SharedView,
    tokens: Arc<RequestTokens>,
    search: SearchExpansionController,
    edges: EdgeService,
    gaps: GapDetectionEngine,
    layout: LayoutEngine,
    overlay: HeatmapOverlay,
    ui: Mutex<UiState>,
}

impl ExplorerSession {
    pub fn new(ctx: &Context) -> Self {
        let view = SharedView::new();
        let tokens = Arc::new(RequestTokens::new());
        let config: Arc<Config> = ctx.resolve();
        let search = SearchExpansionController::new(
            ctx.resolve(),
            view.clone(),
            tokens.clone(),
            ctx.resolve(),
            &config.explorer,
        );
        let ui = UiState {
            direction: config.layout.direction,
            tenant_ids: config.explorer.tenant_ids.clone(),
            ..Default::default()
        };

        Self {
            api: ctx.resolve(),
            events: ctx.resolve(),
            edges: ctx.resolve(),
            gaps: ctx.resolve(),
            layout: LayoutEngine::new(config.layout),
            overlay: HeatmapOverlay,
            config,
            view,
            tokens,
            search,
            ui: Mutex::new(ui),
        }
    }

    fn ui(&self) -> MutexGuard<'_, UiState> {
        self.ui.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ========================================================================
    // Retrieval
    // ========================================================================

    pub async fn search(&self, params: &SearchParams) -> SearchOutcome {
        {
            let mut ui = self.ui();
            if ui.tenant_ids != params.tenant_ids {
                ui.tenant_ids = params.tenant_ids.clone();
                // Heat statistics are per tenant set.
                ui.heat_stats = None;
            }
        }
        self.search.search(params).await
    }

    /// Start debounced searching for typed input.
    ///
    /// Queries pushed within `explorer.debounce_ms` of each other collapse
    /// into one search for the last of them.
    pub fn type_ahead(self: &Arc<Self>, base: SearchParams) -> TypeAhead {
        let (input, mut queries) = Debouncer::spawn(self.config.explorer.debounce());
        let session = Arc::clone(self);
        let task = tokio::spawn(async move {
            let mut last = None;
            while let Some(query) = queries.recv().await {
                let params = SearchParams {
                    query,
                    ..base.clone()
                };
                let outcome = session.search(&params).await;
                tracing::debug!(
                    query = %params.query,
                    nodes = outcome.nodes.len(),
                    stale = outcome.stale,
                    "Type-ahead search finished"
                );
                last = Some(outcome);
            }
            last
        });
        TypeAhead { input, task }
    }

    pub async fn expand(&self, params: &ExpandParams) -> ExpandOutcome {
        self.search.expand(params).await
    }

    /// Reset model, search matches, selection and pending source at once.
    /// In-flight requests are invalidated.
    pub fn clear(&self) {
        self.tokens.invalidate();
        self.view.with(ViewState::clear);
        tracing::debug!("View cleared");
        self.events.publish(ViewEvent::Cleared);
    }

    // ========================================================================
    // Interaction
    // ========================================================================

    /// Route a node click to edge authoring when armed, else to selection.
    pub async fn click_node(&self, node_id: NodeId) -> Result<NodeClick, AppError> {
        let outcome = self.view.with(|state| {
            if !state.model.contains_node(node_id) {
                return Err(AppError::NodeNotFound(node_id));
            }
            let outcome = state.authoring.click_node(node_id);
            if outcome == ClickOutcome::NotArmed {
                state.selection = match state.selection {
                    Some(current) if current == node_id => None,
                    _ => Some(node_id),
                };
            }
            Ok((outcome, state.selection))
        });

        match outcome? {
            (ClickOutcome::NotArmed, selection) => {
                self.events.publish(ViewEvent::SelectionChanged(selection));
                Ok(NodeClick::Selected(selection))
            }
            (ClickOutcome::SourcePending(source), _) => {
                self.events
                    .publish(ViewEvent::PendingSourceChanged(Some(source)));
                Ok(NodeClick::SourcePending(source))
            }
            (ClickOutcome::Unchanged, _) => Ok(NodeClick::Unchanged),
            (ClickOutcome::CreateEdge(request), _) => {
                self.events.publish(ViewEvent::PendingSourceChanged(None));
                let edge = NewEdge::new(request.source_id, request.target_id, EdgeType::Related);
                let created = self.persist_edge(self.edges.create_edge(edge).await)?;
                Ok(NodeClick::EdgeCreated(created))
            }
        }
    }

    /// Cancel a pending edge source when armed, else clear the selection.
    pub fn click_background(&self) {
        let armed = self.view.with(|state| {
            if state.authoring.click_background() {
                true
            } else {
                state.selection = None;
                false
            }
        });
        if armed {
            self.events.publish(ViewEvent::PendingSourceChanged(None));
        } else {
            self.events.publish(ViewEvent::SelectionChanged(None));
        }
    }

    pub fn enable_edge_mode(&self) {
        self.view.with(|state| state.authoring.enable_mode());
        self.events.publish(ViewEvent::EdgeModeChanged(true));
    }

    pub fn disable_edge_mode(&self) {
        self.view.with(|state| state.authoring.disable_mode());
        self.events.publish(ViewEvent::EdgeModeChanged(false));
    }

    /// Delete a loaded edge on the backend and drop it from the view.
    pub async fn delete_edge(&self, key: &EdgeKey) -> Result<KnowledgeEdge, AppError> {
        let id = self
            .view
            .with(|state| state.model.edge(key).map(|e| e.id))
            .ok_or_else(|| AppError::Validation("edge is not loaded".to_string()))?
            .ok_or_else(|| AppError::Validation("edge has no backend id".to_string()))?;

        self.edges.delete_edge(id).await?;

        let removed = self.view.with(|state| state.model.remove_edge(key));
        match removed {
            Some(edge) => {
                self.events.publish(ViewEvent::EdgeDeleted(edge.clone()));
                Ok(edge)
            }
            None => Err(AppError::Validation("edge is not loaded".to_string())),
        }
    }

    fn persist_edge(
        &self,
        result: Result<KnowledgeEdge, AppError>,
    ) -> Result<KnowledgeEdge, AppError> {
        match result {
            Ok(edge) => {
                self.view.with(|state| {
                    state.model.merge(Vec::new(), vec![edge.clone()]);
                    state.last_error = None;
                });
                self.events.publish(ViewEvent::EdgeCreated(edge.clone()));
                Ok(edge)
            }
            Err(err) => {
                tracing::warn!(error = %err, "Edge creation failed");
                self.view
                    .with(|state| state.last_error = Some(err.to_string()));
                self.events.publish(ViewEvent::Error(err.to_string()));
                Err(err)
            }
        }
    }

    // ========================================================================
    // Suggestions
    // ========================================================================

    /// Fetch suggestions for the selected node.
    pub async fn suggest_for_selection(&self) -> Result<Vec<Suggestion>, AppError> {
        let selected = self.selection().ok_or(AppError::NoSelection)?;
        self.gaps
            .fetch_suggestions(selected, self.config.explorer.suggestion_limit)
            .await
    }

    /// Apply a suggestion and merge the created edge into the view.
    pub async fn apply_suggestion(&self, target_id: NodeId) -> Result<KnowledgeEdge, AppError> {
        let edge = self.gaps.apply(target_id).await?;
        self.persist_edge(Ok(edge))
    }

    pub fn dismiss_suggestion(&self, target_id: NodeId) -> Result<(), AppError> {
        self.gaps.dismiss(target_id)
    }

    /// Orphans among the loaded nodes of `tenant_id` (all tenants if `None`).
    pub fn orphans(&self, tenant_id: Option<&str>) -> Vec<KnowledgeNode> {
        self.view
            .with(|state| GapDetectionEngine::find_orphans(&state.model, tenant_id))
    }

    // ========================================================================
    // Display
    // ========================================================================

    /// Change the flow direction. The next render recomputes the layout.
    pub fn set_direction(&self, direction: Direction) {
        {
            let mut ui = self.ui();
            if ui.direction == direction {
                return;
            }
            ui.direction = direction;
            ui.layout_cache = None;
        }
        self.events.publish(ViewEvent::DirectionChanged(direction));
    }

    /// Switch decoration. Positions are kept; heat data is fetched on first use.
    pub async fn set_view_mode(&self, mode: ViewMode) -> Result<(), AppError> {
        let needs_heat = {
            let mut ui = self.ui();
            ui.mode = mode;
            mode == ViewMode::Heat && ui.heat_stats.is_none()
        };
        if needs_heat {
            self.refresh_heat().await?;
        }
        Ok(())
    }

    /// Change the heat period and re-fetch statistics.
    pub async fn set_heat_period(&self, period: HeatPeriod) -> Result<(), AppError> {
        {
            let mut ui = self.ui();
            ui.heat_period = period;
            ui.heat_stats = None;
        }
        self.refresh_heat().await
    }

    async fn refresh_heat(&self) -> Result<(), AppError> {
        let (tenant_ids, period) = {
            let ui = self.ui();
            (ui.tenant_ids.clone(), ui.heat_period)
        };
        let stats = match self.api.heat_stats(&tenant_ids, period).await {
            Ok(stats) => stats,
            Err(err) => {
                tracing::warn!(period = %period, error = %err, "Fetching heat statistics failed");
                self.events.publish(ViewEvent::Error(err.to_string()));
                return Err(err);
            }
        };
        tracing::debug!(period = %period, nodes = stats.len(), "Fetched heat statistics");

        {
            let mut ui = self.ui();
            // A period change while this request ran wins.
            if ui.heat_period == period {
                ui.heat_stats = Some(HeatmapOverlay::index(stats));
            }
        }
        self.events.publish(ViewEvent::HeatUpdated(period));
        Ok(())
    }

    /// Project, lay out and decorate the current view.
    ///
    /// The layout is reused while the model revision, direction and filter
    /// are unchanged.
    pub fn render(&self, filter: &GraphFilter) -> RenderGraph {
        let (revision, filtered, matches, selection, pending) = self.view.with(|state| {
            (
                state.model.revision(),
                state.model.filter(filter),
                state.search_matches.clone(),
                state.selection,
                state.authoring.pending_source(),
            )
        });

        let mut ui = self.ui();
        let key = LayoutKey {
            revision,
            direction: ui.direction,
            filter: filter.clone(),
        };
        let cached = match &ui.layout_cache {
            Some((cached, nodes)) if *cached == key => Some(nodes.clone()),
            _ => None,
        };
        let positioned = match cached {
            Some(nodes) => nodes,
            None => {
                let nodes = self
                    .layout
                    .layout(&filtered.nodes, &filtered.edges, ui.direction);
                ui.layout_runs += 1;
                ui.layout_cache = Some((key, nodes.clone()));
                nodes
            }
        };

        let flags = |node: KnowledgeNode| RenderNode {
            is_search_match: matches.contains(&node.id),
            is_selected: selection == Some(node.id),
            is_pending_source: pending == Some(node.id),
            node,
            heat: None,
            heat_level: None,
            style: None,
        };

        let nodes = match ui.mode {
            ViewMode::Graph => positioned.into_iter().map(flags).collect(),
            ViewMode::Heat => {
                let empty = HashMap::new();
                let stats = ui.heat_stats.as_ref().unwrap_or(&empty);
                self.overlay
                    .apply(&positioned, stats)
                    .into_iter()
                    .map(|heat_node| RenderNode {
                        heat: heat_node.heat,
                        heat_level: Some(heat_node.level),
                        style: Some(heat_node.style),
                        ..flags(heat_node.node)
                    })
                    .collect()
            }
        };

        RenderGraph {
            nodes,
            edges: filtered.edges,
            direction: ui.direction,
            mode: ui.mode,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn view(&self) -> &SharedView {
        &self.view
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn gaps(&self) -> &GapDetectionEngine {
        &self.gaps
    }

    pub fn selection(&self) -> Option<NodeId> {
        self.view.with(|state| state.selection)
    }

    pub fn pending_source(&self) -> Option<NodeId> {
        self.view.with(|state| state.authoring.pending_source())
    }

    pub fn last_error(&self) -> Option<String> {
        self.view.with(|state| state.last_error.clone())
    }

    pub fn mode(&self) -> ViewMode {
        self.ui().mode
    }

    pub fn direction(&self) -> Direction {
        self.ui().direction
    }

    pub fn heat_period(&self) -> HeatPeriod {
        self.ui().heat_period
    }

    /// Number of layout computations so far.
    pub fn layout_runs(&self) -> u64 {
        self.ui().layout_runs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_mode_parse() {
        assert_eq!("heat".parse::<ViewMode>().unwrap(), ViewMode::Heat);
        assert_eq!("Graph".parse::<ViewMode>().unwrap(), ViewMode::Graph);
        assert!("radar".parse::<ViewMode>().is_err());
    }
}
