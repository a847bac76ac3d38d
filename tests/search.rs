//! Search and expansion against the in-memory backend.

mod common;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use common::{concept, context, edge, schema_index, tenant_graph, test_config, FakeGraphApi};
use kgconsole::context::Context;
use kgconsole::models::{ContextNode, ContextResponse, EdgeType, EntryPoint, NodeId, NodeType};
use kgconsole::services::{ExpandParams, ExplorerSession, SearchParams, ViewEvent};

fn params(query: &str) -> SearchParams {
    SearchParams {
        query: query.to_string(),
        tenant_ids: vec!["t1".to_string()],
        node_types: None,
        depth: 3,
        limit: 100,
        include_implicit: true,
    }
}

fn pairs(edges: &[kgconsole::models::KnowledgeEdge]) -> BTreeSet<(NodeId, NodeId)> {
    edges.iter().map(|e| (e.source_id, e.target_id)).collect()
}

fn loaded_ids(session: &ExplorerSession) -> BTreeSet<NodeId> {
    session
        .view()
        .with(|state| state.model.nodes().iter().map(|n| n.id).collect())
}

/// Entry point 1 with context nodes 2 and 3, optionally carrying paths.
fn refund_context(with_paths: bool) -> ContextResponse {
    let path = |p: Vec<NodeId>| if with_paths { Some(p) } else { None };
    ContextResponse {
        entry_points: vec![EntryPoint {
            node: concept(1, "t1"),
            score: 0.92,
        }],
        context_nodes: vec![
            ContextNode {
                node: concept(2, "t1"),
                depth: 1,
                path: path(vec![1, 2]),
            },
            ContextNode {
                node: concept(3, "t1"),
                depth: 2,
                path: path(vec![1, 2, 3]),
            },
        ],
    }
}

// ============================================================================
// Listing (empty query)
// ============================================================================

#[tokio::test]
async fn test_empty_query_loads_tenant_nodes() {
    let api = tenant_graph();
    let session = ExplorerSession::new(&context(&api));

    let outcome = session.search(&params("")).await;

    assert!(outcome.error.is_none());
    assert_eq!(outcome.nodes.len(), 5);
    assert_eq!(outcome.edges.len(), 3);
    assert!(outcome.search_matches.is_empty());
    assert_eq!(outcome.total_nodes, 5);
    assert_eq!(outcome.type_histogram.get(&NodeType::Concept), Some(&5));
    assert!(!loaded_ids(&session).contains(&99));
    assert_eq!(api.calls_to("context_search"), 0);
}

#[tokio::test]
async fn test_empty_query_pages_until_limit() {
    let api = tenant_graph();
    let mut config = test_config();
    config.explorer.page_size = 2;
    let session = ExplorerSession::new(&Context::new(api.clone(), config));

    let mut limited = params("");
    limited.limit = 3;
    let outcome = session.search(&limited).await;

    assert_eq!(outcome.nodes.len(), 3);
    assert_eq!(api.calls_to("list_nodes"), 2);
    // Only edges between loaded nodes survive.
    assert_eq!(pairs(&outcome.edges), BTreeSet::from([(1, 2), (2, 3)]));
}

#[tokio::test]
async fn test_exclude_implicit_edges() {
    let api = tenant_graph();
    let session = ExplorerSession::new(&context(&api));

    let mut explicit = params("");
    explicit.include_implicit = false;
    let outcome = session.search(&explicit).await;

    assert_eq!(outcome.edges.len(), 2);
    assert!(outcome.edges.iter().all(|e| !e.edge_type.is_implicit()));
}

#[tokio::test]
async fn test_implicit_edge_does_not_shadow_authored_edge() {
    // The implicit edge comes back first for the same pair.
    let api = FakeGraphApi::with_graph(
        vec![concept(1, "t1"), concept(2, "t1")],
        vec![
            edge(1, 1, 2, EdgeType::Similar),
            edge(2, 1, 2, EdgeType::Related),
        ],
    );
    let session = ExplorerSession::new(&context(&api));

    let mut explicit = params("");
    explicit.include_implicit = false;
    let outcome = session.search(&explicit).await;

    assert_eq!(outcome.edges.len(), 1);
    assert_eq!(outcome.edges[0].edge_type, EdgeType::Related);
    assert_eq!(outcome.edges[0].id, Some(2));
}

// ============================================================================
// Query
// ============================================================================

#[tokio::test]
async fn test_query_derives_edges_from_paths() {
    let api = tenant_graph();
    api.set_context("refund", refund_context(true));
    let session = ExplorerSession::new(&context(&api));

    let outcome = session.search(&params("refund")).await;

    assert_eq!(outcome.nodes.len(), 3);
    assert_eq!(outcome.search_matches, BTreeSet::from([1]));
    assert_eq!(pairs(&outcome.edges), BTreeSet::from([(1, 2), (2, 3)]));
    assert!(outcome.edges.iter().all(|e| e.edge_type == EdgeType::Related));
    assert_eq!(api.calls_to("list_edges"), 0);
}

#[tokio::test]
async fn test_query_without_paths_looks_up_edges_per_node() {
    let api = tenant_graph();
    api.set_context("refund", refund_context(false));
    let session = ExplorerSession::new(&context(&api));

    let outcome = session.search(&params("refund")).await;

    assert_eq!(api.calls_to("list_edges"), 3);
    assert_eq!(pairs(&outcome.edges), BTreeSet::from([(1, 2), (2, 3)]));
    assert!(outcome.edges.iter().all(|e| e.id.is_some()));
}

#[tokio::test]
async fn test_partial_lookup_failure_keeps_other_results() {
    let api = tenant_graph();
    api.set_context("refund", refund_context(false));
    api.failing_lookups.lock().unwrap().insert(2);
    let session = ExplorerSession::new(&context(&api));

    let outcome = session.search(&params("refund")).await;

    assert!(outcome.error.is_none());
    // Edge 1-2 arrives through node 1's lookup, 2-3 through node 3's.
    assert_eq!(pairs(&outcome.edges), BTreeSet::from([(1, 2), (2, 3)]));
}

#[tokio::test]
async fn test_transport_error_keeps_previous_view() {
    let api = tenant_graph();
    let session = ExplorerSession::new(&context(&api));
    let mut events = session.events().subscribe();
    session.search(&params("")).await;

    api.fail("context_search");
    let outcome = session.search(&params("refund")).await;

    assert!(outcome.error.is_some());
    assert!(outcome.nodes.is_empty());
    assert!(outcome.edges.is_empty());
    assert_eq!(loaded_ids(&session).len(), 5);
    assert!(session.last_error().is_some());

    let mut saw_error = false;
    while let Ok(event) = events.try_recv() {
        saw_error |= matches!(event, ViewEvent::Error(_));
    }
    assert!(saw_error);
}

#[tokio::test(start_paused = true)]
async fn test_stale_search_is_discarded() {
    let api = tenant_graph();
    api.set_context("slow", refund_context(true));
    api.set_context(
        "fast",
        ContextResponse {
            entry_points: vec![EntryPoint {
                node: concept(4, "t1"),
                score: 0.5,
            }],
            context_nodes: Vec::new(),
        },
    );
    api.set_delay("slow", Duration::from_millis(500));
    api.set_delay("fast", Duration::from_millis(10));
    let session = ExplorerSession::new(&context(&api));
    let mut events = session.events().subscribe();

    let (slow_params, fast_params) = (params("slow"), params("fast"));
    let (slow, fast) = tokio::join!(
        session.search(&slow_params),
        session.search(&fast_params)
    );

    assert!(slow.stale);
    assert!(!fast.stale);
    assert_eq!(loaded_ids(&session), BTreeSet::from([4]));
    assert_eq!(
        session.view().with(|state| state.search_matches.clone()),
        BTreeSet::from([4])
    );

    let mut discarded = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let ViewEvent::StaleResponseDiscarded { token } = event {
            discarded.push(token);
        }
    }
    assert_eq!(discarded, vec![slow.token]);
}

#[tokio::test(start_paused = true)]
async fn test_clear_discards_in_flight_search() {
    let api = tenant_graph();
    api.set_context("slow", refund_context(true));
    api.set_delay("slow", Duration::from_millis(200));
    let session = Arc::new(ExplorerSession::new(&context(&api)));

    let pending = {
        let session = session.clone();
        tokio::spawn(async move { session.search(&params("slow")).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    session.clear();

    let outcome = pending.await.unwrap();
    assert!(outcome.stale);
    assert!(loaded_ids(&session).is_empty());
}

// ============================================================================
// Expand
// ============================================================================

#[tokio::test]
async fn test_expand_merges_with_approximate_edges() {
    let api = tenant_graph();
    api.set_context(
        "one",
        ContextResponse {
            entry_points: vec![EntryPoint {
                node: concept(1, "t1"),
                score: 1.0,
            }],
            context_nodes: Vec::new(),
        },
    );
    let session = ExplorerSession::new(&context(&api));
    session.search(&params("one")).await;

    let outcome = session.expand(&ExpandParams::new(1, 2)).await;

    assert!(outcome.error.is_none());
    assert!(outcome.edges_approximate);
    assert_eq!(outcome.added_nodes, 2);
    // Node 3 is two hops away but is wired straight to the center.
    assert_eq!(pairs(&outcome.edges), BTreeSet::from([(1, 2), (1, 3)]));
    assert!(outcome.edges.iter().all(|e| e.is_auto_generated));

    assert_eq!(loaded_ids(&session), BTreeSet::from([1, 2, 3]));
    // Merging keeps the search matches.
    assert_eq!(
        session.view().with(|state| state.search_matches.clone()),
        BTreeSet::from([1])
    );
}

#[tokio::test]
async fn test_expand_filters_neighbor_types() {
    let api = FakeGraphApi::with_graph(
        vec![concept(1, "t1"), concept(2, "t1"), schema_index(3, "t1")],
        vec![
            edge(1, 1, 2, EdgeType::Related),
            edge(2, 1, 3, EdgeType::Parent),
        ],
    );
    let session = ExplorerSession::new(&context(&api));

    let mut expand = ExpandParams::new(1, 1);
    expand.node_types = Some(vec![NodeType::SchemaIndex]);
    expand.edge_types = vec![EdgeType::Parent, EdgeType::Related];
    let outcome = session.expand(&expand).await;

    let ids: BTreeSet<NodeId> = outcome.nodes.iter().map(|n| n.id).collect();
    assert_eq!(ids, BTreeSet::from([1, 3]));
    assert_eq!(outcome.edges.len(), 1);
    assert_eq!(outcome.edges[0].edge_type, EdgeType::Parent);
}

#[tokio::test]
async fn test_expand_failure_leaves_view_intact() {
    let api = tenant_graph();
    let session = ExplorerSession::new(&context(&api));
    session.search(&params("")).await;
    let revision = session.view().with(|state| state.model.revision());

    api.fail("neighbors");
    let outcome = session.expand(&ExpandParams::new(1, 1)).await;

    assert!(outcome.error.is_some());
    assert_eq!(outcome.added_nodes, 0);
    assert_eq!(session.view().with(|state| state.model.revision()), revision);
}
