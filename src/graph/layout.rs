//! Layered (Sugiyama-style) graph layout.
//!
//! Phases:
//! 1. Build a directed graph over the nodes, dropping self-loops and dangling edges
//! 2. Break cycles by discarding DFS back-edges
//! 3. Rank each node by its longest path from a source
//! 4. Order nodes within ranks by the barycenter heuristic
//! 5. Map rank and in-rank order to coordinates
//!
//! Every phase works on node indices sorted by node id, so identical input
//! always produces identical coordinates regardless of input order.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::LayoutConfig;
use crate::models::{KnowledgeEdge, KnowledgeNode, NodeId};

/// Alternating down/up barycenter sweeps before settling on the best ordering.
const ORDERING_PASSES: usize = 8;

/// Flow direction of the layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Direction {
    /// Rank sets `x`; in-rank order sets `y`.
    #[default]
    #[serde(rename = "TB")]
    TopBottom,
    /// Rank sets `y`; in-rank order sets `x`.
    #[serde(rename = "LR")]
    LeftRight,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::TopBottom => "TB",
            Direction::LeftRight => "LR",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            Direction::TopBottom => Direction::LeftRight,
            Direction::LeftRight => Direction::TopBottom,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "TB" | "TD" => Ok(Direction::TopBottom),
            "LR" => Ok(Direction::LeftRight),
            _ => Err(format!("unknown direction '{}' (expected TB or LR)", s)),
        }
    }
}

/// Assigns 2D coordinates to a node/edge set.
#[derive(Debug, Clone, Copy, Default)]
pub struct LayoutEngine {
    config: LayoutConfig,
}

/// Directed graph over node indices (index order == node id order).
struct LayoutGraph {
    ids: Vec<NodeId>,
    adj: Vec<Vec<usize>>,
}

impl LayoutGraph {
    fn build(nodes: &[KnowledgeNode], edges: &[KnowledgeEdge]) -> Self {
        let mut ids: Vec<NodeId> = nodes.iter().map(|n| n.id).collect();
        ids.sort_unstable();
        ids.dedup();
        let index: HashMap<NodeId, usize> = ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();

        let mut pairs: Vec<(usize, usize)> = edges
            .iter()
            .filter_map(|e| Some((*index.get(&e.source_id)?, *index.get(&e.target_id)?)))
            .filter(|(u, v)| u != v)
            .collect();
        pairs.sort_unstable();
        pairs.dedup();

        let mut adj = vec![Vec::new(); ids.len()];
        for (u, v) in pairs {
            adj[u].push(v);
        }
        Self { ids, adj }
    }

    fn len(&self) -> usize {
        self.ids.len()
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Unvisited,
    OnStack,
    Done,
}

/// Drop DFS back-edges so the remaining graph is acyclic.
///
/// Sources are explored first (lowest id first), then any node left
/// unvisited, which only happens inside source-less cycles.
fn break_cycles(adj: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let n = adj.len();
    let mut in_degree = vec![0usize; n];
    for targets in adj {
        for &v in targets {
            in_degree[v] += 1;
        }
    }
    let roots = (0..n)
        .filter(|&v| in_degree[v] == 0)
        .chain((0..n).filter(|&v| in_degree[v] > 0));

    let mut mark = vec![Mark::Unvisited; n];
    let mut dag = vec![Vec::new(); n];
    for root in roots {
        if mark[root] != Mark::Unvisited {
            continue;
        }
        mark[root] = Mark::OnStack;
        let mut stack = vec![(root, 0usize)];
        while let Some(frame) = stack.last_mut() {
            let (u, next) = *frame;
            if next < adj[u].len() {
                frame.1 += 1;
                let v = adj[u][next];
                match mark[v] {
                    // Back edge
                    Mark::OnStack => {}
                    Mark::Unvisited => {
                        dag[u].push(v);
                        mark[v] = Mark::OnStack;
                        stack.push((v, 0));
                    }
                    Mark::Done => dag[u].push(v),
                }
            } else {
                mark[u] = Mark::Done;
                stack.pop();
            }
        }
    }
    for targets in &mut dag {
        targets.sort_unstable();
    }
    dag
}

/// Longest-path ranking over an acyclic graph; sources get rank 0.
fn assign_ranks(dag: &[Vec<usize>]) -> Vec<usize> {
    let n = dag.len();
    let mut in_degree = vec![0usize; n];
    for targets in dag {
        for &v in targets {
            in_degree[v] += 1;
        }
    }

    let mut rank = vec![0usize; n];
    let mut queue: VecDeque<usize> = (0..n).filter(|&v| in_degree[v] == 0).collect();
    while let Some(u) = queue.pop_front() {
        for &v in &dag[u] {
            rank[v] = rank[v].max(rank[u] + 1);
            in_degree[v] -= 1;
            if in_degree[v] == 0 {
                queue.push_back(v);
            }
        }
    }
    rank
}

/// Centered slot of every node within its rank: `pos - (len - 1) / 2`.
fn centered_slots(layers: &[Vec<usize>], n: usize) -> Vec<f64> {
    let mut slots = vec![0.0; n];
    for layer in layers {
        let center = (layer.len() as f64 - 1.0) / 2.0;
        for (pos, &v) in layer.iter().enumerate() {
            slots[v] = pos as f64 - center;
        }
    }
    slots
}

/// Reorder one rank by the mean slot of its neighbours in the reference ranks.
///
/// Nodes without neighbours keep their current slot; ties fall back to the
/// current slot, then node index.
fn barycenter_sort(layer: &mut Vec<usize>, neighbors: &[Vec<usize>], slots: &[f64]) {
    let mut keyed: Vec<(f64, f64, usize)> = layer
        .iter()
        .map(|&v| {
            let adjacent = &neighbors[v];
            let bary = if adjacent.is_empty() {
                slots[v]
            } else {
                adjacent.iter().map(|&u| slots[u]).sum::<f64>() / adjacent.len() as f64
            };
            (bary, slots[v], v)
        })
        .collect();
    keyed.sort_by(|a, b| {
        a.0.total_cmp(&b.0)
            .then_with(|| a.1.total_cmp(&b.1))
            .then_with(|| a.2.cmp(&b.2))
    });
    *layer = keyed.into_iter().map(|(_, _, v)| v).collect();
}

/// Edge crossings between adjacent ranks.
fn count_crossings(layers: &[Vec<usize>], dag: &[Vec<usize>], rank: &[usize]) -> usize {
    let mut pos = vec![0usize; dag.len()];
    for layer in layers {
        for (p, &v) in layer.iter().enumerate() {
            pos[v] = p;
        }
    }

    let mut crossings = 0;
    for (r, layer) in layers.iter().enumerate() {
        let pairs: Vec<(usize, usize)> = layer
            .iter()
            .flat_map(|&u| {
                dag[u]
                    .iter()
                    .filter(|&&v| rank[v] == r + 1)
                    .map(|&v| (pos[u], pos[v]))
                    .collect::<Vec<_>>()
            })
            .collect();
        for i in 0..pairs.len() {
            for j in (i + 1)..pairs.len() {
                let (a1, b1) = pairs[i];
                let (a2, b2) = pairs[j];
                if (a1 < a2 && b1 > b2) || (a1 > a2 && b1 < b2) {
                    crossings += 1;
                }
            }
        }
    }
    crossings
}

/// Group nodes by rank and minimize crossings with alternating sweeps.
fn order_ranks(dag: &[Vec<usize>], rank: &[usize]) -> Vec<Vec<usize>> {
    let n = dag.len();
    let num_ranks = rank.iter().copied().max().map_or(0, |r| r + 1);
    let mut layers: Vec<Vec<usize>> = vec![Vec::new(); num_ranks];
    for v in 0..n {
        layers[rank[v]].push(v);
    }

    let mut predecessors = vec![Vec::new(); n];
    for (u, targets) in dag.iter().enumerate() {
        for &v in targets {
            predecessors[v].push(u);
        }
    }

    let mut best = layers.clone();
    let mut best_crossings = count_crossings(&layers, dag, rank);

    for pass in 0..ORDERING_PASSES {
        if best_crossings == 0 {
            break;
        }
        if pass % 2 == 0 {
            for r in 1..num_ranks {
                let slots = centered_slots(&layers, n);
                barycenter_sort(&mut layers[r], &predecessors, &slots);
            }
        } else {
            for r in (0..num_ranks.saturating_sub(1)).rev() {
                let slots = centered_slots(&layers, n);
                barycenter_sort(&mut layers[r], dag, &slots);
            }
        }
        let crossings = count_crossings(&layers, dag, rank);
        if crossings < best_crossings {
            best_crossings = crossings;
            best = layers.clone();
        }
    }
    best
}

impl LayoutEngine {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Position `nodes` (returned in input order with `x`/`y` set).
    ///
    /// Ranks map to the primary axis (x for TB, y for LR); the in-rank
    /// order maps to the secondary axis, centered on 0.
    pub fn layout(
        &self,
        nodes: &[KnowledgeNode],
        edges: &[KnowledgeEdge],
        direction: Direction,
    ) -> Vec<KnowledgeNode> {
        let graph = LayoutGraph::build(nodes, edges);
        let dag = break_cycles(&graph.adj);
        let rank = assign_ranks(&dag);
        let layers = order_ranks(&dag, &rank);
        let slots = centered_slots(&layers, graph.len());

        let positions: HashMap<NodeId, (f64, f64)> = (0..graph.len())
            .map(|v| {
                let primary = rank[v] as f64 * self.config.rank_spacing;
                let secondary = slots[v] * self.config.node_spacing;
                let xy = match direction {
                    Direction::TopBottom => (primary, secondary),
                    Direction::LeftRight => (secondary, primary),
                };
                (graph.ids[v], xy)
            })
            .collect();

        tracing::debug!(
            nodes = graph.len(),
            ranks = layers.len(),
            direction = %direction,
            "Computed layout"
        );

        nodes
            .iter()
            .map(|node| {
                let mut positioned = node.clone();
                if let Some(&(x, y)) = positions.get(&node.id) {
                    positioned.x = Some(x);
                    positioned.y = Some(y);
                }
                positioned
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConceptContent, EdgeType, NodeContent};

    fn nodes(ids: &[NodeId]) -> Vec<KnowledgeNode> {
        ids.iter()
            .map(|&id| {
                KnowledgeNode::new(
                    id,
                    "t1",
                    format!("n{}", id),
                    NodeContent::Concept(ConceptContent::default()),
                )
            })
            .collect()
    }

    fn edges(pairs: &[(NodeId, NodeId)]) -> Vec<KnowledgeEdge> {
        pairs
            .iter()
            .map(|&(s, t)| KnowledgeEdge::new(s, t, EdgeType::Related, 1.0))
            .collect()
    }

    fn position_of(laid_out: &[KnowledgeNode], id: NodeId) -> (f64, f64) {
        laid_out
            .iter()
            .find(|n| n.id == id)
            .and_then(|n| n.position())
            .unwrap()
    }

    fn engine() -> LayoutEngine {
        LayoutEngine::new(LayoutConfig {
            direction: Direction::TopBottom,
            node_spacing: 100.0,
            rank_spacing: 50.0,
        })
    }

    #[test]
    fn test_chain_ranks_follow_longest_path() {
        let laid_out = engine().layout(
            &nodes(&[1, 2, 3]),
            &edges(&[(1, 2), (2, 3), (1, 3)]),
            Direction::TopBottom,
        );
        assert_eq!(position_of(&laid_out, 1).0, 0.0);
        assert_eq!(position_of(&laid_out, 2).0, 50.0);
        // Longest path 1 -> 2 -> 3, not the direct edge.
        assert_eq!(position_of(&laid_out, 3).0, 100.0);
    }

    #[test]
    fn test_layout_is_deterministic() {
        let ns = nodes(&[5, 3, 9, 1, 7, 2]);
        let es = edges(&[(1, 3), (1, 5), (3, 7), (5, 7), (2, 9), (9, 2), (7, 1)]);
        let first = engine().layout(&ns, &es, Direction::TopBottom);
        let second = engine().layout(&ns, &es, Direction::TopBottom);
        assert_eq!(first, second);

        // Input order does not matter either.
        let mut reversed_nodes = ns.clone();
        reversed_nodes.reverse();
        let mut reversed_edges = es.clone();
        reversed_edges.reverse();
        let third = engine().layout(&reversed_nodes, &reversed_edges, Direction::TopBottom);
        for node in &first {
            assert_eq!(node.position(), Some(position_of(&third, node.id)));
        }
    }

    #[test]
    fn test_cycles_are_broken() {
        let laid_out = engine().layout(
            &nodes(&[1, 2, 3]),
            &edges(&[(1, 2), (2, 3), (3, 1)]),
            Direction::TopBottom,
        );
        let mut xs: Vec<f64> = laid_out.iter().map(|n| n.x.unwrap()).collect();
        xs.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(xs, vec![0.0, 50.0, 100.0]);
    }

    #[test]
    fn test_disconnected_components_start_at_rank_zero() {
        let laid_out = engine().layout(
            &nodes(&[1, 2, 10, 11, 20]),
            &edges(&[(1, 2), (10, 11)]),
            Direction::TopBottom,
        );
        assert_eq!(position_of(&laid_out, 1).0, 0.0);
        assert_eq!(position_of(&laid_out, 10).0, 0.0);
        assert_eq!(position_of(&laid_out, 20).0, 0.0);
        assert_eq!(position_of(&laid_out, 11).0, 50.0);
    }

    #[test]
    fn test_left_right_swaps_axes() {
        let ns = nodes(&[1, 2, 3]);
        let es = edges(&[(1, 2), (1, 3)]);
        let tb = engine().layout(&ns, &es, Direction::TopBottom);
        let lr = engine().layout(&ns, &es, Direction::LeftRight);
        // Rank 1 sits at x = 50 for TB and at y = 50 for LR.
        assert_eq!(position_of(&tb, 2).0, 50.0);
        assert_eq!(position_of(&lr, 2).1, 50.0);
        for id in [1, 2, 3] {
            let (x, y) = position_of(&tb, id);
            assert_eq!(position_of(&lr, id), (y, x));
        }
    }

    #[test]
    fn test_barycenter_removes_crossing() {
        // 1 -> 4 and 2 -> 3: id order in rank 1 would cross.
        let laid_out = engine().layout(
            &nodes(&[1, 2, 3, 4]),
            &edges(&[(1, 4), (2, 3)]),
            Direction::TopBottom,
        );
        assert!(position_of(&laid_out, 1).1 < position_of(&laid_out, 2).1);
        assert!(position_of(&laid_out, 4).1 < position_of(&laid_out, 3).1);
    }

    #[test]
    fn test_ranks_centered_on_zero() {
        let laid_out = engine().layout(&nodes(&[1, 2, 3]), &[], Direction::TopBottom);
        let mut ys: Vec<f64> = laid_out.iter().map(|n| n.y.unwrap()).collect();
        ys.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(ys, vec![-100.0, 0.0, 100.0]);
    }

    #[test]
    fn test_empty_input() {
        assert!(engine().layout(&[], &[], Direction::LeftRight).is_empty());
    }

    #[test]
    fn test_direction_parsing() {
        assert_eq!("tb".parse::<Direction>().unwrap(), Direction::TopBottom);
        assert_eq!("LR".parse::<Direction>().unwrap(), Direction::LeftRight);
        assert!("XY".parse::<Direction>().is_err());
        assert_eq!(Direction::TopBottom.toggled(), Direction::LeftRight);
    }
}
