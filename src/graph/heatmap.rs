//! Heatmap overlay: joins usage statistics onto nodes.
//!
//! The overlay decorates render data only. It never changes topology and
//! never looks at node types.

use std::collections::HashMap;

use serde::Serialize;

use crate::models::{HeatData, KnowledgeNode, NodeId};

/// Heat classification, ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HeatLevel {
    /// No recorded hits.
    Never,
    Cold,
    Warm,
    Hot,
    Fire,
}

/// Lower bounds (exclusive for `Cold`) of each level above `Never`.
const WARM_THRESHOLD: f64 = 0.25;
const HOT_THRESHOLD: f64 = 0.5;
const FIRE_THRESHOLD: f64 = 0.75;

/// Visual treatment for a heat level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HeatStyle {
    pub background: &'static str,
    pub border: &'static str,
    pub opacity: f32,
    pub dashed_border: bool,
}

impl HeatLevel {
    /// Classify a heat score. Total over every input: missing, zero,
    /// non-finite and out-of-range scores all map to a level.
    pub fn classify(score: Option<f64>) -> Self {
        let Some(score) = score.filter(|s| s.is_finite()) else {
            return HeatLevel::Never;
        };
        let score = score.clamp(0.0, 1.0);
        if score <= 0.0 {
            HeatLevel::Never
        } else if score < WARM_THRESHOLD {
            HeatLevel::Cold
        } else if score < HOT_THRESHOLD {
            HeatLevel::Warm
        } else if score < FIRE_THRESHOLD {
            HeatLevel::Hot
        } else {
            HeatLevel::Fire
        }
    }

    pub fn style(&self) -> HeatStyle {
        let (background, border) = match self {
            HeatLevel::Never => ("#f3f4f6", "#9ca3af"),
            HeatLevel::Cold => ("#dbeafe", "#3b82f6"),
            HeatLevel::Warm => ("#fef3c7", "#f59e0b"),
            HeatLevel::Hot => ("#fed7aa", "#ea580c"),
            HeatLevel::Fire => ("#fecaca", "#dc2626"),
        };
        let never = matches!(self, HeatLevel::Never);
        HeatStyle {
            background,
            border,
            opacity: if never { 0.5 } else { 1.0 },
            dashed_border: never,
        }
    }
}

/// A node decorated with its usage statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatNode {
    pub node: KnowledgeNode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heat: Option<HeatData>,
    pub level: HeatLevel,
    pub style: HeatStyle,
}

/// Stateless overlay applied in heat view mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeatmapOverlay;

impl HeatmapOverlay {
    /// Attach heat data to each node by id. Nodes without statistics are `Never`.
    pub fn apply(
        &self,
        nodes: &[KnowledgeNode],
        stats: &HashMap<NodeId, HeatData>,
    ) -> Vec<HeatNode> {
        nodes
            .iter()
            .map(|node| {
                let heat = stats.get(&node.id).cloned();
                let level = HeatLevel::classify(heat.as_ref().map(|h| h.heat_score));
                HeatNode {
                    node: node.clone(),
                    heat,
                    level,
                    style: level.style(),
                }
            })
            .collect()
    }

    /// Index a stats listing by node id.
    pub fn index(stats: Vec<HeatData>) -> HashMap<NodeId, HeatData> {
        stats.into_iter().map(|h| (h.node_id, h)).collect()
    }
}
