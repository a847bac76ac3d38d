//! In-memory graph view, layout and heat overlay.
//!
//! ## Module Structure
//!
//! - `model` - Node/edge store for the loaded view (dedup and merge rules)
//! - `layout` - Layered layout assigning 2D coordinates
//! - `heatmap` - Usage heat classification and decoration

mod heatmap;
mod layout;
mod model;

pub use heatmap::{HeatLevel, HeatNode, HeatStyle, HeatmapOverlay};
pub use layout::{Direction, LayoutEngine};
pub use model::{FilteredGraph, GraphFilter, GraphModel, MergeSummary};
