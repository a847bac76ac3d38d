//! kgconsole - Knowledge Graph Console
//!
//! Interactive exploration engine for a multi-tenant knowledge graph:
//! an in-memory view model, incremental search and expansion against the
//! backend REST API, layered layout, heatmap decoration, two-click edge
//! authoring and gap detection.

pub mod api;
pub mod cli;
pub mod config;
pub mod context;
pub mod di;
pub mod error;
pub mod graph;
pub mod models;
pub mod services;

// Re-export FromRef at crate root for from_context! generated code
pub use di::FromRef;
