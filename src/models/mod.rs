//! Domain models for the knowledge graph view.

mod edge;
mod graph;
mod heat;
mod node;
mod suggestion;

pub use edge::{clamp_unit, EdgeKey, EdgeType, KnowledgeEdge, NewEdge};
pub use graph::{
    BulkEdgeError, BulkEdgeResult, ContextNode, ContextRequest, ContextResponse, EdgeDirection,
    EdgeListQuery, EntryPoint, ExampleCoverage, GraphStats, Neighbor, NeighborsResponse,
    NodeListQuery, NodePage, PathsResponse, ReloadResult,
};
pub use heat::{HeatData, HeatPeriod};
pub use node::{
    ConceptContent, EntityContent, ExampleContent, FaqContent, KnowledgeNode, NodeContent, NodeId,
    NodeStatus, NodeType, PermissionRuleContent, PlaybookContent, SchemaFieldContent,
    SchemaIndexContent, Visibility,
};
pub use suggestion::{MissingExample, Suggestion};
