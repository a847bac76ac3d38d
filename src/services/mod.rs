//! Exploration services.
//!
//! [`ExplorerSession`] is the page-level controller. It owns the shared
//! view and delegates to the retrieval controller, the edge and graph
//! services, and the gap detection engine. Services resolve their
//! dependencies from the [`Context`](crate::context::Context).

mod authoring;
mod debounce;
mod edges;
mod events;
mod gaps;
mod graph;
mod search;
mod session;
mod tokens;
mod view;

pub use authoring::{AuthoringState, ClickOutcome, EdgeAuthoringStateMachine, EdgeRequest};
pub use debounce::Debouncer;
pub use edges::EdgeService;
pub use events::{EventBus, ViewEvent};
pub use gaps::{flag_missing_examples, GapDetectionEngine};
pub use graph::GraphService;
pub use search::{
    ExpandOutcome, ExpandParams, SearchExpansionController, SearchOutcome, SearchParams,
};
pub use session::{ExplorerSession, NodeClick, RenderGraph, RenderNode, TypeAhead, ViewMode};
pub use tokens::{ExpandTicket, RequestTokens};
pub use view::{SharedView, ViewState};
