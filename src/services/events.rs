//! State-change notifications for the exploration engine.

use tokio::sync::broadcast;

use crate::graph::Direction;
use crate::models::{HeatPeriod, KnowledgeEdge, NodeId};

const DEFAULT_CAPACITY: usize = 256;

/// Something observable changed.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    /// A search replaced the whole view.
    ViewReplaced {
        token: u64,
        nodes: usize,
        edges: usize,
    },
    /// An expansion or edit was merged into the view.
    ViewMerged {
        token: u64,
        added_nodes: usize,
        added_edges: usize,
    },
    Cleared,
    SelectionChanged(Option<NodeId>),
    /// First click of a two-click edge gesture (or its cancellation).
    PendingSourceChanged(Option<NodeId>),
    EdgeModeChanged(bool),
    EdgeCreated(KnowledgeEdge),
    EdgeDeleted(KnowledgeEdge),
    DirectionChanged(Direction),
    SuggestionsChanged(usize),
    HeatUpdated(HeatPeriod),
    /// A response arrived after a newer request superseded it.
    StaleResponseDiscarded { token: u64 },
    Error(String),
}

/// Publish/subscribe hub backed by a broadcast channel.
///
/// Publishing with no subscribers is not an error; slow subscribers that
/// fall behind the channel capacity observe a lag error on their receiver.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ViewEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ViewEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: ViewEvent) {
        // Err only means nobody is listening.
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
