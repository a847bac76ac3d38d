//! Two-click interactive edge creation.
//!
//! ```text
//!   Disabled --enable--> Armed(None) --click a--> Armed(Some(a))
//!                           ^                        |   |
//!                           |  click b (b != a):     |   | click a: no-op
//!                           +-- emit CreateEdge(a,b) +   |
//!                           +-- click background --------+
//!   any --disable--> Disabled
//! ```

use serde::Serialize;

use crate::models::NodeId;

/// Current mode of the edge authoring interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AuthoringState {
    #[default]
    Disabled,
    Armed { pending_source: Option<NodeId> },
}

/// A completed two-click gesture. `source_id != target_id` always.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EdgeRequest {
    pub source_id: NodeId,
    pub target_id: NodeId,
}

/// What a node click did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Edge mode is off; the click is a selection.
    NotArmed,
    /// The clicked node became the pending source.
    SourcePending(NodeId),
    /// Clicked the pending source again.
    Unchanged,
    /// Second endpoint chosen.
    CreateEdge(EdgeRequest),
}

/// State machine for the two-click gesture.
#[derive(Debug, Clone, Default)]
pub struct EdgeAuthoringStateMachine {
    state: AuthoringState,
}

impl EdgeAuthoringStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> AuthoringState {
        self.state
    }

    pub fn is_armed(&self) -> bool {
        matches!(self.state, AuthoringState::Armed { .. })
    }

    pub fn pending_source(&self) -> Option<NodeId> {
        match self.state {
            AuthoringState::Armed { pending_source } => pending_source,
            AuthoringState::Disabled => None,
        }
    }

    /// `Disabled → Armed(None)`. Already armed: unchanged.
    pub fn enable_mode(&mut self) {
        if !self.is_armed() {
            self.state = AuthoringState::Armed {
                pending_source: None,
            };
        }
    }

    /// Any state `→ Disabled`.
    pub fn disable_mode(&mut self) {
        self.state = AuthoringState::Disabled;
    }

    pub fn click_node(&mut self, node_id: NodeId) -> ClickOutcome {
        match self.state {
            AuthoringState::Disabled => ClickOutcome::NotArmed,
            AuthoringState::Armed {
                pending_source: None,
            } => {
                self.state = AuthoringState::Armed {
                    pending_source: Some(node_id),
                };
                ClickOutcome::SourcePending(node_id)
            }
            AuthoringState::Armed {
                pending_source: Some(source),
            } if source == node_id => ClickOutcome::Unchanged,
            AuthoringState::Armed {
                pending_source: Some(source),
            } => {
                self.state = AuthoringState::Armed {
                    pending_source: None,
                };
                ClickOutcome::CreateEdge(EdgeRequest {
                    source_id: source,
                    target_id: node_id,
                })
            }
        }
    }

    /// Cancel an in-progress gesture without leaving edge mode.
    ///
    /// Returns `true` if the machine is armed (the click was consumed).
    pub fn click_background(&mut self) -> bool {
        if self.is_armed() {
            self.state = AuthoringState::Armed {
                pending_source: None,
            };
            true
        } else {
            false
        }
    }
}
