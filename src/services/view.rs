//! Shared mutable state of the current exploration view.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::graph::GraphModel;
use crate::models::NodeId;

use super::authoring::EdgeAuthoringStateMachine;

/// Everything a render pass reads, guarded together so a clear or a
/// search commit is observed atomically.
#[derive(Debug, Default)]
pub struct ViewState {
    pub model: GraphModel,
    /// Entry points of the last committed search.
    pub search_matches: BTreeSet<NodeId>,
    pub selection: Option<NodeId>,
    pub authoring: EdgeAuthoringStateMachine,
    /// Message of the most recent failed operation, if any.
    pub last_error: Option<String>,
}

impl ViewState {
    /// Reset the view. Edge mode itself stays as it was.
    pub fn clear(&mut self) {
        self.model.clear();
        self.search_matches.clear();
        self.selection = None;
        self.authoring.click_background();
        self.last_error = None;
    }
}

/// Cloneable handle to the view. The lock is never held across an await.
#[derive(Debug, Clone, Default)]
pub struct SharedView {
    inner: Arc<Mutex<ViewState>>,
}

impl SharedView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the view. A poisoned lock is recovered since every writer
    /// leaves the state consistent between statements.
    pub fn lock(&self) -> MutexGuard<'_, ViewState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run `f` with the view locked.
    pub fn with<R>(&self, f: impl FnOnce(&mut ViewState) -> R) -> R {
        f(&mut self.lock())
    }
}
