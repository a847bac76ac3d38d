//! Monotonic request tokens for discarding superseded responses.
//!
//! A search replaces the view, so only the newest search may commit. An
//! expansion merges into the view it was issued against, so it may commit
//! as long as no search was issued after it.

use std::sync::atomic::{AtomicU64, Ordering};

/// Token for one expansion, remembering which search epoch it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpandTicket {
    pub token: u64,
    epoch: u64,
}

#[derive(Debug, Default)]
pub struct RequestTokens {
    next: AtomicU64,
    latest_search: AtomicU64,
}

impl RequestTokens {
    pub fn new() -> Self {
        Self::default()
    }

    fn issue(&self) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Issue a search token; it supersedes every earlier request.
    pub fn issue_search(&self) -> u64 {
        let token = self.issue();
        self.latest_search.fetch_max(token, Ordering::SeqCst);
        token
    }

    /// Issue an expansion token bound to the current search epoch.
    pub fn issue_expand(&self) -> ExpandTicket {
        let epoch = self.latest_search.load(Ordering::SeqCst);
        ExpandTicket {
            token: self.issue(),
            epoch,
        }
    }

    /// Invalidate everything in flight (used by `clear`).
    pub fn invalidate(&self) -> u64 {
        self.issue_search()
    }

    pub fn is_current_search(&self, token: u64) -> bool {
        self.latest_search.load(Ordering::SeqCst) == token
    }

    pub fn is_current_expand(&self, ticket: &ExpandTicket) -> bool {
        self.latest_search.load(Ordering::SeqCst) == ticket.epoch
    }
}
