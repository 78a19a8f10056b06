//! Suppression of entries already printed during a tail session.

use std::collections::HashSet;

/// Number of ids kept before the window is emptied
pub const DEDUP_CAPACITY: usize = 1000;

/// Bounded memory of emitted entry ids.
///
/// Membership is exact, but once a lookup observes more than
/// [`DEDUP_CAPACITY`] ids the whole window is cleared. An id recorded before the
/// clear can therefore be reported as unseen again.
#[derive(Debug, Default)]
pub struct DedupWindow {
    ids: HashSet<String>,
}

impl DedupWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `id` was recorded since the last clear. Clears the window when it
    /// is over capacity, after answering.
    pub fn seen(&mut self, id: &str) -> bool {
        let seen = self.ids.contains(id);
        if self.ids.len() > DEDUP_CAPACITY {
            self.ids.clear();
        }
        seen
    }

    pub fn record(&mut self, id: impl Into<String>) {
        self.ids.insert(id.into());
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
