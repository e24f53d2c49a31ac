//! Cached manuscript tree for the navigation view.
//!
//! The cache goes stale whenever a save succeeds (word counts changed) and is
//! refetched the next time someone asks for it. A failed refetch keeps the old
//! tree and leaves the cache stale.

use crate::session::SessionEvent;
use quill_client::{ApiError, Backend, ManuscriptTree};
use std::collections::HashSet;
use tracing::debug;

#[derive(Debug, Default)]
pub struct TreeCache {
    tree: Option<ManuscriptTree>,
    stale: bool,
    expanded: HashSet<String>,
}

impl TreeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invalidate(&mut self) {
        if self.tree.is_some() {
            debug!("Manuscript tree invalidated");
        }
        self.stale = true;
    }

    /// Follow autosave events, going stale when saved content changed.
    pub fn observe(&mut self, event: &SessionEvent) {
        if let SessionEvent::TreeInvalidated = event {
            self.invalidate();
        }
    }

    pub fn is_stale(&self) -> bool {
        self.stale || self.tree.is_none()
    }

    /// The last fetched tree, stale or not.
    pub fn cached(&self) -> Option<&ManuscriptTree> {
        self.tree.as_ref()
    }

    /// Return the tree, fetching it first if it is missing or stale.
    pub async fn get(&mut self, backend: &dyn Backend) -> Result<&ManuscriptTree, ApiError> {
        if self.is_stale() {
            let tree = backend.manuscript_tree().await?;
            debug!("Fetched manuscript tree ({} words)", tree.word_count());
            if self.expanded.is_empty() {
                self.expanded = tree.acts.iter().map(|act| act.id.clone()).collect();
            }
            self.tree = Some(tree);
            self.stale = false;
        }
        Ok(self.tree.get_or_insert_with(ManuscriptTree::default))
    }

    /// Flip an act or chapter between expanded and collapsed. Returns the new state.
    pub fn toggle(&mut self, node_id: &str) -> bool {
        if self.expanded.remove(node_id) {
            false
        } else {
            self.expanded.insert(node_id.to_string());
            true
        }
    }

    pub fn is_expanded(&self, node_id: &str) -> bool {
        self.expanded.contains(node_id)
    }
}
