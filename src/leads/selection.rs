use std::collections::HashSet;

use crate::storage::Lead;

/// URLs currently checked for bulk actions.
///
/// Holds URL strings only, never leads. Entries can outlive the lead they
/// name (e.g. after a single delete); callers check membership against the
/// current view, so such stale entries are harmless and are not pruned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    urls: HashSet<String>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip membership of `url`. Returns `true` if it is now selected.
    pub fn toggle(&mut self, url: &str) -> bool {
        if self.urls.remove(url) {
            false
        } else {
            self.urls.insert(url.to_owned());
            true
        }
    }

    /// Select-all / deselect-all toggle over the visible leads.
    ///
    /// When the selection is exactly as large as `view`, it is cleared;
    /// otherwise it becomes every URL in `view`.
    pub fn select_all(&mut self, view: &[Lead]) {
        let all_selected = self.urls.len() == view.len();
        self.urls.clear();
        if !all_selected {
            self.urls.extend(view.iter().map(|lead| lead.url.clone()));
        }
    }

    pub fn clear(&mut self) {
        self.urls.clear();
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    pub fn size(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn urls(&self) -> &HashSet<String> {
        &self.urls
    }
}
