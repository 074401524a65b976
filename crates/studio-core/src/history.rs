//! Per-page undo/redo built from full scene snapshots.

use crate::scene::SceneSnapshot;
use serde::{Deserialize, Serialize};

/// Default maximum number of snapshots kept per page.
pub const DEFAULT_MAX_HISTORY: usize = 100;

fn default_max_entries() -> usize {
    DEFAULT_MAX_HISTORY
}

/// Snapshot stack with a cursor.
///
/// `stack[index]` is always the last committed state. Entries after the
/// cursor are redoable and get discarded by the next commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct History {
    #[serde(rename = "history_stack", default)]
    stack: Vec<SceneSnapshot>,
    #[serde(rename = "history_index", default)]
    index: usize,
    #[serde(skip, default = "default_max_entries")]
    max_entries: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(SceneSnapshot::default())
    }
}

impl History {
    /// Start a history whose only entry is `initial`.
    pub fn new(initial: SceneSnapshot) -> Self {
        Self {
            stack: vec![initial],
            index: 0,
            max_entries: DEFAULT_MAX_HISTORY,
        }
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.set_max_entries(max_entries);
        self
    }

    pub fn set_max_entries(&mut self, max_entries: usize) {
        self.max_entries = max_entries.max(1);
        self.enforce_cap();
    }

    /// Record a committed state. Returns false when `snapshot` equals the
    /// current entry, in which case nothing changes.
    pub fn commit(&mut self, snapshot: SceneSnapshot) -> bool {
        if self.stack.get(self.index) == Some(&snapshot) {
            return false;
        }
        self.stack.truncate(self.index + 1);
        self.stack.push(snapshot);
        self.index = self.stack.len() - 1;
        self.enforce_cap();
        true
    }

    /// Step back. `None` at the oldest entry.
    pub fn undo(&mut self) -> Option<&SceneSnapshot> {
        if self.index == 0 {
            return None;
        }
        self.index -= 1;
        self.stack.get(self.index)
    }

    /// Step forward. `None` at the newest entry.
    pub fn redo(&mut self) -> Option<&SceneSnapshot> {
        if self.index + 1 >= self.stack.len() {
            return None;
        }
        self.index += 1;
        self.stack.get(self.index)
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.stack.len()
    }

    /// The last committed state.
    pub fn current(&self) -> Option<&SceneSnapshot> {
        self.stack.get(self.index)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Repair a history read from storage: seed an empty stack with
    /// `fallback` and clamp the cursor into range.
    pub fn normalize(&mut self, fallback: &SceneSnapshot) {
        if self.stack.is_empty() {
            log::warn!("Page history was empty, seeding from page data");
            self.stack.push(fallback.clone());
        }
        if self.index >= self.stack.len() {
            log::warn!(
                "History index {} out of range (len {}), clamping",
                self.index,
                self.stack.len()
            );
            self.index = self.stack.len() - 1;
        }
        self.enforce_cap();
    }

    fn enforce_cap(&mut self) {
        if self.stack.len() <= self.max_entries {
            return;
        }
        let excess = self.stack.len() - self.max_entries;
        let dropped = excess.min(self.index);
        self.stack.drain(..dropped);
        self.index -= dropped;
        // Redo entries beyond the cap go last.
        self.stack.truncate(self.max_entries);
    }
}
