//! Linear undo/redo over page snapshots.

use crate::page::PageSnapshot;

/// Undo/redo history for one page: a list of snapshots plus a cursor.
///
/// The cursor always points at the snapshot matching the live page. Undo
/// moves it left, redo moves it right, and a new commit truncates everything
/// past the cursor before appending. Depth is unbounded.
#[derive(Debug, Clone)]
pub struct HistoryStack {
    snapshots: Vec<PageSnapshot>,
    cursor: usize,
}

impl HistoryStack {
    /// Seed the history with the page's state at load.
    pub fn new(initial: PageSnapshot) -> Self {
        Self {
            snapshots: vec![initial],
            cursor: 0,
        }
    }

    /// Record a committed edit, discarding any redoable entries.
    pub fn commit(&mut self, snapshot: PageSnapshot) {
        self.snapshots.truncate(self.cursor + 1);
        self.snapshots.push(snapshot);
        self.cursor = self.snapshots.len() - 1;
    }

    /// Step back one edit. Returns `None` when there is nothing to undo.
    pub fn undo(&mut self) -> Option<&PageSnapshot> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        Some(&self.snapshots[self.cursor])
    }

    /// Step forward one undone edit. Returns `None` when there is nothing to
    /// redo.
    pub fn redo(&mut self) -> Option<&PageSnapshot> {
        if self.cursor + 1 >= self.snapshots.len() {
            return None;
        }
        self.cursor += 1;
        Some(&self.snapshots[self.cursor])
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.snapshots.len()
    }

    /// Snapshot at the cursor.
    pub fn current(&self) -> &PageSnapshot {
        &self.snapshots[self.cursor]
    }

    /// Number of snapshots held.
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}
