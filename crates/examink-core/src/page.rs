//! Multi-page answer document.

use crate::elements::{LineElement, ShapeElement};
use crate::history::HistoryStack;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// One canvas page of an answer.
///
/// Insertion order is rendering order: later elements draw over earlier
/// ones, which is what makes erase-by-overdraw work.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub lines: Vec<LineElement>,
    pub shapes: Vec<ShapeElement>,
}

impl Page {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.shapes.is_empty()
    }

    /// Number of elements on the page.
    pub fn len(&self) -> usize {
        self.lines.len() + self.shapes.len()
    }

    pub fn push_line(&mut self, line: LineElement) {
        self.lines.push(line);
    }

    pub fn push_shape(&mut self, shape: ShapeElement) {
        self.shapes.push(shape);
    }

    /// Take an immutable copy of the page's element collections.
    pub fn snapshot(&self) -> PageSnapshot {
        PageSnapshot {
            lines: self.lines.clone(),
            shapes: self.shapes.clone(),
        }
    }

    /// Restore the page from a snapshot.
    pub fn restore(&mut self, snapshot: &PageSnapshot) {
        self.lines = snapshot.lines.clone();
        self.shapes = snapshot.shapes.clone();
    }
}

/// An immutable copy of a page's element collections at a point in time.
///
/// Snapshots are independent copies, never aliases, so later mutation of the
/// live page cannot corrupt history.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageSnapshot {
    lines: Vec<LineElement>,
    shapes: Vec<ShapeElement>,
}

/// Owns the page map, the current-page pointer and per-page histories.
///
/// Pages are numbered 1-based and kept dense from 1: switching to page `n`
/// materializes every missing page up to `n` as empty. The current pointer
/// always has a corresponding page entry. Histories are runtime-only state
/// and are rebuilt from the loaded pages, never persisted.
#[derive(Debug, Clone)]
pub struct PageStore {
    pages: BTreeMap<u32, Page>,
    current: u32,
    histories: HashMap<u32, HistoryStack>,
}

impl Default for PageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PageStore {
    /// Create a store with a single empty page.
    pub fn new() -> Self {
        let mut store = Self {
            pages: BTreeMap::from([(1, Page::default())]),
            current: 1,
            histories: HashMap::new(),
        };
        store.ensure_history(1);
        store
    }

    /// Rebuild a store from cached pages and a current-page pointer.
    ///
    /// Gaps in the page numbering and a dangling pointer are repaired rather
    /// than rejected: every page up to the highest referenced number exists
    /// afterwards.
    pub fn from_parts(pages: BTreeMap<u32, Page>, current_page: u32) -> Self {
        let mut store = Self {
            pages,
            current: current_page.max(1),
            histories: HashMap::new(),
        };
        let top = store
            .pages
            .keys()
            .next_back()
            .copied()
            .unwrap_or(1)
            .max(store.current);
        for n in 1..=top {
            store.pages.entry(n).or_default();
        }
        store.ensure_history(store.current);
        store
    }

    /// Currently active page number.
    pub fn current_page(&self) -> u32 {
        self.current
    }

    /// Number of pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// The active page, for rendering.
    pub fn active_page(&self) -> &Page {
        self.pages.get(&self.current).expect("current page entry")
    }

    /// The active page, for mutation by the tool engine.
    pub fn active_page_mut(&mut self) -> &mut Page {
        self.pages.entry(self.current).or_default()
    }

    /// All pages in order, for persistence and submission.
    pub fn pages(&self) -> &BTreeMap<u32, Page> {
        &self.pages
    }

    /// Point-in-time copy of all pages (clone-on-read for saves in flight).
    pub fn clone_pages(&self) -> BTreeMap<u32, Page> {
        self.pages.clone()
    }

    /// Switch the active page, lazily creating missing pages up to `page`.
    ///
    /// Switching to the already-active page or to page 0 is a no-op; returns
    /// whether the pointer moved (a real switch is a save-worthy event).
    pub fn switch_to(&mut self, page: u32) -> bool {
        if page == 0 || page == self.current {
            return false;
        }
        for n in 1..=page {
            self.pages.entry(n).or_default();
        }
        self.current = page;
        self.ensure_history(page);
        true
    }

    /// Record the active page's state as a committed edit in its history.
    pub fn commit_edit(&mut self) {
        self.ensure_history(self.current);
        let snapshot = self.active_page().snapshot();
        if let Some(history) = self.histories.get_mut(&self.current) {
            history.commit(snapshot);
        }
    }

    /// Undo the last committed edit on the active page. Returns whether the
    /// page changed.
    pub fn undo(&mut self) -> bool {
        self.ensure_history(self.current);
        let snapshot = match self.histories.get_mut(&self.current) {
            Some(history) => match history.undo() {
                Some(snapshot) => snapshot.clone(),
                None => return false,
            },
            None => return false,
        };
        self.active_page_mut().restore(&snapshot);
        true
    }

    /// Redo the last undone edit on the active page. Returns whether the
    /// page changed.
    pub fn redo(&mut self) -> bool {
        self.ensure_history(self.current);
        let snapshot = match self.histories.get_mut(&self.current) {
            Some(history) => match history.redo() {
                Some(snapshot) => snapshot.clone(),
                None => return false,
            },
            None => return false,
        };
        self.active_page_mut().restore(&snapshot);
        true
    }

    pub fn can_undo(&self) -> bool {
        self.histories
            .get(&self.current)
            .is_some_and(HistoryStack::can_undo)
    }

    pub fn can_redo(&self) -> bool {
        self.histories
            .get(&self.current)
            .is_some_and(HistoryStack::can_redo)
    }

    /// Seed a history for `page` from its current content if none exists.
    fn ensure_history(&mut self, page: u32) {
        if !self.histories.contains_key(&page) {
            let snapshot = self.pages.get(&page).map(Page::snapshot).unwrap_or_default();
            self.histories.insert(page, HistoryStack::new(snapshot));
        }
    }
}
