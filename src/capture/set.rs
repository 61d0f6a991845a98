//! Ordered, selection-aware capture storage
//!
//! A [`CaptureSet`] is owned by exactly one node and holds that node's
//! captures in insertion order. The set enforces the selection policy fixed
//! at construction: in single-selection mode at most one capture is selected
//! at any time, and selecting a new capture deselects every other member
//! *before* the new selection is announced.
//!
//! Notifications are pushed synchronously into a per-set event queue before
//! the mutating call returns; the owning node drains the queue with
//! [`CaptureSet::take_events`] and rebuilds derived state from the selected
//! subset. Handlers therefore run strictly after the mutation completes and
//! cannot re-enter the set mid-walk.

use crate::capture::{Capture, CaptureId};
use crate::document::Serializable;
use crate::error::{CalibError, Result};
use serde_json::Value;

/// Notification emitted by a capture set mutation.
///
/// Per-capture `SelectionChanged` events fire for every flag change;
/// `SelectionDirty` is the aggregate signal that the selected subset may
/// have changed and derived views should be rebuilt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureSetEvent {
    SelectionChanged { id: CaptureId, selected: bool },
    SelectionDirty,
    Removed { id: CaptureId },
}

/// Per-element outcome counts of restoring a set from a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreCounts {
    pub restored: usize,
    pub skipped: usize,
}

impl RestoreCounts {
    pub fn absorb(&mut self, other: RestoreCounts) {
        self.restored += other.restored;
        self.skipped += other.skipped;
    }
}

/// Ordered, type-erased-by-capability collection of captures for one node.
pub struct CaptureSet<C: Capture> {
    captures: Vec<C>,
    multiple_selection_allowed: bool,
    events: Vec<CaptureSetEvent>,
}

impl<C: Capture> CaptureSet<C> {
    /// Set whose policy allows any number of selected captures.
    pub fn multi_selection() -> Self {
        Self::new(true)
    }

    /// Set whose policy allows at most one selected capture.
    pub fn single_selection() -> Self {
        Self::new(false)
    }

    fn new(multiple_selection_allowed: bool) -> Self {
        Self {
            captures: Vec::new(),
            multiple_selection_allowed,
            events: Vec::new(),
        }
    }

    pub fn multiple_selection_allowed(&self) -> bool {
        self.multiple_selection_allowed
    }

    pub fn len(&self) -> usize {
        self.captures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.captures.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &C> {
        self.captures.iter()
    }

    pub fn get(&self, id: CaptureId) -> Option<&C> {
        self.captures.iter().find(|c| c.id() == id)
    }

    /// Mutable payload access, e.g. for writing per-capture solve residuals.
    pub fn get_mut(&mut self, id: CaptureId) -> Option<&mut C> {
        self.captures.iter_mut().find(|c| c.id() == id)
    }

    /// Ordered sub-sequence of currently selected captures.
    pub fn selection(&self) -> Vec<&C> {
        self.captures.iter().filter(|c| c.is_selected()).collect()
    }

    /// Ids of the currently selected captures, in set order.
    pub fn selected_ids(&self) -> Vec<CaptureId> {
        self.captures
            .iter()
            .filter(|c| c.is_selected())
            .map(|c| c.id())
            .collect()
    }

    /// Append a capture to the set.
    ///
    /// If the incoming capture arrives already selected and the set is in
    /// single-selection mode, every other member is deselected first; this
    /// is how the invariant is re-validated when a document is reloaded
    /// through `add` (the last selected record in document order wins).
    /// Always fires one aggregate `SelectionDirty` so observers rebuild
    /// derived views even when nothing was previously selected.
    pub fn add(&mut self, capture: C) -> CaptureId {
        let id = capture.id();
        let selected = capture.is_selected();
        self.captures.push(capture);
        if selected && !self.multiple_selection_allowed {
            self.deselect_others(id);
        }
        self.events.push(CaptureSetEvent::SelectionDirty);
        id
    }

    /// Change one capture's selection flag.
    ///
    /// Idempotent when the value is unchanged (no events fire). When a
    /// capture becomes selected in single-selection mode, all other members
    /// are deselected before the new selection is announced. Returns false
    /// if the id is not a member.
    pub fn set_selected(&mut self, id: CaptureId, selected: bool) -> bool {
        let Some(index) = self.captures.iter().position(|c| c.id() == id) else {
            return false;
        };
        if self.captures[index].is_selected() == selected {
            return true;
        }
        if selected && !self.multiple_selection_allowed {
            self.deselect_others(id);
        }
        self.captures[index].base_mut().set_selected_raw(selected);
        self.events
            .push(CaptureSetEvent::SelectionChanged { id, selected });
        self.events.push(CaptureSetEvent::SelectionDirty);
        true
    }

    fn deselect_others(&mut self, keep: CaptureId) {
        // Only ever toggles captures other than the originating one, so the
        // enforcement walk cannot re-trigger itself.
        let mut changed = Vec::new();
        for capture in &mut self.captures {
            if capture.id() != keep && capture.is_selected() {
                capture.base_mut().set_selected_raw(false);
                changed.push(capture.id());
            }
        }
        for id in changed {
            self.events.push(CaptureSetEvent::SelectionChanged {
                id,
                selected: false,
            });
        }
    }

    /// Select one capture; in single-selection mode this deselects the rest.
    pub fn select(&mut self, id: CaptureId) -> bool {
        self.set_selected(id, true)
    }

    /// Select every capture, front to back.
    ///
    /// Under single-selection policy the invariant stays authoritative:
    /// each selection deselects the previous one and only the last-iterated
    /// capture remains selected when the call returns.
    pub fn select_all(&mut self) {
        let ids: Vec<CaptureId> = self.captures.iter().map(|c| c.id()).collect();
        for id in ids {
            self.set_selected(id, true);
        }
    }

    /// Deselect every capture.
    pub fn select_none(&mut self) {
        let ids: Vec<CaptureId> = self.captures.iter().map(|c| c.id()).collect();
        for id in ids {
            self.set_selected(id, false);
        }
    }

    /// Remove a capture from the set. No-op (returns false) if the id is
    /// not a member.
    ///
    /// The capture is forced to `selected = false` first so deselection
    /// observers fire exactly once, then it is detached.
    pub fn remove(&mut self, id: CaptureId) -> bool {
        let Some(index) = self.captures.iter().position(|c| c.id() == id) else {
            return false;
        };
        self.set_selected(id, false);
        self.captures.remove(index);
        self.events.push(CaptureSetEvent::Removed { id });
        true
    }

    /// Remove every capture, running each member's full removal contract
    /// front to back. Works by repeatedly removing the first remaining
    /// element, so it stays correct even as the sequence shrinks under it.
    pub fn clear(&mut self) {
        while let Some(id) = self.captures.first().map(|c| c.id()) {
            self.remove(id);
        }
    }

    /// Drain the pending notification queue.
    pub fn take_events(&mut self) -> Vec<CaptureSetEvent> {
        std::mem::take(&mut self.events)
    }

    /// Restore the set from an ordered document array.
    ///
    /// Clears the set first, then per element constructs an empty capture,
    /// deserializes it and goes through [`CaptureSet::add`], never
    /// bypassing it, so selection invariants are re-validated on load.
    /// A malformed element is reported and skipped; siblings still load.
    pub fn restore(&mut self, doc: &Value) -> Result<RestoreCounts> {
        let array = doc
            .as_array()
            .ok_or_else(|| CalibError::malformed("captures", "expected an array"))?;
        self.clear();
        let mut counts = RestoreCounts::default();
        for (index, element) in array.iter().enumerate() {
            let mut capture = C::empty();
            match capture.deserialize(element) {
                Ok(()) => {
                    self.add(capture);
                    counts.restored += 1;
                }
                Err(e) => {
                    tracing::warn!("Skipping capture [{}]: {}", index, e);
                    counts.skipped += 1;
                }
            }
        }
        Ok(counts)
    }
}

impl<C: Capture> Serializable for CaptureSet<C> {
    fn serialize(&self) -> Value {
        Value::Array(self.captures.iter().map(|c| c.serialize()).collect())
    }

    fn deserialize(&mut self, doc: &Value) -> Result<()> {
        self.restore(doc).map(|_| ())
    }
}
