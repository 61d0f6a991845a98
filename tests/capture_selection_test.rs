//! Selection semantics of capture sets across mutation and persistence

mod common;

use calibrig::capture::set::{CaptureSet, CaptureSetEvent};
use calibrig::capture::Capture;
use calibrig::document::Serializable;
use common::builders::NoteCapture;
use proptest::prelude::*;

#[test]
fn test_single_selection_workflow_survives_round_trip() {
    let mut set = CaptureSet::single_selection();
    let first = set.add(NoteCapture::new("first"));
    let second = set.add(NoteCapture::new("second"));
    set.add(NoteCapture::new("third"));
    assert_eq!(set.len(), 3);

    // Selecting one capture displaces the previous selection.
    set.select(first);
    set.select(second);
    let selection = set.selection();
    assert_eq!(selection.len(), 1);
    assert_eq!(selection[0].note, "second");

    // Selection state travels with the document.
    let doc = set.serialize();
    let mut restored: CaptureSet<NoteCapture> = CaptureSet::single_selection();
    let counts = restored.restore(&doc).unwrap();
    assert_eq!(counts.restored, 3);
    assert_eq!(counts.skipped, 0);
    let selection = restored.selection();
    assert_eq!(selection.len(), 1);
    assert_eq!(selection[0].note, "second");

    // Removing the selected capture leaves nothing selected, with exactly
    // one aggregate selection notification.
    restored.take_events();
    let selected = restored.selected_ids()[0];
    assert!(restored.remove(selected));
    assert!(restored.selection().is_empty());
    assert_eq!(restored.len(), 2);
    let events = restored.take_events();
    let dirty = events
        .iter()
        .filter(|e| matches!(e, CaptureSetEvent::SelectionDirty))
        .count();
    assert_eq!(dirty, 1);
    assert!(events
        .iter()
        .any(|e| matches!(e, CaptureSetEvent::Removed { id } if *id == selected)));
}

#[test]
fn test_selection_events_arrive_in_order() {
    let mut set = CaptureSet::single_selection();
    let first = set.add(NoteCapture::new("a"));
    let second = set.add(NoteCapture::new("b"));
    set.select(first);
    set.take_events();

    set.select(second);
    let events = set.take_events();
    let changes: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            CaptureSetEvent::SelectionChanged { id, selected } => Some((*id, *selected)),
            _ => None,
        })
        .collect();
    // The displaced capture deselects before the new one announces.
    assert_eq!(changes, vec![(first, false), (second, true)]);
}

#[test]
fn test_document_with_multiple_selected_is_repaired() {
    let mut source = CaptureSet::multi_selection();
    let a = source.add(NoteCapture::new("a"));
    let b = source.add(NoteCapture::new("b"));
    source.select(a);
    source.select(b);
    let doc = source.serialize();

    // A single-selection set restoring that document keeps only the last.
    let mut set: CaptureSet<NoteCapture> = CaptureSet::single_selection();
    set.restore(&doc).unwrap();
    let selection = set.selection();
    assert_eq!(selection.len(), 1);
    assert_eq!(selection[0].note, "b");
}

#[test]
fn test_malformed_entries_are_skipped_not_fatal() {
    let mut source = CaptureSet::multi_selection();
    source.add(NoteCapture::new("good"));
    let mut doc = source.serialize();
    if let serde_json::Value::Array(ref mut entries) = doc {
        entries.push(serde_json::json!({"selected": "not a bool"}));
        entries.push(serde_json::json!(42));
    }

    let mut set: CaptureSet<NoteCapture> = CaptureSet::multi_selection();
    let counts = set.restore(&doc).unwrap();
    assert_eq!(counts.restored, 1);
    assert_eq!(counts.skipped, 2);
    assert_eq!(set.len(), 1);
}

#[derive(Debug, Clone)]
enum SetOp {
    Add,
    Select(usize),
    Deselect(usize),
    Remove(usize),
}

fn set_op() -> impl Strategy<Value = SetOp> {
    prop_oneof![
        Just(SetOp::Add),
        (0usize..8).prop_map(SetOp::Select),
        (0usize..8).prop_map(SetOp::Deselect),
        (0usize..8).prop_map(SetOp::Remove),
    ]
}

proptest! {
    #[test]
    fn prop_single_selection_never_exceeds_one(ops in prop::collection::vec(set_op(), 1..40)) {
        let mut set = CaptureSet::single_selection();
        for op in ops {
            match op {
                SetOp::Add => {
                    set.add(NoteCapture::new("x"));
                }
                SetOp::Select(i) => {
                    let id = set.iter().nth(i).map(|c| c.id());
                    if let Some(id) = id {
                        set.select(id);
                    }
                }
                SetOp::Deselect(i) => {
                    let id = set.iter().nth(i).map(|c| c.id());
                    if let Some(id) = id {
                        set.set_selected(id, false);
                    }
                }
                SetOp::Remove(i) => {
                    let id = set.iter().nth(i).map(|c| c.id());
                    if let Some(id) = id {
                        set.remove(id);
                    }
                }
            }
            prop_assert!(set.selection().len() <= 1);
        }
    }
}
