#![allow(clippy::float_cmp)]

use std::collections::HashMap;

use rand::SeedableRng;
use rand::rngs::StdRng;

use super::*;
use crate::layout::note_rect;
use crate::note::{NoteKind, Reaction};

const CANVAS: CanvasSize = CanvasSize { width: 1000.0, height: 1000.0 };

fn make_note(id: &str, ts: i64) -> NoteRecord {
    NoteRecord {
        id: id.to_owned(),
        sender_id: "mom".to_owned(),
        family_id: "fam-1".to_owned(),
        kind: NoteKind::Text,
        ts,
        text: None,
        payload_url: None,
        seen: HashMap::new(),
    }
}

fn laid_out(notes: &[NoteRecord]) -> Vec<PositionedNote> {
    let mut rng = StdRng::seed_from_u64(99);
    compute_layout(notes, CANVAS, &mut rng)
}

// =============================================================
// same_membership
// =============================================================

#[test]
fn same_membership_ignores_order() {
    let notes = vec![make_note("a", 10), make_note("b", 20)];
    let previous = laid_out(&notes);
    let reordered = vec![make_note("b", 20), make_note("a", 10)];
    assert!(same_membership(&previous, &reordered));
}

#[test]
fn same_membership_detects_addition() {
    let previous = laid_out(&[make_note("a", 10)]);
    let incoming = vec![make_note("a", 10), make_note("b", 20)];
    assert!(!same_membership(&previous, &incoming));
}

#[test]
fn same_membership_detects_removal() {
    let previous = laid_out(&[make_note("a", 10), make_note("b", 20)]);
    let incoming = vec![make_note("a", 10)];
    assert!(!same_membership(&previous, &incoming));
}

#[test]
fn same_membership_both_empty() {
    assert!(same_membership(&[], &[]));
}

// =============================================================
// reconcile: merge path
// =============================================================

#[test]
fn merge_keeps_positions_bit_for_bit() {
    let notes = vec![make_note("a", 10), make_note("b", 20)];
    let previous = laid_out(&notes);

    // Same ids, refreshed seen map on one record.
    let mut refreshed_a = make_note("a", 10);
    refreshed_a.seen.insert("u1".to_owned(), Some(Reaction::Heart));
    let incoming = vec![refreshed_a, make_note("b", 20)];

    let mut rng = StdRng::seed_from_u64(1);
    let merged = reconcile(&previous, &incoming, CANVAS, &mut rng);

    assert_eq!(merged.len(), 2);
    for (prev, now) in previous.iter().zip(&merged) {
        assert_eq!(now.note.id, prev.note.id);
        assert_eq!(now.x, prev.x);
        assert_eq!(now.y, prev.y);
        assert_eq!(now.rotation, prev.rotation);
    }
    assert!(merged[0].reactions.contains(&Reaction::Heart));
    assert!(merged[1].reactions.is_empty());
}

#[test]
fn merge_replaces_wrapped_record() {
    let previous = laid_out(&[make_note("a", 10)]);

    let mut refreshed = make_note("a", 10);
    refreshed.text = Some("edited caption".to_owned());
    let incoming = vec![refreshed];

    let mut rng = StdRng::seed_from_u64(2);
    let merged = reconcile(&previous, &incoming, CANVAS, &mut rng);
    assert_eq!(merged[0].note.text.as_deref(), Some("edited caption"));
}

#[test]
fn merge_applies_on_reordered_incoming() {
    let notes = vec![make_note("a", 10), make_note("b", 20)];
    let previous = laid_out(&notes);
    let incoming = vec![make_note("b", 20), make_note("a", 10)];

    let mut rng = StdRng::seed_from_u64(3);
    let merged = reconcile(&previous, &incoming, CANVAS, &mut rng);

    // Merge keeps previous display order, not the incoming order.
    assert_eq!(merged[0].note.id, "a");
    assert_eq!(merged[1].note.id, "b");
    assert_eq!(merged[0].x, previous[0].x);
    assert_eq!(merged[1].x, previous[1].x);
}

#[test]
fn merge_same_ids_changed_timestamps_is_still_merge() {
    let previous = laid_out(&[make_note("a", 10), make_note("b", 20)]);
    // Timestamps changed but membership identical: identity-set rule says merge.
    let incoming = vec![make_note("a", 999), make_note("b", 998)];

    let mut rng = StdRng::seed_from_u64(4);
    let merged = reconcile(&previous, &incoming, CANVAS, &mut rng);
    for (prev, now) in previous.iter().zip(&merged) {
        assert_eq!(now.x, prev.x);
        assert_eq!(now.rotation, prev.rotation);
    }
    assert_eq!(merged[0].note.ts, 999);
}

// =============================================================
// reconcile: relayout path
// =============================================================

#[test]
fn addition_triggers_full_relayout() {
    let previous = laid_out(&[make_note("a", 10), make_note("b", 20)]);
    let incoming = vec![make_note("c", 30), make_note("b", 20), make_note("a", 10)];

    let mut rng = StdRng::seed_from_u64(5);
    let out = reconcile(&previous, &incoming, CANVAS, &mut rng);

    // Relayout output covers the incoming list in incoming order.
    assert_eq!(out.len(), 3);
    assert_eq!(out[0].note.id, "c");
    assert_eq!(out[1].note.id, "b");
    assert_eq!(out[2].note.id, "a");
    for p in &out {
        assert!((0.0..=850.0).contains(&p.x));
        assert!((0.0..=850.0).contains(&p.y));
    }
}

#[test]
fn removal_triggers_full_relayout() {
    let previous = laid_out(&[make_note("a", 10), make_note("b", 20)]);
    let incoming = vec![make_note("b", 20)];

    let mut rng = StdRng::seed_from_u64(6);
    let out = reconcile(&previous, &incoming, CANVAS, &mut rng);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].note.id, "b");
}

#[test]
fn relayout_into_empty_clears_board() {
    let previous = laid_out(&[make_note("a", 10)]);
    let mut rng = StdRng::seed_from_u64(7);
    let out = reconcile(&previous, &[], CANVAS, &mut rng);
    assert!(out.is_empty());
}

#[test]
fn first_snapshot_lays_out_from_empty() {
    let incoming = vec![make_note("a", 10), make_note("b", 20)];
    let mut rng = StdRng::seed_from_u64(8);
    let out = reconcile(&[], &incoming, CANVAS, &mut rng);
    assert_eq!(out.len(), 2);
    assert!(!note_rect(&out[0]).intersects(&note_rect(&out[1])));
}
