//! Reconciler: merge refreshed records into existing placements, or start over.
//!
//! DESIGN
//! ======
//! A snapshot whose id set matches the displayed set is a pure content
//! refresh: every position and rotation is carried forward bit-for-bit and
//! only the wrapped record and reaction summary change, so the board never
//! jumps when someone merely reacts. Any membership change throws all
//! positions away and re-runs the layout engine on the full incoming list.
//! Adding one note therefore reshuffles everyone; that is the accepted cost
//! of the stability rule, not a bug.
//!
//! Identity is compared by id set alone. Two snapshots with the same ids but
//! different content or timestamps are merged, never re-laid-out.

#[cfg(test)]
#[path = "reconcile_test.rs"]
mod reconcile_test;

use std::collections::{HashMap, HashSet};

use rand::Rng;

use crate::layout::{CanvasSize, compute_layout};
use crate::note::{NoteRecord, PositionedNote};

/// Decide what the displayed list becomes for one incoming snapshot.
///
/// Merge keeps `previous` order; re-layout follows `incoming` order.
#[must_use]
pub fn reconcile<R: Rng + ?Sized>(
    previous: &[PositionedNote],
    incoming: &[NoteRecord],
    canvas: CanvasSize,
    rng: &mut R,
) -> Vec<PositionedNote> {
    if same_membership(previous, incoming) {
        merge(previous, incoming)
    } else {
        compute_layout(incoming, canvas, rng)
    }
}

/// True when `previous` and `incoming` hold exactly the same note ids,
/// regardless of order.
#[must_use]
pub fn same_membership(previous: &[PositionedNote], incoming: &[NoteRecord]) -> bool {
    let previous_ids: HashSet<&str> = previous.iter().map(|p| p.note.id.as_str()).collect();
    let incoming_ids: HashSet<&str> = incoming.iter().map(|n| n.id.as_str()).collect();
    previous_ids == incoming_ids
}

/// Carry every placement forward, swapping in the refreshed record and
/// recomputing the reaction set.
fn merge(previous: &[PositionedNote], incoming: &[NoteRecord]) -> Vec<PositionedNote> {
    let by_id: HashMap<&str, &NoteRecord> = incoming.iter().map(|n| (n.id.as_str(), n)).collect();

    previous
        .iter()
        .map(|prev| match by_id.get(prev.note.id.as_str()) {
            Some(fresh) => PositionedNote {
                note: (*fresh).clone(),
                x: prev.x,
                y: prev.y,
                rotation: prev.rotation,
                reactions: fresh.reaction_set(),
            },
            // Membership said equal, so this cannot happen; keep the stale
            // entry rather than drop a note from the board.
            None => prev.clone(),
        })
        .collect()
}
