//! Core board state: snapshot sequencing over the displayed-note list.
//!
//! Separated from the async [`crate::board::FridgeBoard`] shell so the
//! sequencing and reconciliation rules can be tested without a runtime.
//! Hosts that bring their own scheduling can drive an `EngineCore` directly.

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use rand::Rng;
use tracing::debug;

use crate::layout::CanvasSize;
use crate::note::PositionedNote;
use crate::reconcile::reconcile;
use crate::repo::NoteSnapshot;

/// Displayed-note state for one family selection.
///
/// Exactly one writer drives this at a time; readers take snapshots of
/// [`Self::displayed`].
#[derive(Debug)]
pub struct EngineCore {
    displayed: Vec<PositionedNote>,
    canvas: CanvasSize,
    last_seq: Option<u64>,
}

impl EngineCore {
    #[must_use]
    pub fn new(canvas: CanvasSize) -> Self {
        Self { displayed: Vec::new(), canvas, last_seq: None }
    }

    // --- Snapshot intake ---

    /// Apply one snapshot from the live feed.
    ///
    /// A snapshot must supersede the last applied one: anything with
    /// `seq <=` the last applied sequence is dropped, so the last snapshot
    /// wins when deliveries race. Returns whether the displayed list
    /// changed.
    pub fn apply_snapshot<R: Rng + ?Sized>(&mut self, snapshot: &NoteSnapshot, rng: &mut R) -> bool {
        if let Some(last) = self.last_seq {
            if snapshot.seq <= last {
                debug!(seq = snapshot.seq, last, "stale snapshot dropped");
                return false;
            }
        }
        self.last_seq = Some(snapshot.seq);
        self.displayed = reconcile(&self.displayed, &snapshot.notes, self.canvas, rng);
        true
    }

    /// Forget everything for a family switch: no position carries over from
    /// one family's board to another's.
    pub fn reset(&mut self) {
        self.displayed.clear();
        self.last_seq = None;
    }

    // --- Canvas ---

    /// Set the canvas used by future layout passes.
    ///
    /// Already-displayed notes keep their positions; a resize does not
    /// retrigger layout. Known gap, kept deliberately.
    pub fn set_canvas_size(&mut self, canvas: CanvasSize) {
        self.canvas = canvas;
    }

    // --- Queries ---

    /// The currently displayed notes, in display order.
    #[must_use]
    pub fn displayed(&self) -> &[PositionedNote] {
        &self.displayed
    }

    #[must_use]
    pub fn canvas_size(&self) -> CanvasSize {
        self.canvas
    }

    /// Sequence of the last applied snapshot, if any.
    #[must_use]
    pub fn last_seq(&self) -> Option<u64> {
        self.last_seq
    }
}
