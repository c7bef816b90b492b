//! Layout engine: random non-overlapping placement of notes on the canvas.
//!
//! DESIGN
//! ======
//! Notes are placed one at a time in input order (callers pass newest-first,
//! so earlier notes get first pick of free space). Each note draws up to
//! `MAX_PLACEMENT_ATTEMPTS` random candidates and takes the first whose
//! axis-aligned bounding box clears every box placed so far. Rotation is
//! cosmetic: the overlap test ignores it. On a crowded canvas the last
//! candidate is accepted overlapping; on a canvas smaller than a note the
//! note pins to the top-left corner. Neither case is an error.
//!
//! The random source is a caller-supplied [`Rng`] so production can use
//! `rand::rng()` while tests seed a deterministic generator.

#[cfg(test)]
#[path = "layout_test.rs"]
mod layout_test;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::consts::{MAX_PLACEMENT_ATTEMPTS, MAX_ROTATION_DEG, NOTE_SIZE};
use crate::note::{NoteRecord, PositionedNote};

/// Canvas dimensions in canvas units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// Strict intersection test: boxes that merely share an edge do not
    /// count as overlapping.
    #[must_use]
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }
}

/// The bounding box a positioned note occupies for overlap purposes.
#[must_use]
pub fn note_rect(note: &PositionedNote) -> Rect {
    Rect { x: note.x, y: note.y, width: NOTE_SIZE, height: NOTE_SIZE }
}

/// Assign every note a position and rotation inside the canvas.
///
/// Output is one [`PositionedNote`] per input record, in input order, each
/// carrying the reaction set derived from its record. Exact coordinates are
/// random; callers should assert structural properties, not values.
#[must_use]
pub fn compute_layout<R: Rng + ?Sized>(
    notes: &[NoteRecord],
    canvas: CanvasSize,
    rng: &mut R,
) -> Vec<PositionedNote> {
    let mut placed: Vec<Rect> = Vec::with_capacity(notes.len());
    let mut out = Vec::with_capacity(notes.len());

    for note in notes {
        let (rect, rotation) = place_one(&placed, canvas, rng);
        placed.push(rect);
        out.push(PositionedNote {
            reactions: note.reaction_set(),
            note: note.clone(),
            x: rect.x,
            y: rect.y,
            rotation,
        });
    }

    out
}

/// Find a spot for one note given everything already placed this pass.
fn place_one<R: Rng + ?Sized>(placed: &[Rect], canvas: CanvasSize, rng: &mut R) -> (Rect, f64) {
    let max_x = canvas.width - NOTE_SIZE;
    let max_y = canvas.height - NOTE_SIZE;

    // Canvas smaller than a single note: pin to the corner rather than fail.
    if max_x < 0.0 || max_y < 0.0 {
        let corner = Rect { x: 0.0, y: 0.0, width: NOTE_SIZE, height: NOTE_SIZE };
        return (corner, random_rotation(rng));
    }

    let mut candidate = random_candidate(max_x, max_y, rng);
    let mut attempts = 1;
    while attempts < MAX_PLACEMENT_ATTEMPTS && collides(placed, &candidate.0) {
        candidate = random_candidate(max_x, max_y, rng);
        attempts += 1;
    }

    if collides(placed, &candidate.0) {
        // Crowded canvas: accept the overlap rather than loop forever.
        debug!(attempts, placed = placed.len(), "placement attempts exhausted, accepting overlap");
    }

    candidate
}

fn random_candidate<R: Rng + ?Sized>(max_x: f64, max_y: f64, rng: &mut R) -> (Rect, f64) {
    let rect = Rect {
        x: rng.random_range(0.0..=max_x),
        y: rng.random_range(0.0..=max_y),
        width: NOTE_SIZE,
        height: NOTE_SIZE,
    };
    (rect, random_rotation(rng))
}

fn random_rotation<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    rng.random_range(-MAX_ROTATION_DEG..=MAX_ROTATION_DEG)
}

fn collides(placed: &[Rect], candidate: &Rect) -> bool {
    placed.iter().any(|p| p.intersects(candidate))
}
