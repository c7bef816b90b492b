//! Note model: records, reactions, and positioned view-models.
//!
//! `NoteRecord` is the flat, immutable-once-fetched shape of one posted note,
//! as decoded from the family's backend feed. `PositionedNote` wraps a record
//! with its on-canvas placement and is the only thing the rendering layer
//! consumes. Raw backend documents enter through [`decode_records`]; a
//! malformed document rejects its whole batch so a broken snapshot never
//! half-applies.

#[cfg(test)]
#[path = "note_test.rs"]
mod note_test;

use std::collections::{BTreeSet, HashMap};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Error returned by [`decode_records`].
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// A backend document could not be decoded as a [`NoteRecord`].
    #[error("malformed note record: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// The media kind of a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteKind {
    /// Plain text sticky.
    Text,
    /// Finger drawing, stored as a rendered image.
    Drawing,
    /// Photo from the camera or library.
    Image,
    /// Short video clip.
    Video,
    /// Voice memo.
    Audio,
}

/// A reaction a viewer can attach to a note. Closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reaction {
    Heart,
    Laugh,
    Wow,
    Yum,
    ThumbsUp,
}

/// A posted note as fetched from the family's note feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteRecord {
    /// Backend document id. Stable across fetches; the reconciliation join key.
    pub id: String,
    /// Family member who posted the note.
    pub sender_id: String,
    /// Family this note belongs to.
    pub family_id: String,
    /// Media kind; decides how `text` and `payload_url` are interpreted.
    pub kind: NoteKind,
    /// Milliseconds since the Unix epoch when the note was posted.
    pub ts: i64,
    /// Caption or text content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// External media reference. Absent for pure text notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload_url: Option<String>,
    /// Viewer id -> chosen reaction. A key present with `None` means the
    /// viewer has seen the note without reacting.
    #[serde(default)]
    pub seen: HashMap<String, Option<Reaction>>,
}

impl NoteRecord {
    /// Distinct reactions currently attached to this note, ignoring
    /// view-only entries.
    #[must_use]
    pub fn reaction_set(&self) -> BTreeSet<Reaction> {
        self.seen.values().filter_map(|r| *r).collect()
    }
}

/// A note record plus its on-canvas placement and reaction summary.
///
/// Created by the layout engine when a note first appears or on a full
/// re-layout; otherwise carried forward with `x`/`y`/`rotation` untouched
/// while `note` and `reactions` are refreshed. Consumers read snapshots and
/// never mutate.
#[derive(Debug, Clone, Serialize)]
pub struct PositionedNote {
    /// The wrapped record, refreshed on every merge.
    pub note: NoteRecord,
    /// Left edge of the note's bounding box in canvas units.
    pub x: f64,
    /// Top edge of the note's bounding box in canvas units.
    pub y: f64,
    /// Clockwise rotation in degrees around the note center.
    pub rotation: f64,
    /// Distinct reactions present in the record's `seen` map.
    pub reactions: BTreeSet<Reaction>,
}

/// Decode a batch of raw backend documents into note records.
///
/// All-or-nothing: the batch fails on the first malformed document, so a
/// broken snapshot is dropped in full and whatever is currently displayed
/// stays put.
///
/// # Errors
///
/// Returns [`DecodeError::Malformed`] for the first document that does not
/// decode as a [`NoteRecord`].
pub fn decode_records(documents: &[serde_json::Value]) -> Result<Vec<NoteRecord>, DecodeError> {
    documents
        .iter()
        .map(|doc| serde_json::from_value(doc.clone()).map_err(DecodeError::from))
        .collect()
}

/// Current time in the note timestamp convention: milliseconds since the
/// Unix epoch.
#[must_use]
pub fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}
