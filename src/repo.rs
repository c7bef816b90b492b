//! Note repository contract and the in-memory implementation.
//!
//! DESIGN
//! ======
//! The board never talks to a backend directly. It consumes
//! [`NoteRepository`]: a restartable live feed of full note snapshots scoped
//! to one family and a recency window fixed at subscribe time. Every
//! emission is a complete snapshot, already filtered and ordered
//! newest-first; `seq` makes supersession explicit so late deliveries can
//! be dropped downstream.
//!
//! [`MemoryNoteRepository`] is the reference implementation: a shared record
//! map plus per-subscriber channels, broadcasting a fresh snapshot on every
//! mutation. Real backends implement the same trait over their own
//! transport; retry and backoff live there, never in the board.

#[cfg(test)]
#[path = "repo_test.rs"]
mod repo_test;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{RwLock, mpsc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::note::{DecodeError, NoteKind, NoteRecord, Reaction, decode_records, now_ms};

/// Capacity of each subscriber's snapshot channel.
const SNAPSHOT_CHANNEL_CAPACITY: usize = 64;

// =============================================================================
// CONTRACT
// =============================================================================

/// One emission of the live note feed.
#[derive(Debug, Clone)]
pub struct NoteSnapshot {
    /// Strictly increasing per subscription; later snapshots supersede
    /// earlier ones.
    pub seq: u64,
    /// The full filtered note set, newest first.
    pub notes: Vec<NoteRecord>,
}

/// Parameters of one note subscription.
#[derive(Debug, Clone)]
pub struct SubscribeRequest {
    /// Family whose board is being watched.
    pub family_id: String,
    /// Senders to accept; records from anyone else are dropped.
    pub member_ids: HashSet<String>,
    /// Start of the recency window in ms since epoch. Fixed at subscribe
    /// time; the window does not roll.
    pub since_ts: i64,
}

/// Error opening a subscription.
#[derive(Debug, thiserror::Error)]
pub enum SubscribeError {
    /// The underlying transport refused or dropped the subscription.
    #[error("subscription transport failed: {0}")]
    Transport(String),
}

/// A live, restartable feed of note snapshots.
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// Open a subscription and return its snapshot channel. The current
    /// state arrives as the first snapshot; every backend change after that
    /// produces a full fresh snapshot. Dropping the receiver ends the
    /// subscription.
    ///
    /// # Errors
    ///
    /// Returns [`SubscribeError::Transport`] when the feed cannot be opened.
    /// The caller sees no data; retrying is the implementor's concern.
    async fn subscribe_notes(
        &self,
        req: SubscribeRequest,
    ) -> Result<mpsc::Receiver<NoteSnapshot>, SubscribeError>;
}

/// Apply the subscription filtering policy and ordering to raw records:
/// family match, recency window, sender allow-list, newest first. Ties on
/// `ts` break by id so equal timestamps order stably.
#[must_use]
pub fn filter_snapshot(records: Vec<NoteRecord>, req: &SubscribeRequest) -> Vec<NoteRecord> {
    let mut notes: Vec<NoteRecord> = records
        .into_iter()
        .filter(|n| n.family_id == req.family_id)
        .filter(|n| n.ts >= req.since_ts)
        .filter(|n| req.member_ids.contains(&n.sender_id))
        .collect();
    notes.sort_by(|a, b| b.ts.cmp(&a.ts).then_with(|| a.id.cmp(&b.id)));
    notes
}

// =============================================================================
// IN-MEMORY REPOSITORY
// =============================================================================

struct Subscriber {
    req: SubscribeRequest,
    tx: mpsc::Sender<NoteSnapshot>,
    seq: u64,
}

struct MemoryInner {
    records: HashMap<String, NoteRecord>,
    subscribers: Vec<Subscriber>,
}

impl MemoryInner {
    /// Push a fresh snapshot to every live subscriber; prune closed ones.
    fn broadcast(&mut self) {
        let records: Vec<NoteRecord> = self.records.values().cloned().collect();
        self.subscribers.retain_mut(|sub| {
            let notes = filter_snapshot(records.clone(), &sub.req);
            sub.seq += 1;
            match sub.tx.try_send(NoteSnapshot { seq: sub.seq, notes }) {
                Ok(()) => true,
                // Best effort: a full channel skips this emission; a later
                // snapshot supersedes it anyway.
                Err(mpsc::error::TrySendError::Full(_)) => true,
                Err(mpsc::error::TrySendError::Closed(_)) => false,
            }
        });
    }
}

/// In-memory [`NoteRepository`]: the test and local-wiring backend.
#[derive(Clone)]
pub struct MemoryNoteRepository {
    inner: Arc<RwLock<MemoryInner>>,
}

impl MemoryNoteRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(MemoryInner {
                records: HashMap::new(),
                subscribers: Vec::new(),
            })),
        }
    }

    /// Post a new note: assigns an id and timestamp, stores it, and
    /// broadcasts to subscribers. Returns the stored record.
    pub async fn post(
        &self,
        family_id: &str,
        sender_id: &str,
        kind: NoteKind,
        text: Option<String>,
        payload_url: Option<String>,
    ) -> NoteRecord {
        let record = NoteRecord {
            id: Uuid::new_v4().to_string(),
            sender_id: sender_id.to_owned(),
            family_id: family_id.to_owned(),
            kind,
            ts: now_ms(),
            text,
            payload_url,
            seen: HashMap::new(),
        };
        self.insert(record.clone()).await;
        record
    }

    /// Insert or replace a record and broadcast fresh snapshots.
    pub async fn insert(&self, record: NoteRecord) {
        let mut inner = self.inner.write().await;
        inner.records.insert(record.id.clone(), record);
        inner.broadcast();
    }

    /// Remove a record by id, returning it if it was present.
    pub async fn remove(&self, id: &str) -> Option<NoteRecord> {
        let mut inner = self.inner.write().await;
        let removed = inner.records.remove(id);
        if removed.is_some() {
            inner.broadcast();
        }
        removed
    }

    /// Record that `viewer_id` has seen a note, with an optional reaction.
    /// Returns false when the note does not exist.
    pub async fn set_reaction(
        &self,
        note_id: &str,
        viewer_id: &str,
        reaction: Option<Reaction>,
    ) -> bool {
        let mut inner = self.inner.write().await;
        let Some(record) = inner.records.get_mut(note_id) else {
            return false;
        };
        record.seen.insert(viewer_id.to_owned(), reaction);
        inner.broadcast();
        true
    }

    /// Hydrate from raw backend documents. All-or-nothing: one malformed
    /// document rejects the whole batch and the store is untouched.
    ///
    /// # Errors
    ///
    /// Returns the [`DecodeError`] from [`decode_records`].
    pub async fn load_json(&self, documents: &[serde_json::Value]) -> Result<usize, DecodeError> {
        let records = match decode_records(documents) {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, count = documents.len(), "dropping malformed document batch");
                return Err(e);
            }
        };
        let count = records.len();
        let mut inner = self.inner.write().await;
        for record in records {
            inner.records.insert(record.id.clone(), record);
        }
        inner.broadcast();
        Ok(count)
    }

    /// Number of records currently stored, across all families.
    pub async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }

    /// Whether the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.records.is_empty()
    }
}

impl Default for MemoryNoteRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NoteRepository for MemoryNoteRepository {
    async fn subscribe_notes(
        &self,
        req: SubscribeRequest,
    ) -> Result<mpsc::Receiver<NoteSnapshot>, SubscribeError> {
        let (tx, rx) = mpsc::channel(SNAPSHOT_CHANNEL_CAPACITY);
        let mut inner = self.inner.write().await;

        let records: Vec<NoteRecord> = inner.records.values().cloned().collect();
        let notes = filter_snapshot(records, &req);
        if tx.try_send(NoteSnapshot { seq: 1, notes }).is_err() {
            return Err(SubscribeError::Transport(
                "subscriber channel rejected initial snapshot".to_owned(),
            ));
        }

        info!(family_id = %req.family_id, members = req.member_ids.len(), "note subscription opened");
        inner.subscribers.push(Subscriber { req, tx, seq: 1 });
        Ok(rx)
    }
}
