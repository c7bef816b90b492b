//! Live board service: subscription lifecycle and publication.
//!
//! DESIGN
//! ======
//! One pump task per family subscription is the sole writer of the published
//! list. Snapshots flow repository -> pump -> [`EngineCore`] -> watch
//! channel, so observers always see a fully formed list, never a partial
//! one. Selecting a new family aborts the old pump, resets the core under
//! the same lock the pump applies through, and publishes an empty board
//! before the new feed starts.
//!
//! LIFECYCLE
//! =========
//! 1. `subscribe_family` -> abort old pump, reset core, publish empty
//! 2. Fix the recency window: `since = now - recency_window`
//! 3. Open the repository subscription, spawn the pump
//! 4. Pump: recv snapshot -> apply (stale seq dropped) -> publish
//! 5. Next `subscribe_family` or drop -> abort pump

#[cfg(test)]
#[path = "board_test.rs"]
mod board_test;

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::info;

use crate::consts::DEFAULT_RECENCY_WINDOW_MS;
use crate::engine::EngineCore;
use crate::layout::CanvasSize;
use crate::note::{PositionedNote, now_ms};
use crate::repo::{NoteRepository, SubscribeError, SubscribeRequest};

// =============================================================================
// CONFIG
// =============================================================================

/// Board tuning knobs, from environment variables with code defaults.
#[derive(Debug, Clone)]
pub struct BoardConfig {
    /// Length of the recency window applied at subscribe time, in ms.
    pub recency_window_ms: i64,
}

impl BoardConfig {
    /// Read config from the environment, falling back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self { recency_window_ms: env_parse("FRIDGE_RECENCY_WINDOW_MS", DEFAULT_RECENCY_WINDOW_MS) }
    }
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self { recency_window_ms: DEFAULT_RECENCY_WINDOW_MS }
    }
}

/// Parse an env var, falling back to `default` when unset or invalid.
fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.parse().unwrap_or(default),
        Err(_) => default,
    }
}

// =============================================================================
// BOARD
// =============================================================================

/// The live board: owns the repository handle, the engine core, and the
/// published positioned-note list.
pub struct FridgeBoard {
    repo: Arc<dyn NoteRepository>,
    config: BoardConfig,
    core: Arc<Mutex<EngineCore>>,
    published: watch::Sender<Vec<PositionedNote>>,
    pump: Option<JoinHandle<()>>,
}

impl FridgeBoard {
    /// Create a board with default config. No subscription is open until
    /// [`Self::subscribe_family`].
    #[must_use]
    pub fn new(repo: Arc<dyn NoteRepository>, canvas: CanvasSize) -> Self {
        Self::with_config(repo, canvas, BoardConfig::default())
    }

    #[must_use]
    pub fn with_config(repo: Arc<dyn NoteRepository>, canvas: CanvasSize, config: BoardConfig) -> Self {
        let (published, _) = watch::channel(Vec::new());
        Self {
            repo,
            config,
            core: Arc::new(Mutex::new(EngineCore::new(canvas))),
            published,
            pump: None,
        }
    }

    /// Watch the published positioned-note list. Read-only snapshot
    /// semantics; any number of observers.
    #[must_use]
    pub fn positions(&self) -> watch::Receiver<Vec<PositionedNote>> {
        self.published.subscribe()
    }

    /// Switch the board to a family. The previous subscription (if any) is
    /// cancelled, its in-flight snapshots are discarded, and the board
    /// starts empty; nothing carries over between families.
    ///
    /// # Errors
    ///
    /// Returns [`SubscribeError`] when the repository cannot open the feed.
    /// The board stays empty and no pump is running.
    pub async fn subscribe_family(
        &mut self,
        family_id: &str,
        member_ids: HashSet<String>,
    ) -> Result<(), SubscribeError> {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }

        // Reset under the core lock so an aborted pump caught mid-apply
        // cannot interleave with the wipe.
        {
            let mut core = self.core.lock().await;
            core.reset();
            self.published.send_replace(Vec::new());
        }

        let since_ts = now_ms() - self.config.recency_window_ms;
        let req = SubscribeRequest { family_id: family_id.to_owned(), member_ids, since_ts };
        let mut rx = self.repo.subscribe_notes(req).await?;

        info!(%family_id, since_ts, "board subscribed to family feed");

        let core = Arc::clone(&self.core);
        let published = self.published.clone();
        self.pump = Some(tokio::spawn(async move {
            while let Some(snapshot) = rx.recv().await {
                let mut core = core.lock().await;
                let mut rng = rand::rng();
                if core.apply_snapshot(&snapshot, &mut rng) {
                    published.send_replace(core.displayed().to_vec());
                }
            }
        }));

        Ok(())
    }

    /// Set the canvas used by future layout passes. Nothing already on the
    /// board is repositioned; a resize does not retrigger layout.
    pub async fn set_canvas_size(&self, canvas: CanvasSize) {
        self.core.lock().await.set_canvas_size(canvas);
    }
}

impl Drop for FridgeBoard {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}
