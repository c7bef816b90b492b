//! Shared numeric constants for the board engine.

/// Edge length of a sticky note's square bounding box, in canvas units.
pub const NOTE_SIZE: f64 = 150.0;

/// Maximum random placement attempts per note before accepting overlap.
pub const MAX_PLACEMENT_ATTEMPTS: usize = 100;

/// Largest absolute sticky rotation, in degrees.
pub const MAX_ROTATION_DEG: f64 = 45.0;

/// Default recency window for note subscriptions: 7 days in milliseconds.
pub const DEFAULT_RECENCY_WINDOW_MS: i64 = 7 * 24 * 60 * 60 * 1000;
