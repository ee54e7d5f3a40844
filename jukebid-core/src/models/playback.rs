//! Playback pointer and player state machine
//!
//! A single pointer is shared across every mounted view; only the
//! PlaybackCoordinator mutates it.

use serde::{Deserialize, Serialize};

use super::id::MediaId;

/// Player state machine: Empty -> Loaded -> Playing <-> Paused.
/// Any state collapses to Empty when the queued set empties or the
/// party ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerState {
    Empty,
    Loaded,
    Playing,
    Paused,
}

/// The single global "now playing" pointer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackPointer {
    pub media_id: MediaId,
    /// Index into the current display queue; None once the entry has left
    /// the queued slice (a playing entry is no longer displayed in it)
    pub display_index: Option<usize>,
    /// Whether playback should begin without user interaction
    pub autoplay: bool,
}
