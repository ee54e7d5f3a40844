//! Queue entry and its status lifecycle
//!
//! One entry exists per (party, media) pair. Status edges are closed:
//! Queued -> Playing -> Played, Queued <-> Vetoed. Anything else is a
//! rejected transition that the caller must surface, never swallow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::UserId;
use super::media::MediaItem;
use super::money::Pence;
use crate::{Error, Result};

/// Lifecycle status of a queued media item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Queued,
    Playing,
    Played,
    Vetoed,
}

impl std::fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Queued => write!(f, "queued"),
            Self::Playing => write!(f, "playing"),
            Self::Played => write!(f, "played"),
            Self::Vetoed => write!(f, "vetoed"),
        }
    }
}

/// Status transition action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusAction {
    Start,
    Complete,
    Veto,
    Restore,
}

impl std::fmt::Display for StatusAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::Complete => write!(f, "complete"),
            Self::Veto => write!(f, "veto"),
            Self::Restore => write!(f, "restore"),
        }
    }
}

impl EntryStatus {
    /// Apply a transition action, returning the new status.
    ///
    /// Veto and Restore are illegal from Playing: the item must be
    /// completed first so bid history is settled against a played track.
    pub fn apply(self, action: StatusAction) -> Result<Self> {
        match (self, action) {
            (Self::Queued, StatusAction::Start) => Ok(Self::Playing),
            (Self::Playing, StatusAction::Complete) => Ok(Self::Played),
            (Self::Queued, StatusAction::Veto) => Ok(Self::Vetoed),
            (Self::Vetoed, StatusAction::Restore) => Ok(Self::Queued),
            (from, action) => Err(Error::RejectedTransition { from, action }),
        }
    }
}

/// Party-scoped queue record for one media item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub media: MediaItem,
    pub status: EntryStatus,
    /// Sum of all bids against this entry; server-computed, never
    /// recomputed locally by subtraction and never optimistically bumped.
    pub aggregate_bid_value: Pence,
    pub bid_count: u32,
    pub played_at: Option<DateTime<Utc>>,
    pub vetoed_at: Option<DateTime<Utc>>,
    pub vetoed_by: Option<UserId>,
}

impl QueueEntry {
    /// Fresh entry for media just added to a party
    #[must_use]
    pub fn new(media: MediaItem) -> Self {
        Self {
            media,
            status: EntryStatus::Queued,
            aggregate_bid_value: Pence::ZERO,
            bid_count: 0,
            played_at: None,
            vetoed_at: None,
            vetoed_by: None,
        }
    }

    /// Apply a status transition, recording its side fields.
    ///
    /// `actor` is the vetoing host for Veto; ignored for other actions.
    pub fn transition(
        &mut self,
        action: StatusAction,
        at: DateTime<Utc>,
        actor: Option<&UserId>,
    ) -> Result<()> {
        let next = self.status.apply(action)?;

        match action {
            StatusAction::Complete => {
                self.played_at = Some(at);
            }
            StatusAction::Veto => {
                self.vetoed_at = Some(at);
                self.vetoed_by = actor.cloned();
            }
            StatusAction::Restore => {
                self.vetoed_at = None;
                self.vetoed_by = None;
            }
            StatusAction::Start => {}
        }

        self.status = next;
        Ok(())
    }
}
