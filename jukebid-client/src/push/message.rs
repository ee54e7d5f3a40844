//! Push wire messages
//!
//! Tagged union delivered per party over the push channel. Field names
//! follow the wire's camelCase; decode failures are handled at the
//! channel boundary, never here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use jukebid_core::engine::QueueEvent;
use jukebid_core::models::{MediaId, PartyId, UserId};

/// Reference to one queue position in an `UPDATE_QUEUE` payload.
///
/// The wire omits per-entry status here, so the payload can only ever be
/// a refresh trigger; any further fields are ignored on decode.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItemRef {
    pub media_id: MediaId,
}

/// Push message union, one party per message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PartyMessage {
    /// A participant joined the party
    #[serde(rename_all = "camelCase")]
    Join { party_id: PartyId },

    /// Queue membership changed; payload carries no per-entry status
    #[serde(rename_all = "camelCase")]
    UpdateQueue {
        party_id: PartyId,
        queue: Vec<QueueItemRef>,
    },

    /// An entry began playing
    #[serde(rename_all = "camelCase")]
    MediaStarted {
        party_id: PartyId,
        media_id: MediaId,
        played_at: Option<DateTime<Utc>>,
    },

    /// The playing entry finished
    #[serde(rename_all = "camelCase")]
    MediaCompleted {
        party_id: PartyId,
        media_id: MediaId,
        completed_at: Option<DateTime<Utc>>,
    },

    /// The host vetoed an entry
    #[serde(rename_all = "camelCase")]
    MediaVetoed {
        party_id: PartyId,
        media_id: MediaId,
        vetoed_at: Option<DateTime<Utc>>,
        vetoed_by: Option<UserId>,
    },

    /// The party is over
    #[serde(rename_all = "camelCase")]
    PartyEnded { party_id: PartyId },
}

impl PartyMessage {
    /// The party this message belongs to
    #[must_use]
    pub const fn party_id(&self) -> &PartyId {
        match self {
            Self::Join { party_id }
            | Self::UpdateQueue { party_id, .. }
            | Self::MediaStarted { party_id, .. }
            | Self::MediaCompleted { party_id, .. }
            | Self::MediaVetoed { party_id, .. }
            | Self::PartyEnded { party_id } => party_id,
        }
    }

    /// The entry this message targets, if any
    #[must_use]
    pub const fn media_id(&self) -> Option<&MediaId> {
        match self {
            Self::MediaStarted { media_id, .. }
            | Self::MediaCompleted { media_id, .. }
            | Self::MediaVetoed { media_id, .. } => Some(media_id),
            Self::Join { .. } | Self::UpdateQueue { .. } | Self::PartyEnded { .. } => None,
        }
    }

    /// Short name for logging
    #[must_use]
    pub const fn message_type(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::UpdateQueue { .. } => "update_queue",
            Self::MediaStarted { .. } => "media_started",
            Self::MediaCompleted { .. } => "media_completed",
            Self::MediaVetoed { .. } => "media_vetoed",
            Self::PartyEnded { .. } => "party_ended",
        }
    }

    /// Map into the engine-facing queue delta.
    ///
    /// `received_at` fills in wire timestamps the message omitted.
    /// `Join` is informational only and maps to nothing.
    #[must_use]
    pub fn to_queue_event(&self, received_at: DateTime<Utc>) -> Option<QueueEvent> {
        match self {
            Self::Join { .. } => None,

            Self::UpdateQueue { queue, .. } => Some(QueueEvent::QueueUpdated {
                media_ids: queue.iter().map(|item| item.media_id.clone()).collect(),
            }),

            Self::MediaStarted {
                media_id,
                played_at,
                ..
            } => Some(QueueEvent::Started {
                media_id: media_id.clone(),
                started_at: played_at.unwrap_or(received_at),
            }),

            Self::MediaCompleted {
                media_id,
                completed_at,
                ..
            } => Some(QueueEvent::Completed {
                media_id: media_id.clone(),
                completed_at: completed_at.unwrap_or(received_at),
            }),

            Self::MediaVetoed {
                media_id,
                vetoed_at,
                vetoed_by,
                ..
            } => Some(QueueEvent::Vetoed {
                media_id: media_id.clone(),
                vetoed_at: vetoed_at.unwrap_or(received_at),
                vetoed_by: vetoed_by.clone(),
            }),

            Self::PartyEnded { .. } => Some(QueueEvent::PartyEnded),
        }
    }
}
