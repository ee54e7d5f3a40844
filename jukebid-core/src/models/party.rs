//! Party aggregate
//!
//! The root aggregate the engine mutates but never creates or destroys.
//! Snapshots decode into this shape.

use serde::{Deserialize, Serialize};

use super::entry::QueueEntry;
use super::id::{PartyId, UserId};
use super::money::Pence;

/// Party visibility/type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartyType {
    Public,
    Private,
}

/// A party: one shared media queue plus its participants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Party {
    pub id: PartyId,
    pub host_id: UserId,
    pub party_type: PartyType,
    /// Server-ordered queue; order is authoritative (ranking is computed
    /// server-side across parties)
    pub queue: Vec<QueueEntry>,
    /// Smallest bid the party accepts
    pub minimum_bid: Pence,
}

impl Party {
    #[must_use]
    pub fn is_host(&self, user_id: &UserId) -> bool {
        self.host_id == *user_id
    }
}
