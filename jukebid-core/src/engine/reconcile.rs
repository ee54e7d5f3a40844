//! Snapshot/event reconciliation
//!
//! Merges authoritative REST snapshots and partial push events into one
//! canonical queue. Push events are not ordered relative to in-flight
//! snapshot fetches; events referencing entries the client has not seen
//! yet are buffered (one slot per entry, last write wins) and replayed
//! when a snapshot introduces the entry.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::models::{
    EntryStatus, MediaId, Party, PartyId, PartyType, Pence, QueueEntry, StatusAction, UserId,
};

/// Engine-facing queue delta, decoded from a push message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueueEvent {
    /// The queue composition changed. The wire payload carries no
    /// per-entry status, so this is strictly a refresh trigger.
    QueueUpdated { media_ids: Vec<MediaId> },

    /// An entry began playing
    Started {
        media_id: MediaId,
        started_at: DateTime<Utc>,
    },

    /// The playing entry finished
    Completed {
        media_id: MediaId,
        completed_at: DateTime<Utc>,
    },

    /// The host vetoed an entry
    Vetoed {
        media_id: MediaId,
        vetoed_at: DateTime<Utc>,
        vetoed_by: Option<UserId>,
    },

    /// The party is over; terminal for this queue
    PartyEnded,
}

impl QueueEvent {
    /// The entry this event targets, if it is a single-entry delta
    #[must_use]
    pub const fn media_id(&self) -> Option<&MediaId> {
        match self {
            Self::Started { media_id, .. }
            | Self::Completed { media_id, .. }
            | Self::Vetoed { media_id, .. } => Some(media_id),
            Self::QueueUpdated { .. } | Self::PartyEnded => None,
        }
    }

    /// Short name for logging
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::QueueUpdated { .. } => "queue_updated",
            Self::Started { .. } => "started",
            Self::Completed { .. } => "completed",
            Self::Vetoed { .. } => "vetoed",
            Self::PartyEnded => "party_ended",
        }
    }
}

/// Incoming state for a merge, by source
#[derive(Debug, Clone)]
pub enum Incoming {
    /// Authoritative full replacement from the REST API
    Snapshot(Party),
    /// Partial single-entry delta from the push channel
    Event(QueueEvent),
}

/// What a merge did to the canonical queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The delta (or snapshot) was applied
    Applied,
    /// The delta referenced an unknown entry and was buffered
    Buffered,
    /// The caller should fetch a fresh snapshot
    RefreshRequired,
    /// The delta described an illegal transition and was dropped (logged)
    Rejected,
    /// The party ended; the queue is now terminal
    Ended,
    /// Incoming state for an ended party was discarded
    Discarded,
}

/// Canonical, server-ordered queue for one party
#[derive(Debug, Clone)]
pub struct CanonicalQueue {
    party_id: PartyId,
    host_id: UserId,
    party_type: PartyType,
    minimum_bid: Pence,
    entries: IndexMap<MediaId, QueueEntry>,
    ended: bool,
}

impl CanonicalQueue {
    #[must_use]
    pub fn from_party(party: Party) -> Self {
        let entries = party
            .queue
            .into_iter()
            .map(|entry| (entry.media.id.clone(), entry))
            .collect();

        Self {
            party_id: party.id,
            host_id: party.host_id,
            party_type: party.party_type,
            minimum_bid: party.minimum_bid,
            entries,
            ended: false,
        }
    }

    #[must_use]
    pub const fn party_id(&self) -> &PartyId {
        &self.party_id
    }

    #[must_use]
    pub const fn host_id(&self) -> &UserId {
        &self.host_id
    }

    #[must_use]
    pub const fn party_type(&self) -> PartyType {
        self.party_type
    }

    #[must_use]
    pub const fn minimum_bid(&self) -> Pence {
        self.minimum_bid
    }

    #[must_use]
    pub const fn is_ended(&self) -> bool {
        self.ended
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn get(&self, media_id: &MediaId) -> Option<&QueueEntry> {
        self.entries.get(media_id)
    }

    /// All entries in server order
    pub fn entries(&self) -> impl Iterator<Item = &QueueEntry> {
        self.entries.values()
    }

    /// Entries with the given status, server order preserved
    pub fn with_status(&self, status: EntryStatus) -> impl Iterator<Item = &QueueEntry> {
        self.entries.values().filter(move |e| e.status == status)
    }

    /// The at-most-one playing entry
    #[must_use]
    pub fn playing(&self) -> Option<&QueueEntry> {
        self.entries
            .values()
            .find(|e| e.status == EntryStatus::Playing)
    }

    /// Start an entry playing.
    ///
    /// Forces any other Playing entry back to Queued first, keeping the
    /// at-most-one-playing invariant. The forced demotion is internal to
    /// the queue and is not a caller-visible transition.
    pub fn start(&mut self, media_id: &MediaId, at: DateTime<Utc>) -> crate::Result<()> {
        if !self.entries.contains_key(media_id) {
            return Err(crate::Error::NotFound(format!(
                "No queue entry for media {media_id}"
            )));
        }

        let demoted: Vec<MediaId> = self
            .entries
            .iter()
            .filter(|(id, e)| e.status == EntryStatus::Playing && *id != media_id)
            .map(|(id, _)| id.clone())
            .collect();
        for id in demoted {
            if let Some(entry) = self.entries.get_mut(&id) {
                entry.status = EntryStatus::Queued;
                debug!(media_id = %id.as_str(), "Demoted stale playing entry back to queued");
            }
        }

        self.entries
            .get_mut(media_id)
            .ok_or_else(|| crate::Error::NotFound(format!("No queue entry for media {media_id}")))?
            .transition(StatusAction::Start, at, None)
    }

    /// Apply a plain transition to one entry
    pub fn transition(
        &mut self,
        media_id: &MediaId,
        action: StatusAction,
        at: DateTime<Utc>,
        actor: Option<&UserId>,
    ) -> crate::Result<()> {
        let entry = self.entries.get_mut(media_id).ok_or_else(|| {
            crate::Error::NotFound(format!("No queue entry for media {media_id}"))
        })?;
        entry.transition(action, at, actor)
    }
}

/// Merges snapshots and push events into the canonical queue
#[derive(Debug)]
pub struct ReconciliationEngine {
    canonical: CanonicalQueue,
    /// Buffered events for entries not yet in the canonical queue.
    /// One slot per entry, last write wins.
    pending: HashMap<MediaId, QueueEvent>,
}

impl ReconciliationEngine {
    #[must_use]
    pub fn new(party: Party) -> Self {
        Self {
            canonical: CanonicalQueue::from_party(party),
            pending: HashMap::new(),
        }
    }

    #[must_use]
    pub const fn canonical(&self) -> &CanonicalQueue {
        &self.canonical
    }

    /// Number of events waiting for their entry to appear
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Apply a locally issued optimistic transition (veto/unveto from the
    /// UI). Rejections propagate so the caller can refuse the action and
    /// surface the reason; the authoritative state follows with the next
    /// snapshot.
    pub fn apply_local(
        &mut self,
        media_id: &MediaId,
        action: StatusAction,
        actor: Option<&UserId>,
    ) -> crate::Result<()> {
        if self.canonical.ended {
            return Err(crate::Error::PartyEnded);
        }

        match action {
            StatusAction::Start => self.canonical.start(media_id, Utc::now()),
            _ => self
                .canonical
                .transition(media_id, action, Utc::now(), actor),
        }
    }

    /// Merge incoming state into the canonical queue
    pub fn merge(&mut self, incoming: Incoming) -> MergeOutcome {
        match incoming {
            Incoming::Snapshot(party) => self.apply_snapshot(party),
            Incoming::Event(event) => self.apply_event(event),
        }
    }

    /// Apply an authoritative snapshot: full replacement for the entries
    /// it returns, then replay of any buffered events whose entry the
    /// snapshot introduced.
    ///
    /// Idempotent: applying the same snapshot twice yields an identical
    /// canonical queue.
    pub fn apply_snapshot(&mut self, party: Party) -> MergeOutcome {
        if self.canonical.ended {
            debug!(
                party_id = %party.id.as_str(),
                "Snapshot for ended party discarded"
            );
            return MergeOutcome::Discarded;
        }

        if party.id != self.canonical.party_id {
            warn!(
                expected = %self.canonical.party_id.as_str(),
                got = %party.id.as_str(),
                "Snapshot for a different party discarded"
            );
            return MergeOutcome::Discarded;
        }

        self.canonical = CanonicalQueue::from_party(party);

        // Replay buffered events whose entry now exists. The snapshot is
        // the base state: a replayed event the snapshot already reflects
        // fails the legal-edge check and is dropped. Each slot is consumed
        // exactly once.
        let ready: Vec<MediaId> = self
            .pending
            .keys()
            .filter(|id| self.canonical.entries.contains_key(*id))
            .cloned()
            .collect();

        for media_id in ready {
            if let Some(event) = self.pending.remove(&media_id) {
                let outcome = self.apply_delta(&event);
                debug!(
                    media_id = %media_id.as_str(),
                    event_type = event.event_type(),
                    ?outcome,
                    "Replayed buffered event after snapshot"
                );
            }
        }

        MergeOutcome::Applied
    }

    /// Apply a push event against the current canonical state
    pub fn apply_event(&mut self, event: QueueEvent) -> MergeOutcome {
        if self.canonical.ended {
            debug!(
                event_type = event.event_type(),
                "Event for ended party discarded"
            );
            return MergeOutcome::Discarded;
        }

        match &event {
            QueueEvent::PartyEnded => {
                info!(
                    party_id = %self.canonical.party_id.as_str(),
                    "Party ended, queue is terminal"
                );
                self.canonical.ended = true;
                self.pending.clear();
                MergeOutcome::Ended
            }

            // The wire payload carries no per-entry status: never guess a
            // reconciliation rule from it, just ask for a snapshot.
            QueueEvent::QueueUpdated { media_ids } => {
                debug!(
                    party_id = %self.canonical.party_id.as_str(),
                    queue_len = media_ids.len(),
                    "Queue membership changed, refresh required"
                );
                MergeOutcome::RefreshRequired
            }

            QueueEvent::Started { media_id, .. }
            | QueueEvent::Completed { media_id, .. }
            | QueueEvent::Vetoed { media_id, .. } => {
                let media_id = media_id.clone();
                if self.canonical.entries.contains_key(&media_id) {
                    self.apply_delta(&event)
                } else {
                    debug!(
                        media_id = %media_id.as_str(),
                        event_type = event.event_type(),
                        "Event for unknown entry buffered"
                    );
                    self.pending.insert(media_id, event);
                    MergeOutcome::Buffered
                }
            }
        }
    }

    /// Apply a single-entry delta whose entry is known to exist
    fn apply_delta(&mut self, event: &QueueEvent) -> MergeOutcome {
        let result = match event {
            QueueEvent::Started {
                media_id,
                started_at,
            } => self.canonical.start(media_id, *started_at),

            QueueEvent::Completed {
                media_id,
                completed_at,
            } => self
                .canonical
                .transition(media_id, StatusAction::Complete, *completed_at, None),

            QueueEvent::Vetoed {
                media_id,
                vetoed_at,
                vetoed_by,
            } => self.canonical.transition(
                media_id,
                StatusAction::Veto,
                *vetoed_at,
                vetoed_by.as_ref(),
            ),

            QueueEvent::QueueUpdated { .. } | QueueEvent::PartyEnded => {
                unreachable!("not single-entry deltas")
            }
        };

        match result {
            Ok(()) => MergeOutcome::Applied,
            Err(err) => {
                warn!(
                    event_type = event.event_type(),
                    error = %err,
                    "Event described an illegal transition, dropped"
                );
                MergeOutcome::Rejected
            }
        }
    }
}
