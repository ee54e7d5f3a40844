//! Playback coordination
//!
//! Single owner of the shared "now playing" pointer. Every mounted view
//! reads the same pointer; every mutation funnels through `set_current`
//! or `sync_from_queue`, so two views cannot race conflicting items.

use tracing::{debug, info};

use crate::models::{EntryStatus, MediaId, PlaybackPointer, PlayerState, QueueEntry};
use crate::{Error, Result};

use super::reconcile::CanonicalQueue;

/// Observable result of a queue sync
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEffect {
    /// Nothing observable changed: canonical state is as last synced, or
    /// the pointer already targets the right entry
    Unchanged,
    /// The pointer moved (or was first set)
    PointerSet { autoplay: bool },
    /// The queued set emptied; the player collapsed to Empty
    Cleared,
    /// The party ended; the player collapsed to Empty
    Ended,
}

/// Digest of the canonical state a sync depends on. Aggregate-only
/// changes (bid totals) keep the digest equal and the sync a no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
struct QueueDigest {
    queued: Vec<MediaId>,
    playing: Option<MediaId>,
    ended: bool,
}

impl QueueDigest {
    fn of(canonical: &CanonicalQueue) -> Self {
        Self {
            queued: canonical
                .with_status(EntryStatus::Queued)
                .map(|e| e.media.id.clone())
                .collect(),
            playing: canonical.playing().map(|e| e.media.id.clone()),
            ended: canonical.is_ended(),
        }
    }
}

/// Owns the playback pointer and autoplay semantics
#[derive(Debug)]
pub struct PlaybackCoordinator {
    state: PlayerState,
    pointer: Option<PlaybackPointer>,
    last_digest: Option<QueueDigest>,
}

impl Default for PlaybackCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackCoordinator {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: PlayerState::Empty,
            pointer: None,
            last_digest: None,
        }
    }

    #[must_use]
    pub const fn state(&self) -> PlayerState {
        self.state
    }

    #[must_use]
    pub const fn pointer(&self) -> Option<&PlaybackPointer> {
        self.pointer.as_ref()
    }

    /// Align the pointer with canonical queue state.
    ///
    /// Idempotent: repeated calls with unchanged canonical state return
    /// `Unchanged` and touch nothing, so a remounting view re-running the
    /// load pipeline cannot re-trigger autoplay.
    ///
    /// `display` is the currently projected queued slice, used to stamp
    /// the pointer's display index.
    pub fn sync_from_queue(
        &mut self,
        canonical: &CanonicalQueue,
        display: &[QueueEntry],
    ) -> SyncEffect {
        let digest = QueueDigest::of(canonical);
        if self.last_digest.as_ref() == Some(&digest) {
            return SyncEffect::Unchanged;
        }
        let previous = self.last_digest.replace(digest.clone());

        if digest.ended {
            self.clear();
            info!(party_id = %canonical.party_id().as_str(), "Party ended, player emptied");
            return SyncEffect::Ended;
        }

        if let Some(playing) = canonical.playing() {
            // Autoplay only when the server moved playback to this item
            // after we were already synced, never on the initial load of
            // an already-playing party.
            let autoplay = previous
                .is_some_and(|d| d.playing.as_ref() != Some(&playing.media.id));
            return self.repoint(playing, display, autoplay);
        }

        if digest.queued.is_empty() {
            self.clear();
            debug!(party_id = %canonical.party_id().as_str(), "Queued set empty, player emptied");
            return SyncEffect::Cleared;
        }

        // Nothing playing: point at the head of the display queue
        match display.first().or_else(|| {
            canonical
                .with_status(EntryStatus::Queued)
                .next()
        }) {
            Some(head) => self.repoint(head, display, false),
            None => {
                self.clear();
                SyncEffect::Cleared
            }
        }
    }

    /// Move the pointer to `entry` unless it is already there. A queue
    /// change around an unchanged target only restamps the display
    /// index; it must not reset an active player.
    fn repoint(&mut self, entry: &QueueEntry, display: &[QueueEntry], autoplay: bool) -> SyncEffect {
        let same_target = self
            .pointer
            .as_ref()
            .is_some_and(|p| p.media_id == entry.media.id);

        if same_target && !autoplay {
            if let Some(pointer) = self.pointer.as_mut() {
                pointer.display_index =
                    display.iter().position(|e| e.media.id == entry.media.id);
            }
            return SyncEffect::Unchanged;
        }

        self.set_current(entry, display, autoplay);
        SyncEffect::PointerSet { autoplay }
    }

    /// Point the player at one entry. The only mutation funnel besides
    /// `sync_from_queue`.
    pub fn set_current(&mut self, entry: &QueueEntry, display: &[QueueEntry], autoplay: bool) {
        let display_index = display
            .iter()
            .position(|e| e.media.id == entry.media.id);

        self.pointer = Some(PlaybackPointer {
            media_id: entry.media.id.clone(),
            display_index,
            autoplay,
        });
        self.state = if autoplay {
            PlayerState::Playing
        } else {
            PlayerState::Loaded
        };

        debug!(
            media_id = %entry.media.id.as_str(),
            autoplay,
            "Playback pointer set"
        );
    }

    /// Loaded/Paused -> Playing
    pub fn play(&mut self) -> Result<()> {
        match self.state {
            PlayerState::Loaded | PlayerState::Paused => {
                self.state = PlayerState::Playing;
                Ok(())
            }
            PlayerState::Playing => Ok(()),
            PlayerState::Empty => Err(Error::InvalidInput(
                "Nothing is loaded to play".to_string(),
            )),
        }
    }

    /// Playing -> Paused
    pub fn pause(&mut self) -> Result<()> {
        match self.state {
            PlayerState::Playing => {
                self.state = PlayerState::Paused;
                Ok(())
            }
            PlayerState::Paused => Ok(()),
            PlayerState::Loaded | PlayerState::Empty => Err(Error::InvalidInput(
                "Nothing is playing to pause".to_string(),
            )),
        }
    }

    /// Collapse to Empty (queue drained or party ended)
    pub fn clear(&mut self) {
        self.pointer = None;
        self.state = PlayerState::Empty;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::project;
    use crate::models::{
        MediaItem, Party, PartyId, PartyType, Pence, QueueView, UserId, ViewState,
    };
    use chrono::Utc;

    fn entry(id: &str) -> QueueEntry {
        QueueEntry::new(MediaItem {
            id: MediaId::from_string(id.to_string()),
            title: id.to_string(),
            artists: vec![],
            category: None,
            tags: vec![],
            duration_secs: 100,
            cover_url: None,
            source_urls: vec![],
        })
    }

    fn canonical_with(entries: Vec<QueueEntry>) -> CanonicalQueue {
        CanonicalQueue::from_party(Party {
            id: PartyId::from_string("party1234567".to_string()),
            host_id: UserId::from_string("host12345678".to_string()),
            party_type: PartyType::Public,
            queue: entries,
            minimum_bid: Pence(33),
        })
    }

    fn display_of(canonical: &CanonicalQueue) -> Vec<QueueEntry> {
        project::project(canonical, &ViewState::new(), QueueView::Active, None)
    }

    #[test]
    fn test_sync_is_idempotent() {
        let canonical = canonical_with(vec![entry("mediaaaaaaa1"), entry("mediaaaaaaa2")]);
        let display = display_of(&canonical);
        let mut coordinator = PlaybackCoordinator::new();

        let first = coordinator.sync_from_queue(&canonical, &display);
        assert_eq!(first, SyncEffect::PointerSet { autoplay: false });

        let second = coordinator.sync_from_queue(&canonical, &display);
        assert_eq!(second, SyncEffect::Unchanged);
        assert_eq!(coordinator.state(), PlayerState::Loaded);
    }

    #[test]
    fn test_initial_load_of_playing_party_does_not_autoplay() {
        let mut playing = entry("mediaaaaaaa1");
        playing.status = EntryStatus::Playing;
        let canonical = canonical_with(vec![playing, entry("mediaaaaaaa2")]);
        let display = display_of(&canonical);

        let mut coordinator = PlaybackCoordinator::new();
        let effect = coordinator.sync_from_queue(&canonical, &display);

        assert_eq!(effect, SyncEffect::PointerSet { autoplay: false });
        assert_eq!(coordinator.state(), PlayerState::Loaded);
        assert_eq!(
            coordinator.pointer().unwrap().media_id.as_str(),
            "mediaaaaaaa1"
        );
        // The playing entry is not in the queued display slice
        assert_eq!(coordinator.pointer().unwrap().display_index, None);
    }

    #[test]
    fn test_server_moving_to_next_item_autoplays() {
        let mut a = entry("mediaaaaaaa1");
        a.status = EntryStatus::Playing;
        let b = entry("mediaaaaaaa2");
        let canonical = canonical_with(vec![a, b]);
        let mut coordinator = PlaybackCoordinator::new();
        coordinator.sync_from_queue(&canonical, &display_of(&canonical));

        // Server completes A and starts B
        let mut a2 = entry("mediaaaaaaa1");
        a2.status = EntryStatus::Played;
        a2.played_at = Some(Utc::now());
        let mut b2 = entry("mediaaaaaaa2");
        b2.status = EntryStatus::Playing;
        let canonical2 = canonical_with(vec![a2, b2]);

        let effect = coordinator.sync_from_queue(&canonical2, &display_of(&canonical2));
        assert_eq!(effect, SyncEffect::PointerSet { autoplay: true });
        assert_eq!(coordinator.state(), PlayerState::Playing);
        assert_eq!(
            coordinator.pointer().unwrap().media_id.as_str(),
            "mediaaaaaaa2"
        );
    }

    #[test]
    fn test_empty_queue_collapses_to_empty() {
        let canonical = canonical_with(vec![entry("mediaaaaaaa1")]);
        let mut coordinator = PlaybackCoordinator::new();
        coordinator.sync_from_queue(&canonical, &display_of(&canonical));
        assert_eq!(coordinator.state(), PlayerState::Loaded);

        // Everything got played; queued set is now empty
        let mut played = entry("mediaaaaaaa1");
        played.status = EntryStatus::Played;
        let canonical2 = canonical_with(vec![played]);

        let effect = coordinator.sync_from_queue(&canonical2, &display_of(&canonical2));
        assert_eq!(effect, SyncEffect::Cleared);
        assert_eq!(coordinator.state(), PlayerState::Empty);
        assert!(coordinator.pointer().is_none());
    }

    #[test]
    fn test_party_ended_collapses_to_empty_from_any_state() {
        let canonical = canonical_with(vec![entry("mediaaaaaaa1")]);
        let mut coordinator = PlaybackCoordinator::new();
        coordinator.sync_from_queue(&canonical, &display_of(&canonical));
        coordinator.play().unwrap();
        assert_eq!(coordinator.state(), PlayerState::Playing);

        let mut engine = crate::engine::ReconciliationEngine::new(Party {
            id: PartyId::from_string("party1234567".to_string()),
            host_id: UserId::from_string("host12345678".to_string()),
            party_type: PartyType::Public,
            queue: vec![entry("mediaaaaaaa1")],
            minimum_bid: Pence(33),
        });
        engine.apply_event(crate::engine::QueueEvent::PartyEnded);

        let effect = coordinator.sync_from_queue(engine.canonical(), &[]);
        assert_eq!(effect, SyncEffect::Ended);
        assert_eq!(coordinator.state(), PlayerState::Empty);
    }

    #[test]
    fn test_play_pause_edges() {
        let canonical = canonical_with(vec![entry("mediaaaaaaa1")]);
        let mut coordinator = PlaybackCoordinator::new();

        assert!(coordinator.play().is_err());
        assert!(coordinator.pause().is_err());

        coordinator.sync_from_queue(&canonical, &display_of(&canonical));
        coordinator.play().unwrap();
        assert_eq!(coordinator.state(), PlayerState::Playing);
        coordinator.pause().unwrap();
        assert_eq!(coordinator.state(), PlayerState::Paused);
        coordinator.play().unwrap();
        assert_eq!(coordinator.state(), PlayerState::Playing);
    }

    #[test]
    fn test_pointer_indexes_into_display_queue() {
        let canonical = canonical_with(vec![entry("mediaaaaaaa1"), entry("mediaaaaaaa2")]);
        let display = display_of(&canonical);
        let mut coordinator = PlaybackCoordinator::new();

        let second = display[1].clone();
        coordinator.set_current(&second, &display, false);
        assert_eq!(coordinator.pointer().unwrap().display_index, Some(1));
    }

    #[test]
    fn test_membership_change_does_not_reset_active_player() {
        let mut playing = entry("mediaaaaaaa1");
        playing.status = EntryStatus::Playing;
        let canonical = canonical_with(vec![playing.clone()]);
        let mut coordinator = PlaybackCoordinator::new();
        coordinator.sync_from_queue(&canonical, &display_of(&canonical));
        coordinator.play().unwrap();

        // A new entry joins the queue while the same track plays on
        let canonical2 = canonical_with(vec![playing, entry("mediaaaaaaa2")]);
        let effect = coordinator.sync_from_queue(&canonical2, &display_of(&canonical2));

        assert_eq!(effect, SyncEffect::Unchanged);
        assert_eq!(coordinator.state(), PlayerState::Playing);
        assert_eq!(
            coordinator.pointer().unwrap().media_id.as_str(),
            "mediaaaaaaa1"
        );
    }

    #[test]
    fn test_aggregate_only_change_is_no_op() {
        let canonical = canonical_with(vec![entry("mediaaaaaaa1")]);
        let mut coordinator = PlaybackCoordinator::new();
        coordinator.sync_from_queue(&canonical, &display_of(&canonical));

        // Same membership, new bid totals
        let mut richer = entry("mediaaaaaaa1");
        richer.aggregate_bid_value = Pence(500);
        richer.bid_count = 3;
        let canonical2 = canonical_with(vec![richer]);

        assert_eq!(
            coordinator.sync_from_queue(&canonical2, &display_of(&canonical2)),
            SyncEffect::Unchanged
        );
    }
}
