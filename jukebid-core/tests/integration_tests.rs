//! Integration tests for the jukebid engine
//!
//! These exercise the reconciliation, projection, and playback pieces
//! together over realistic snapshot/event interleavings.
//!
//! Run with: cargo test --test integration_tests

use chrono::Utc;
use jukebid_core::engine::{
    project, MergeOutcome, PlaybackCoordinator, QueueEvent, ReconciliationEngine, SyncEffect,
};
use jukebid_core::models::{
    EntryStatus, MediaId, MediaItem, Party, PartyId, PartyType, Pence, PlayerState, QueueEntry,
    QueueView, SortWindow, UserId, ViewState,
};

fn media(id: &str, title: &str, tags: &[&str]) -> MediaItem {
    MediaItem {
        id: MediaId::from_string(id.to_string()),
        title: title.to_string(),
        artists: vec!["Artist".to_string()],
        category: Some("rock".to_string()),
        tags: tags.iter().map(|t| (*t).to_string()).collect(),
        duration_secs: 200,
        cover_url: None,
        source_urls: vec![],
    }
}

fn entry(id: &str, title: &str) -> QueueEntry {
    QueueEntry::new(media(id, title, &[]))
}

fn party(queue: Vec<QueueEntry>) -> Party {
    Party {
        id: PartyId::from_string("party1234567".to_string()),
        host_id: UserId::from_string("host12345678".to_string()),
        party_type: PartyType::Public,
        queue,
        minimum_bid: Pence(33),
    }
}

fn display(engine: &ReconciliationEngine) -> Vec<QueueEntry> {
    project::project(
        engine.canonical(),
        &ViewState::new(),
        QueueView::Active,
        None,
    )
}

#[test]
fn test_full_playback_lifecycle_keeps_pointer_and_queue_in_step() {
    let mut engine = ReconciliationEngine::new(party(vec![
        entry("mediaaaaaaa1", "A"),
        entry("mediaaaaaaa2", "B"),
        entry("mediaaaaaaa3", "C"),
    ]));
    let mut coordinator = PlaybackCoordinator::new();

    // Initial load: nothing playing, pointer at the queue head
    let effect = coordinator.sync_from_queue(engine.canonical(), &display(&engine));
    assert_eq!(effect, SyncEffect::PointerSet { autoplay: false });
    assert_eq!(coordinator.state(), PlayerState::Loaded);

    // Server starts A
    engine.apply_event(QueueEvent::Started {
        media_id: MediaId::from_string("mediaaaaaaa1".to_string()),
        started_at: Utc::now(),
    });
    coordinator.sync_from_queue(engine.canonical(), &display(&engine));
    assert_eq!(
        coordinator.pointer().unwrap().media_id.as_str(),
        "mediaaaaaaa1"
    );

    // A completes, B starts: exactly one playing at every step, and the
    // pointer follows with autoplay
    engine.apply_event(QueueEvent::Completed {
        media_id: MediaId::from_string("mediaaaaaaa1".to_string()),
        completed_at: Utc::now(),
    });
    engine.apply_event(QueueEvent::Started {
        media_id: MediaId::from_string("mediaaaaaaa2".to_string()),
        started_at: Utc::now(),
    });
    assert_eq!(
        engine
            .canonical()
            .with_status(EntryStatus::Playing)
            .count(),
        1
    );

    let effect = coordinator.sync_from_queue(engine.canonical(), &display(&engine));
    assert_eq!(effect, SyncEffect::PointerSet { autoplay: true });
    assert_eq!(coordinator.state(), PlayerState::Playing);
    assert_eq!(
        coordinator.pointer().unwrap().media_id.as_str(),
        "mediaaaaaaa2"
    );

    // Re-running the identical sync is a no-op
    assert_eq!(
        coordinator.sync_from_queue(engine.canonical(), &display(&engine)),
        SyncEffect::Unchanged
    );
}

#[test]
fn test_event_racing_inflight_snapshot_is_buffered_and_replayed() {
    // The push channel delivers a completed-event for an entry the
    // client has never seen: the event must wait for the snapshot that
    // introduces the entry, apply once, and never apply again.
    let mut engine = ReconciliationEngine::new(party(vec![entry("mediaaaaaaa1", "A")]));

    let outcome = engine.apply_event(QueueEvent::Completed {
        media_id: MediaId::from_string("mediaaaaaaa2".to_string()),
        completed_at: Utc::now(),
    });
    assert_eq!(outcome, MergeOutcome::Buffered);

    // The in-flight snapshot lands, carrying the new entry mid-play
    let mut b = entry("mediaaaaaaa2", "B");
    b.status = EntryStatus::Playing;
    engine.apply_snapshot(party(vec![entry("mediaaaaaaa1", "A"), b.clone()]));

    let settled = engine
        .canonical()
        .get(&MediaId::from_string("mediaaaaaaa2".to_string()))
        .unwrap();
    assert_eq!(settled.status, EntryStatus::Played);

    // The next snapshot wins outright; the consumed event is gone
    engine.apply_snapshot(party(vec![entry("mediaaaaaaa1", "A"), b]));
    assert_eq!(
        engine
            .canonical()
            .get(&MediaId::from_string("mediaaaaaaa2".to_string()))
            .unwrap()
            .status,
        EntryStatus::Playing
    );
}

#[test]
fn test_projection_pipeline_with_search_and_window() {
    let mut chill = QueueEntry::new(media("mediaaaaaaa1", "Rock Anthem", &["Chill-Vibes"]));
    chill.aggregate_bid_value = Pence(150);
    let other = QueueEntry::new(media("mediaaaaaaa2", "Rock Ballad", &["chilling"]));

    let engine = ReconciliationEngine::new(party(vec![other.clone(), chill.clone()]));

    // All-time + search: normalization collapses hyphen/case, exact
    // match excludes the near-miss tag
    let view = ViewState {
        sort_window: SortWindow::AllTime,
        search_terms: vec!["rock".to_string(), "#chill".to_string()],
    };
    let filtered = project::project(engine.canonical(), &view, QueueView::Active, None);
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].media.title, "Rock Anthem");

    // Weekly window: the server ranking replaces the candidate set and
    // its order is taken verbatim
    let ranked = vec![chill, other];
    let view = ViewState {
        sort_window: SortWindow::Week,
        search_terms: vec![],
    };
    let windowed = project::project(engine.canonical(), &view, QueueView::Active, Some(&ranked));
    assert_eq!(windowed[0].media.id.as_str(), "mediaaaaaaa1");
    assert_eq!(windowed[1].media.id.as_str(), "mediaaaaaaa2");
}

#[test]
fn test_party_end_empties_player_and_blocks_further_merges() {
    let mut engine = ReconciliationEngine::new(party(vec![entry("mediaaaaaaa1", "A")]));
    let mut coordinator = PlaybackCoordinator::new();
    coordinator.sync_from_queue(engine.canonical(), &display(&engine));
    coordinator.play().unwrap();

    assert_eq!(engine.apply_event(QueueEvent::PartyEnded), MergeOutcome::Ended);
    let effect = coordinator.sync_from_queue(engine.canonical(), &display(&engine));
    assert_eq!(effect, SyncEffect::Ended);
    assert_eq!(coordinator.state(), PlayerState::Empty);

    // A straggler snapshot for the ended party changes nothing
    assert_eq!(
        engine.apply_snapshot(party(vec![entry("mediaaaaaaa9", "Z")])),
        MergeOutcome::Discarded
    );
    assert!(engine
        .canonical()
        .get(&MediaId::from_string("mediaaaaaaa9".to_string()))
        .is_none());
}

#[test]
fn test_vetoed_entries_leave_active_view_and_keep_bid_history() {
    let mut bid_on = entry("mediaaaaaaa1", "A");
    bid_on.aggregate_bid_value = Pence(250);
    bid_on.bid_count = 4;
    let mut engine = ReconciliationEngine::new(party(vec![bid_on, entry("mediaaaaaaa2", "B")]));

    engine.apply_event(QueueEvent::Vetoed {
        media_id: MediaId::from_string("mediaaaaaaa1".to_string()),
        vetoed_at: Utc::now(),
        vetoed_by: Some(UserId::from_string("host12345678".to_string())),
    });

    let active = display(&engine);
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].media.id.as_str(), "mediaaaaaaa2");

    let vetoed = project::project(
        engine.canonical(),
        &ViewState::new(),
        QueueView::Vetoed,
        None,
    );
    assert_eq!(vetoed.len(), 1);
    // The veto removed the entry from the active queue without touching
    // its bid history
    assert_eq!(vetoed[0].aggregate_bid_value, Pence(250));
    assert_eq!(vetoed[0].bid_count, 4);
    assert!(vetoed[0].vetoed_by.is_some());
}
