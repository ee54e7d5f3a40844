//! Party session shell
//!
//! Thin event-driven wrapper around the engine: one cooperative loop
//! interleaves REST calls, push messages, and locally issued mutations.
//! Every mutation funnels through here, and every local write awaits a
//! snapshot refresh before the UI is considered settled.

use chrono::Utc;
use tracing::{debug, info, warn};

use jukebid_core::engine::{
    project, BidLedger, Incoming, MergeOutcome, PlaybackCoordinator, ReconciliationEngine,
};
use jukebid_core::models::{
    MediaId, PartyId, Pence, PlaybackPointer, PlayerState, QueueEntry, QueueView, SortWindow,
    StatusAction, UserId, ViewState,
};
use jukebid_core::{Error, Result};

use crate::api::PartyApi;
use crate::notify::{Notification, NotificationHub};
use crate::push::{PartyMessage, PushChannel};

/// One user's live view onto a party
pub struct PartySession<A: PartyApi> {
    api: A,
    user_id: UserId,
    engine: ReconciliationEngine,
    ledger: BidLedger,
    coordinator: PlaybackCoordinator,
    view: ViewState,
    queue_view: QueueView,
    /// Server-provided windowed ranking, present while the sort window
    /// is not all-time
    ranked: Option<Vec<QueueEntry>>,
    notifications: NotificationHub,
    /// Set when the view unmounts or the party ends; late snapshot
    /// responses arriving afterwards are discarded
    closed: bool,
}

impl<A: PartyApi> PartySession<A> {
    /// Open a session: fetch the initial snapshot and align the player
    pub async fn open(api: A, party_id: PartyId, user_id: UserId) -> Result<Self> {
        let party = api.get_party_snapshot(&party_id).await?;
        info!(
            party_id = %party_id.as_str(),
            queue_len = party.queue.len(),
            "Party session opened"
        );

        let ledger = BidLedger::new(party.minimum_bid);
        let engine = ReconciliationEngine::new(party);

        let mut session = Self {
            api,
            user_id,
            engine,
            ledger,
            coordinator: PlaybackCoordinator::new(),
            view: ViewState::new(),
            queue_view: QueueView::Active,
            ranked: None,
            notifications: NotificationHub::new(),
            closed: false,
        };
        session.resync();
        Ok(session)
    }

    #[must_use]
    pub fn party_id(&self) -> &PartyId {
        self.engine.canonical().party_id()
    }

    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    #[must_use]
    pub fn notifications(&self) -> NotificationHub {
        self.notifications.clone()
    }

    #[must_use]
    pub const fn player_state(&self) -> PlayerState {
        self.coordinator.state()
    }

    #[must_use]
    pub const fn pointer(&self) -> Option<&PlaybackPointer> {
        self.coordinator.pointer()
    }

    #[must_use]
    pub const fn balance(&self) -> Option<Pence> {
        self.ledger.balance()
    }

    /// Seed the balance hint from the wallet collaborator
    pub fn set_balance(&mut self, balance: Pence) {
        self.ledger.set_balance(balance);
    }

    /// Whether this user hosts the party (veto/skip are host-only)
    #[must_use]
    pub fn is_host(&self) -> bool {
        self.engine.canonical().host_id() == &self.user_id
    }

    /// The projected display list for the current view state
    #[must_use]
    pub fn display(&self) -> Vec<QueueEntry> {
        project::project(
            self.engine.canonical(),
            &self.view,
            self.queue_view,
            self.ranked.as_deref(),
        )
    }

    /// Switch between the active queue and the vetoed list
    pub fn set_queue_view(&mut self, queue_view: QueueView) {
        self.queue_view = queue_view;
    }

    pub fn set_search_terms(&mut self, terms: Vec<String>) {
        self.view.search_terms = terms;
    }

    /// Change the ranking window. Windowed rankings are fetched from the
    /// server; the window only changes once the fetch succeeds, so a
    /// failure leaves the prior view intact and retryable.
    pub async fn set_sort_window(&mut self, window: SortWindow) -> Result<()> {
        if window.is_server_ranked() {
            let ranked = self.api.get_ranked_media(self.party_id(), window).await?;
            self.ranked = Some(ranked);
        } else {
            self.ranked = None;
        }
        self.view.sort_window = window;
        Ok(())
    }

    /// Fetch and apply a fresh snapshot.
    ///
    /// A response landing after the session closed is discarded, keyed
    /// by the originally requested party id. A failed fetch leaves the
    /// canonical queue untouched and is retryable.
    pub async fn refresh(&mut self) -> Result<()> {
        let requested = self.party_id().clone();
        let result = self.api.get_party_snapshot(&requested).await;

        if self.closed {
            debug!(
                party_id = %requested.as_str(),
                "Stale snapshot response discarded"
            );
            return Ok(());
        }

        let party = result?;
        self.ledger.set_minimum_bid(party.minimum_bid);
        self.engine.merge(Incoming::Snapshot(party));

        // Windowed rankings shift with every bid; keep them current.
        // A ranking failure keeps the previous list (retryable) rather
        // than blanking the display.
        if self.view.sort_window.is_server_ranked() {
            match self
                .api
                .get_ranked_media(&requested, self.view.sort_window)
                .await
            {
                Ok(ranked) => self.ranked = Some(ranked),
                Err(err) => {
                    warn!(error = %err, "Ranking refresh failed, keeping previous");
                }
            }
        }

        self.resync();
        Ok(())
    }

    /// Place a bid.
    ///
    /// Validated locally first (party minimum, balance hint) with no
    /// network traffic on rejection. The aggregate is never bumped
    /// locally; a confirmed bid awaits a snapshot refresh so the caller
    /// reads its own write, and the server's updated balance is
    /// surfaced.
    pub async fn place_bid(&mut self, media_id: MediaId, amount: Pence) -> Result<Pence> {
        if self.closed {
            return Err(Error::PartyEnded);
        }

        let bid_id = self.ledger.prepare(media_id.clone(), amount)?;

        let party_id = self.party_id().clone();
        match self.api.place_bid(&party_id, &media_id, amount).await {
            Ok(receipt) => {
                self.ledger.confirm(&bid_id, receipt.updated_balance)?;
                self.refresh().await?;
                self.notifications
                    .publish(&Notification::info(format!("Bid of {amount} placed")));
                Ok(receipt.updated_balance)
            }
            Err(err) => {
                self.ledger.reject(&bid_id, &err)?;
                self.notifications.publish(&Notification::error(err.to_string()));
                Err(err)
            }
        }
    }

    /// Veto an entry (host-only).
    ///
    /// Optimistic: the local transition applies first, and an illegal
    /// edge (e.g. vetoing the playing entry) is refused before any
    /// network traffic. The following snapshot refresh settles the
    /// authoritative state either way.
    pub async fn veto(&mut self, media_id: &MediaId) -> Result<()> {
        let user_id = self.user_id.clone();
        self.engine
            .apply_local(media_id, StatusAction::Veto, Some(&user_id))?;
        self.resync();

        let party_id = self.party_id().clone();
        match self.api.veto_media(&party_id, media_id).await {
            Ok(()) => self.refresh().await,
            Err(err) => {
                self.notifications.publish(&Notification::error(err.to_string()));
                // Roll the optimistic write back to server truth
                self.refresh().await?;
                Err(err)
            }
        }
    }

    /// Restore a vetoed entry (host-only); mirrors [`Self::veto`]
    pub async fn unveto(&mut self, media_id: &MediaId) -> Result<()> {
        self.engine
            .apply_local(media_id, StatusAction::Restore, None)?;
        self.resync();

        let party_id = self.party_id().clone();
        match self.api.unveto_media(&party_id, media_id).await {
            Ok(()) => self.refresh().await,
            Err(err) => {
                self.notifications.publish(&Notification::error(err.to_string()));
                self.refresh().await?;
                Err(err)
            }
        }
    }

    /// Skip to the next entry (host-only).
    ///
    /// Server-authoritative: which entry is "next" depends on ranking
    /// rules the client does not replicate, so this never guesses:
    /// it mutates, then re-runs the full load pipeline.
    pub async fn skip_next(&mut self) -> Result<()> {
        let party_id = self.party_id().clone();
        self.api.skip_next(&party_id).await?;
        self.refresh().await
    }

    /// Skip back to the previous entry (host-only); see [`Self::skip_next`]
    pub async fn skip_previous(&mut self) -> Result<()> {
        let party_id = self.party_id().clone();
        self.api.skip_previous(&party_id).await?;
        self.refresh().await
    }

    pub fn play(&mut self) -> Result<()> {
        self.coordinator.play()
    }

    pub fn pause(&mut self) -> Result<()> {
        self.coordinator.pause()
    }

    /// Mark the session unmounted; in-flight snapshot responses will be
    /// discarded when they land
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Handle one push message
    pub async fn handle_message(&mut self, message: PartyMessage) -> Result<()> {
        if message.party_id() != self.party_id() {
            debug!(
                got = %message.party_id().as_str(),
                "Push message for another party dropped"
            );
            return Ok(());
        }

        if let PartyMessage::Join { .. } = message {
            self.notifications
                .publish(&Notification::info("Someone joined the party"));
            return Ok(());
        }

        let Some(event) = message.to_queue_event(Utc::now()) else {
            return Ok(());
        };

        match self.engine.merge(Incoming::Event(event)) {
            MergeOutcome::RefreshRequired => self.refresh().await?,
            MergeOutcome::Ended => {
                self.closed = true;
                self.resync();
                self.notifications
                    .publish(&Notification::warning("The party has ended"));
            }
            MergeOutcome::Rejected => {
                // Reported, never silently swallowed; canonical state is
                // untouched and the next snapshot settles it.
                self.notifications.publish(&Notification::warning(
                    "Ignored an out-of-date queue update",
                ));
            }
            MergeOutcome::Applied => self.resync(),
            MergeOutcome::Buffered | MergeOutcome::Discarded => {}
        }

        Ok(())
    }

    /// Drive the session from the push channel until it closes or the
    /// party ends. Per-message failures are surfaced as notifications;
    /// the loop keeps consuming subsequent messages.
    pub async fn run(&mut self, channel: &mut PushChannel) {
        while !self.closed {
            let Some(message) = channel.recv().await else {
                debug!("Push channel closed, session loop ending");
                break;
            };

            if let Err(err) = self.handle_message(message).await {
                self.notifications.publish(&Notification::error(err.to_string()));
            }
        }
    }

    /// Re-derive the display list and align the playback pointer
    fn resync(&mut self) {
        let display = self.display();
        self.coordinator
            .sync_from_queue(self.engine.canonical(), &display);
    }
}
