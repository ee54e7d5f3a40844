//! Bid submission ledger
//!
//! Append-only record of locally issued bids and their server outcomes.
//! The ledger never touches entry aggregates: ranking depends on
//! cross-party server aggregation, so a confirmed bid surfaces through
//! the next snapshot, not through a local guess.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::models::{BidId, MediaId, Pence};
use crate::{Error, Result};

/// Outcome of one bid submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionState {
    /// Sent (or about to be sent) to the server
    Pending,
    /// Accepted; carries the wallet balance the server returned
    Confirmed { updated_balance: Pence },
    /// Refused by the server; prior state untouched, retryable
    Rejected { reason: String },
}

/// One locally issued bid
#[derive(Debug, Clone)]
pub struct BidSubmission {
    pub id: BidId,
    pub media_id: MediaId,
    pub amount: Pence,
    pub state: SubmissionState,
    pub created_at: DateTime<Utc>,
}

/// Records bid submissions and their confirmations/rejections
#[derive(Debug)]
pub struct BidLedger {
    minimum_bid: Pence,
    /// Last balance reported by the server; a client-side hint only,
    /// re-checked authoritatively on every submission
    balance: Option<Pence>,
    submissions: Vec<BidSubmission>,
}

impl BidLedger {
    #[must_use]
    pub const fn new(minimum_bid: Pence) -> Self {
        Self {
            minimum_bid,
            balance: None,
            submissions: Vec::new(),
        }
    }

    #[must_use]
    pub const fn minimum_bid(&self) -> Pence {
        self.minimum_bid
    }

    /// Refresh the party minimum (snapshots may change it)
    pub fn set_minimum_bid(&mut self, minimum_bid: Pence) {
        self.minimum_bid = minimum_bid;
    }

    /// Last known wallet balance, if the server has reported one
    #[must_use]
    pub const fn balance(&self) -> Option<Pence> {
        self.balance
    }

    pub fn set_balance(&mut self, balance: Pence) {
        self.balance = Some(balance);
    }

    /// Validate a bid locally and record it as pending.
    ///
    /// Fails fast with no network traffic when the amount is below the
    /// party minimum, or when the known balance already cannot cover it
    /// (the server re-checks authoritatively either way).
    pub fn prepare(&mut self, media_id: MediaId, amount: Pence) -> Result<BidId> {
        if amount < self.minimum_bid {
            return Err(Error::InvalidInput(format!(
                "Bid {amount} is below the party minimum of {}",
                self.minimum_bid
            )));
        }

        if let Some(balance) = self.balance {
            if amount > balance {
                return Err(Error::InsufficientFunds {
                    current_balance: balance,
                    required_amount: amount,
                });
            }
        }

        let id = BidId::new();
        self.submissions.push(BidSubmission {
            id: id.clone(),
            media_id: media_id.clone(),
            amount,
            state: SubmissionState::Pending,
            created_at: Utc::now(),
        });

        debug!(
            bid_id = %id.as_str(),
            media_id = %media_id.as_str(),
            amount = %amount,
            "Bid prepared"
        );

        Ok(id)
    }

    /// Record a server confirmation and the balance it returned
    pub fn confirm(&mut self, bid_id: &BidId, updated_balance: Pence) -> Result<()> {
        let submission = self.pending_mut(bid_id)?;
        submission.state = SubmissionState::Confirmed { updated_balance };

        info!(
            bid_id = %bid_id.as_str(),
            updated_balance = %updated_balance,
            "Bid confirmed"
        );

        self.balance = Some(updated_balance);
        Ok(())
    }

    /// Record a server rejection; prior state stays untouched.
    ///
    /// An authoritative InsufficientFunds also corrects the local
    /// balance hint so the next fast check uses the real number.
    pub fn reject(&mut self, bid_id: &BidId, error: &Error) -> Result<()> {
        if let Error::InsufficientFunds {
            current_balance, ..
        } = error
        {
            self.balance = Some(*current_balance);
        }

        let submission = self.pending_mut(bid_id)?;
        submission.state = SubmissionState::Rejected {
            reason: error.to_string(),
        };

        debug!(bid_id = %bid_id.as_str(), error = %error, "Bid rejected");
        Ok(())
    }

    /// All submissions, oldest first (append-only)
    #[must_use]
    pub fn submissions(&self) -> &[BidSubmission] {
        &self.submissions
    }

    fn pending_mut(&mut self, bid_id: &BidId) -> Result<&mut BidSubmission> {
        let submission = self
            .submissions
            .iter_mut()
            .find(|s| s.id == *bid_id)
            .ok_or_else(|| Error::NotFound(format!("No bid submission {bid_id}")))?;

        if submission.state != SubmissionState::Pending {
            return Err(Error::InvalidInput(format!(
                "Bid {bid_id} already resolved"
            )));
        }

        Ok(submission)
    }
}
