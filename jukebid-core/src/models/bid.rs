//! Bid record
//!
//! Bids are append-only: a bid is never mutated or deleted, and an entry's
//! aggregate value is always the sum of its bids.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{BidId, MediaId, UserId};
use super::money::Pence;

/// A single confirmed bid against one queue entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bid {
    pub id: BidId,
    pub media_id: MediaId,
    pub user_id: UserId,
    pub amount: Pence,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bid_serialization_round_trip() {
        let bid = Bid {
            id: BidId::from_string("bid123456789".to_string()),
            media_id: MediaId::from_string("media1234567".to_string()),
            user_id: UserId::from_string("user12345678".to_string()),
            amount: Pence(50),
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&bid).unwrap();
        let back: Bid = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, bid.id);
        assert_eq!(back.amount, Pence(50));
    }
}
