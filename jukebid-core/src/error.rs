use thiserror::Error;

use crate::models::entry::{EntryStatus, StatusAction};
use crate::models::money::Pence;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Transient network error: {0}")]
    TransientNetwork(String),

    #[error("Illegal status transition: {action} from {from}")]
    RejectedTransition {
        from: EntryStatus,
        action: StatusAction,
    },

    #[error("Insufficient funds: balance {current_balance}, required {required_amount}")]
    InsufficientFunds {
        current_balance: Pence,
        required_amount: Pence,
    },

    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    #[error("Party has ended")]
    PartyEnded,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether the caller may retry the failed operation without any
    /// local state change having occurred.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientNetwork(_))
    }

    /// Terminal errors force the session to shut down and navigate away.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::PartyEnded)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
