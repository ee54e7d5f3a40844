//! Transient per-client view state
//!
//! Never shared between clients and never persisted.

use serde::{Deserialize, Serialize};

/// Time window for the bid ranking
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortWindow {
    #[default]
    AllTime,
    Day,
    Week,
    Month,
}

impl SortWindow {
    /// Wire value for the ranked-media query parameter
    #[must_use]
    pub const fn as_query_param(&self) -> &'static str {
        match self {
            Self::AllTime => "all_time",
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
        }
    }

    /// Windowed rankings come from the server; only the all-time view can
    /// be derived from the canonical queue.
    #[must_use]
    pub const fn is_server_ranked(&self) -> bool {
        !matches!(self, Self::AllTime)
    }
}

/// Which status slice of the queue a view displays
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueView {
    #[default]
    Active,
    Vetoed,
}

/// Per-client projection inputs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    pub sort_window: SortWindow,
    /// Raw search input terms; terms prefixed with `#` match tags, the
    /// rest match title/artist/category
    pub search_terms: Vec<String>,
}

impl ViewState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}
