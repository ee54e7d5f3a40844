//! Media catalog record
//!
//! Immutable from the engine's point of view: the queue references catalog
//! records, it never edits them.

use serde::{Deserialize, Serialize};

use super::id::MediaId;

/// Catalog media item (track)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: MediaId,
    pub title: String,
    pub artists: Vec<String>,
    /// Catalog category, e.g. "rock", "electronic"
    pub category: Option<String>,
    /// Free-form tags attached by the catalog, matched after normalization
    #[serde(default)]
    pub tags: Vec<String>,
    /// Duration in whole seconds
    pub duration_secs: u32,
    pub cover_url: Option<String>,
    /// Playable source URLs in preference order
    #[serde(default)]
    pub source_urls: Vec<String>,
}

impl MediaItem {
    /// Primary display artist (first credited)
    #[must_use]
    pub fn primary_artist(&self) -> Option<&str> {
        self.artists.first().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_artist() {
        let item = MediaItem {
            id: MediaId::new(),
            title: "Rock Anthem".to_string(),
            artists: vec!["The Openers".to_string(), "Guest".to_string()],
            category: Some("rock".to_string()),
            tags: vec![],
            duration_secs: 215,
            cover_url: None,
            source_urls: vec![],
        };
        assert_eq!(item.primary_artist(), Some("The Openers"));
    }
}
