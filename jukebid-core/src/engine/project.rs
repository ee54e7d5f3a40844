//! Display-queue projection
//!
//! Derives the displayed sequence from the canonical queue plus transient
//! view state. Pipeline: status selection, optional replacement by a
//! server-provided time-windowed ranking, then the search filter. The
//! projector never re-sorts; ranking order is the server's responsibility.

use crate::models::{EntryStatus, QueueEntry, QueueView, ViewState};

use super::reconcile::CanonicalQueue;

/// Parsed search input: free-text terms and `#`-prefixed tag terms
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchTerms {
    text: Vec<String>,
    tags: Vec<String>,
}

impl SearchTerms {
    /// Split raw input terms into text and tag terms.
    ///
    /// Tag terms are collapsed the same way entry tags are normalized, so
    /// `#Chill-Vibes` and `#chillvibes` query the same tag.
    #[must_use]
    pub fn parse(raw: &[String]) -> Self {
        let mut text = Vec::new();
        let mut tags = Vec::new();

        for term in raw {
            let term = term.trim();
            if term.is_empty() {
                continue;
            }
            if let Some(tag) = term.strip_prefix('#') {
                let collapsed = collapse_tag(tag);
                if !collapsed.is_empty() {
                    tags.push(collapsed);
                }
            } else {
                text.push(term.to_lowercase());
            }
        }

        Self { text, tags }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.tags.is_empty()
    }

    /// An entry matches when at least one text term hits its
    /// title/artist/category (vacuously true with no text terms) AND at
    /// least one tag term hits its normalized tag set (vacuously true
    /// with no tag terms).
    #[must_use]
    pub fn matches(&self, entry: &QueueEntry) -> bool {
        self.matches_text(entry) && self.matches_tags(entry)
    }

    fn matches_text(&self, entry: &QueueEntry) -> bool {
        if self.text.is_empty() {
            return true;
        }

        let title = entry.media.title.to_lowercase();
        let category = entry.media.category.as_deref().map(str::to_lowercase);

        self.text.iter().any(|term| {
            title.contains(term)
                || entry
                    .media
                    .artists
                    .iter()
                    .any(|artist| artist.to_lowercase().contains(term))
                || category.as_deref().is_some_and(|c| c.contains(term))
        })
    }

    fn matches_tags(&self, entry: &QueueEntry) -> bool {
        if self.tags.is_empty() {
            return true;
        }

        let tokens: Vec<String> = entry
            .media
            .tags
            .iter()
            .flat_map(|tag| normalize_tag(tag))
            .collect();

        self.tags.iter().any(|term| tokens.iter().any(|t| t == term))
    }
}

/// Normalize one tag into its matchable token set: lowercase, split on
/// whitespace/hyphen/underscore/dot, strip remaining non-word characters,
/// plus the fully collapsed form. Matching is exact per token: `chill`
/// matches `Chill-Vibes` but not `chilling`.
#[must_use]
pub fn normalize_tag(tag: &str) -> Vec<String> {
    let lowered = tag.to_lowercase();
    let mut tokens: Vec<String> = lowered
        .split(|c: char| c.is_whitespace() || matches!(c, '-' | '_' | '.'))
        .map(strip_non_word)
        .filter(|t| !t.is_empty())
        .collect();

    if tokens.len() > 1 {
        tokens.push(tokens.concat());
    }

    tokens
}

/// Collapse a tag or tag term into its single comparable form
fn collapse_tag(tag: &str) -> String {
    strip_non_word(
        &tag.to_lowercase()
            .replace(|c: char| c.is_whitespace() || matches!(c, '-' | '_' | '.'), ""),
    )
}

fn strip_non_word(s: &str) -> String {
    s.chars().filter(|c| c.is_alphanumeric()).collect()
}

/// Project the canonical queue into a display list.
///
/// `ranked` is the server-provided windowed ranking; it replaces the
/// candidate set on the active view whenever the window is not all-time
/// (window-scoped aggregates cannot be recomputed from local caches).
/// The vetoed view always projects canonical vetoed entries.
#[must_use]
pub fn project(
    canonical: &CanonicalQueue,
    view_state: &ViewState,
    queue_view: QueueView,
    ranked: Option<&[QueueEntry]>,
) -> Vec<QueueEntry> {
    let candidates: Vec<QueueEntry> = match queue_view {
        QueueView::Active => {
            if view_state.sort_window.is_server_ranked() {
                ranked.map(<[QueueEntry]>::to_vec).unwrap_or_default()
            } else {
                canonical.with_status(EntryStatus::Queued).cloned().collect()
            }
        }
        QueueView::Vetoed => canonical.with_status(EntryStatus::Vetoed).cloned().collect(),
    };

    let terms = SearchTerms::parse(&view_state.search_terms);
    if terms.is_empty() {
        return candidates;
    }

    candidates
        .into_iter()
        .filter(|entry| terms.matches(entry))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        MediaId, MediaItem, Party, PartyId, PartyType, Pence, SortWindow, UserId,
    };

    fn media(id: &str, title: &str, category: Option<&str>, tags: &[&str]) -> MediaItem {
        MediaItem {
            id: MediaId::from_string(id.to_string()),
            title: title.to_string(),
            artists: vec!["The Openers".to_string()],
            category: category.map(str::to_string),
            tags: tags.iter().map(|t| (*t).to_string()).collect(),
            duration_secs: 180,
            cover_url: None,
            source_urls: vec![],
        }
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

    fn entry(id: &str, title: &str, tags: &[&str]) -> QueueEntry {
        QueueEntry::new(media(id, title, Some("rock"), tags))
    }

    #[test]
    fn test_all_time_empty_search_is_canonical_queued_order() {
        let mut played = entry("mediaaaaaaa2", "B", &[]);
        played.status = EntryStatus::Played;

        let canonical = canonical_with(vec![
            entry("mediaaaaaaa1", "A", &[]),
            played,
            entry("mediaaaaaaa3", "C", &[]),
        ]);

        let display = project(&canonical, &ViewState::new(), QueueView::Active, None);
        let ids: Vec<&str> = display.iter().map(|e| e.media.id.as_str()).collect();
        assert_eq!(ids, vec!["mediaaaaaaa1", "mediaaaaaaa3"]);
    }

    #[test]
    fn test_vetoed_view_selects_vetoed_entries() {
        let mut vetoed = entry("mediaaaaaaa2", "B", &[]);
        vetoed.status = EntryStatus::Vetoed;

        let canonical = canonical_with(vec![entry("mediaaaaaaa1", "A", &[]), vetoed]);

        let display = project(&canonical, &ViewState::new(), QueueView::Vetoed, None);
        assert_eq!(display.len(), 1);
        assert_eq!(display[0].media.id.as_str(), "mediaaaaaaa2");
    }

    #[test]
    fn test_windowed_view_uses_server_ranking_verbatim() {
        let canonical = canonical_with(vec![
            entry("mediaaaaaaa1", "A", &[]),
            entry("mediaaaaaaa2", "B", &[]),
        ]);

        // Server ranking disagrees with canonical order; it wins.
        let ranked = vec![entry("mediaaaaaaa2", "B", &[]), entry("mediaaaaaaa1", "A", &[])];

        let view = ViewState {
            sort_window: SortWindow::Week,
            search_terms: vec![],
        };
        let display = project(&canonical, &view, QueueView::Active, Some(&ranked));
        let ids: Vec<&str> = display.iter().map(|e| e.media.id.as_str()).collect();
        assert_eq!(ids, vec!["mediaaaaaaa2", "mediaaaaaaa1"]);
    }

    #[test]
    fn test_search_matches_title_and_tag() {
        let canonical = canonical_with(vec![
            entry("mediaaaaaaa1", "Rock Anthem", &["Chill-Vibes"]),
            entry("mediaaaaaaa2", "Rock Ballad", &["chilling"]),
        ]);

        let view = ViewState {
            sort_window: SortWindow::AllTime,
            search_terms: vec!["rock".to_string(), "#chill".to_string()],
        };

        let display = project(&canonical, &view, QueueView::Active, None);
        assert_eq!(display.len(), 1);
        assert_eq!(display[0].media.title, "Rock Anthem");
    }

    #[test]
    fn test_collapsed_tag_term_matches_hyphenated_tag() {
        let canonical = canonical_with(vec![entry("mediaaaaaaa1", "A", &["Chill-Vibes"])]);

        let view = ViewState {
            sort_window: SortWindow::AllTime,
            search_terms: vec!["#ChillVibes".to_string()],
        };
        assert_eq!(project(&canonical, &view, QueueView::Active, None).len(), 1);
    }

    #[test]
    fn test_text_terms_are_any_of() {
        let canonical = canonical_with(vec![
            entry("mediaaaaaaa1", "Quiet Storm", &[]),
            entry("mediaaaaaaa2", "Loud Song", &[]),
        ]);

        let view = ViewState {
            sort_window: SortWindow::AllTime,
            search_terms: vec!["quiet".to_string(), "loud".to_string()],
        };
        assert_eq!(project(&canonical, &view, QueueView::Active, None).len(), 2);
    }

    #[test]
    fn test_category_and_artist_match() {
        let canonical = canonical_with(vec![entry("mediaaaaaaa1", "Untitled", &[])]);

        for term in ["rock", "openers"] {
            let view = ViewState {
                sort_window: SortWindow::AllTime,
                search_terms: vec![term.to_string()],
            };
            assert_eq!(
                project(&canonical, &view, QueueView::Active, None).len(),
                1,
                "term {term} should match"
            );
        }
    }

    #[test]
    fn test_normalize_tag_tokens() {
        assert_eq!(normalize_tag("Chill-Vibes"), vec!["chill", "vibes", "chillvibes"]);
        assert_eq!(normalize_tag("chilling"), vec!["chilling"]);
        assert_eq!(normalize_tag("lo_fi.beats"), vec!["lo", "fi", "beats", "lofibeats"]);
        assert_eq!(normalize_tag("r&b"), vec!["rb"]);
        assert!(normalize_tag("---").is_empty());
    }

    #[test]
    fn test_projection_never_resorts() {
        // Candidates keep canonical insertion order even when titles
        // would sort differently.
        let canonical = canonical_with(vec![
            entry("mediaaaaaaa1", "Zebra", &[]),
            entry("mediaaaaaaa2", "Alpha", &[]),
        ]);

        let display = project(&canonical, &ViewState::new(), QueueView::Active, None);
        let titles: Vec<&str> = display.iter().map(|e| e.media.title.as_str()).collect();
        assert_eq!(titles, vec!["Zebra", "Alpha"]);
    }
}
