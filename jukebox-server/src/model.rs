//! Shared data model: tracks, queue entries and their read projections

use crate::error::{Error, Result};
use jukebox_common::human_time::format_duration_ms;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Attribution used when a submission carries no user
pub const ANONYMOUS_USER: &str = "anonymous";

/// Genre reported when the catalog has none for a track
pub const UNKNOWN_GENRE: &str = "Unknown";

/// Separator required between artist and title in a free-text query
pub const QUERY_SEPARATOR: char = '-';

/// Longest track the scheduler will arm a completion timer for
pub const MAX_TRACK_DURATION_MS: u64 = 24 * 60 * 60 * 1000;

/// Provider-specific addressing needed to start a track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackTarget {
    /// Playable URI of the track itself
    pub uri: String,
    /// Enclosing context (album/playlist) the provider should play from
    pub context_uri: Option<String>,
    /// Zero-based position of the track inside `context_uri`
    pub offset: Option<u32>,
}

impl PlaybackTarget {
    /// Target addressing the track URI alone
    pub fn uri(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            context_uri: None,
            offset: None,
        }
    }
}

/// A resolved, playable track
///
/// Obtained once from the catalog at submission time and never mutated.
/// `duration_ms` is authoritative for scheduling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Opaque catalog identifier, unique per track
    pub id: String,
    pub title: String,
    pub artist_name: String,
    pub duration_ms: u64,
    pub genre: String,
    pub target: PlaybackTarget,
}

impl Track {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        artist_name: impl Into<String>,
        duration_ms: u64,
        genre: impl Into<String>,
        target: PlaybackTarget,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist_name: artist_name.into(),
            duration_ms,
            genre: genre.into(),
            target,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    /// `"Artist - Title"` form used in logs and messages
    /// Non-zero and within `MAX_TRACK_DURATION_MS`
    pub fn has_playable_duration(&self) -> bool {
        (1..=MAX_TRACK_DURATION_MS).contains(&self.duration_ms)
    }

    pub fn display_name(&self) -> String {
        format!("{} - {}", self.artist_name, self.title)
    }
}

/// A track paired with the user who requested it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    /// Unique per accepted submission
    pub entry_id: Uuid,
    pub track: Track,
    pub submitted_by: String,
}

impl QueueEntry {
    pub fn new(track: Track, submitted_by: impl Into<String>) -> Self {
        Self {
            entry_id: Uuid::new_v4(),
            track,
            submitted_by: submitted_by.into(),
        }
    }

    /// Read-only projection for listings
    pub fn to_pending(&self) -> PendingTrack {
        PendingTrack {
            id: self.track.id.clone(),
            artist: self.track.artist_name.clone(),
            title: self.track.title.clone(),
            duration_ms: self.track.duration_ms,
            duration: format_duration_ms(self.track.duration_ms),
            submitted_by: self.submitted_by.clone(),
        }
    }
}

/// Snapshot row of the pending queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTrack {
    pub id: String,
    pub artist: String,
    pub title: String,
    pub duration_ms: u64,
    /// `M:SS` rendering of `duration_ms`
    pub duration: String,
    pub submitted_by: String,
}

/// Resolve the attribution for a submission, falling back to the anonymous sentinel
pub fn normalize_user(submitted_by: Option<&str>) -> String {
    match submitted_by.map(str::trim) {
        Some(user) if !user.is_empty() => user.to_string(),
        _ => ANONYMOUS_USER.to_string(),
    }
}

/// Validate a free-text `"Artist - Title"` query before it reaches the catalog
///
/// Returns the trimmed query.
pub fn validate_query(query: &str) -> Result<&str> {
    let query = query.trim();
    if query.is_empty() {
        return Err(Error::InputRejected("Artist and/or song needed".to_string()));
    }
    if !query.contains(QUERY_SEPARATOR) {
        return Err(Error::InputRejected("Format: Artist - Songname".to_string()));
    }
    Ok(query)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queen() -> Track {
        Track::new(
            "Q1",
            "Bohemian Rhapsody",
            "Queen",
            354_000,
            "rock",
            PlaybackTarget::uri("spotify:track:Q1"),
        )
    }

    #[test]
    fn test_normalize_user() {
        assert_eq!(normalize_user(Some("alice")), "alice");
        assert_eq!(normalize_user(Some("  bob ")), "bob");
        assert_eq!(normalize_user(Some("   ")), ANONYMOUS_USER);
        assert_eq!(normalize_user(None), ANONYMOUS_USER);
    }

    #[test]
    fn test_validate_query() {
        assert_eq!(
            validate_query("  Queen - Bohemian Rhapsody ").unwrap(),
            "Queen - Bohemian Rhapsody"
        );
        assert!(matches!(validate_query(""), Err(Error::InputRejected(_))));
        assert!(matches!(validate_query("   "), Err(Error::InputRejected(_))));
        assert!(matches!(
            validate_query("Bohemian Rhapsody"),
            Err(Error::InputRejected(_))
        ));
    }

    #[test]
    fn test_playable_duration_bounds() {
        let mut track = queen();
        assert!(track.has_playable_duration());
        track.duration_ms = 0;
        assert!(!track.has_playable_duration());
        track.duration_ms = MAX_TRACK_DURATION_MS;
        assert!(track.has_playable_duration());
        track.duration_ms = MAX_TRACK_DURATION_MS + 1;
        assert!(!track.has_playable_duration());
    }

    #[test]
    fn test_pending_projection() {
        let entry = QueueEntry::new(queen(), "freddie");
        let pending = entry.to_pending();
        assert_eq!(pending.id, "Q1");
        assert_eq!(pending.artist, "Queen");
        assert_eq!(pending.duration, "5:54");
        assert_eq!(pending.submitted_by, "freddie");
    }

    #[test]
    fn test_entries_get_distinct_ids() {
        let a = QueueEntry::new(queen(), "a");
        let b = QueueEntry::new(queen(), "a");
        assert_ne!(a.entry_id, b.entry_id);
    }

    #[test]
    fn test_track_helpers() {
        let track = queen();
        assert_eq!(track.duration(), Duration::from_millis(354_000));
        assert_eq!(track.display_name(), "Queen - Bohemian Rhapsody");
    }
}
