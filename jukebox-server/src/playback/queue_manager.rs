//! Queue Manager
//!
//! Holds the pending tracks in insertion order and enforces the two
//! insertion rules: no duplicate track ids, and genre allow-list membership.
//! Selection of the next track to play removes the entry from the queue; the
//! scheduler owns it from then on.

use crate::model::{PendingTrack, QueueEntry, Track};
use crate::policy::GenrePolicy;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a submission was refused by queue policy
///
/// Rejections leave the queue and the history ledger untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// A track with the same id is already pending or playing
    #[error("Track already in queue: {0}")]
    DuplicateTrack(String),

    /// Resolved genre is not on the allow-list
    #[error("Genre not allowed: {0}")]
    GenreNotAllowed(String),
}

/// Next-track selection policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Selection {
    /// Uniform random over all pending entries
    #[default]
    Random,
    /// Oldest submission first
    Fifo,
}

/// Pending tracks in insertion order
#[derive(Debug, Default)]
pub struct QueueManager {
    entries: Vec<QueueEntry>,
}

impl QueueManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a track if it passes the duplicate and genre checks
    ///
    /// Duplicate detection takes priority over the genre check. On success the
    /// new entry is appended and a reference to it returned.
    pub fn try_add(
        &mut self,
        track: Track,
        submitted_by: impl Into<String>,
        policy: &GenrePolicy,
    ) -> Result<&QueueEntry, Rejection> {
        if self.contains(&track.id) {
            return Err(Rejection::DuplicateTrack(track.id));
        }
        if !policy.is_allowed(&track.genre) {
            return Err(Rejection::GenreNotAllowed(track.genre));
        }

        self.entries.push(QueueEntry::new(track, submitted_by));
        let last = self.entries.len() - 1;
        Ok(&self.entries[last])
    }

    /// Remove one entry chosen uniformly at random
    ///
    /// Returns the entry with the index it occupied, so a failed start can put
    /// it back with [`restore`](Self::restore).
    pub fn pop_random_pending<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
    ) -> Option<(usize, QueueEntry)> {
        if self.entries.is_empty() {
            return None;
        }
        let index = rng.gen_range(0..self.entries.len());
        Some((index, self.entries.remove(index)))
    }

    /// Remove the oldest pending entry
    pub fn pop_oldest_pending(&mut self) -> Option<(usize, QueueEntry)> {
        if self.entries.is_empty() {
            return None;
        }
        Some((0, self.entries.remove(0)))
    }

    /// Remove the next entry according to `selection`
    pub fn pop_next<R: Rng + ?Sized>(
        &mut self,
        selection: Selection,
        rng: &mut R,
    ) -> Option<(usize, QueueEntry)> {
        match selection {
            Selection::Random => self.pop_random_pending(rng),
            Selection::Fifo => self.pop_oldest_pending(),
        }
    }

    /// Put a previously popped entry back at its former position
    ///
    /// Indices past the end append.
    pub fn restore(&mut self, index: usize, entry: QueueEntry) {
        debug_assert!(
            !self.contains(&entry.track.id),
            "restoring an entry whose track is already pending"
        );
        let index = index.min(self.entries.len());
        self.entries.insert(index, entry);
    }

    /// Read-only projection in insertion order
    pub fn snapshot(&self) -> Vec<PendingTrack> {
        self.entries.iter().map(QueueEntry::to_pending).collect()
    }

    pub fn contains(&self, track_id: &str) -> bool {
        self.entries.iter().any(|e| e.track.id == track_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PlaybackTarget;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn create_test_track(id: &str, genre: &str) -> Track {
        Track::new(
            id,
            format!("Title {}", id),
            format!("Artist {}", id),
            180_000,
            genre,
            PlaybackTarget::uri(format!("spotify:track:{}", id)),
        )
    }

    fn ids(qm: &QueueManager) -> Vec<String> {
        qm.snapshot().into_iter().map(|p| p.id).collect()
    }

    #[test]
    fn test_queue_manager_creation() {
        let qm = QueueManager::new();
        assert!(qm.is_empty());
        assert_eq!(qm.len(), 0);
        assert!(qm.snapshot().is_empty());
    }

    #[test]
    fn test_try_add_appends_in_order() {
        let mut qm = QueueManager::new();
        let policy = GenrePolicy::new();

        let entry = qm.try_add(create_test_track("A", "rock"), "u1", &policy).unwrap();
        assert_eq!(entry.track.id, "A");
        assert_eq!(entry.submitted_by, "u1");
        qm.try_add(create_test_track("B", "pop"), "u2", &policy).unwrap();
        qm.try_add(create_test_track("C", "jazz"), "u3", &policy).unwrap();

        assert_eq!(ids(&qm), vec!["A", "B", "C"]);
        assert!(qm.contains("B"));
        assert!(!qm.contains("D"));
    }

    #[test]
    fn test_duplicate_rejected_queue_unchanged() {
        let mut qm = QueueManager::new();
        let policy = GenrePolicy::new();
        qm.try_add(create_test_track("A", "rock"), "u1", &policy).unwrap();

        let result = qm.try_add(create_test_track("A", "rock"), "u2", &policy);
        assert_eq!(result.unwrap_err(), Rejection::DuplicateTrack("A".to_string()));
        assert_eq!(qm.len(), 1);
        assert_eq!(qm.snapshot()[0].submitted_by, "u1");
    }

    #[test]
    fn test_genre_not_allowed() {
        let mut qm = QueueManager::new();
        let policy = GenrePolicy::with_allowed(["rock"]);

        let result = qm.try_add(create_test_track("J", "jazz"), "u1", &policy);
        assert_eq!(result.unwrap_err(), Rejection::GenreNotAllowed("jazz".to_string()));
        assert!(qm.is_empty());

        let open = GenrePolicy::new();
        assert!(qm.try_add(create_test_track("J", "jazz"), "u1", &open).is_ok());
    }

    #[test]
    fn test_duplicate_takes_priority_over_genre() {
        let mut qm = QueueManager::new();
        qm.try_add(create_test_track("J", "jazz"), "u1", &GenrePolicy::new())
            .unwrap();

        let strict = GenrePolicy::with_allowed(["rock"]);
        let result = qm.try_add(create_test_track("J", "jazz"), "u2", &strict);
        assert_eq!(result.unwrap_err(), Rejection::DuplicateTrack("J".to_string()));
    }

    #[test]
    fn test_pop_random_from_empty() {
        let mut qm = QueueManager::new();
        let mut rng = StdRng::seed_from_u64(7);
        assert!(qm.pop_random_pending(&mut rng).is_none());
        assert!(qm.pop_oldest_pending().is_none());
    }

    #[test]
    fn test_pop_random_removes_member() {
        let mut qm = QueueManager::new();
        let policy = GenrePolicy::new();
        for id in ["A", "B", "C", "D"] {
            qm.try_add(create_test_track(id, "rock"), "u", &policy).unwrap();
        }

        let mut rng = StdRng::seed_from_u64(42);
        let mut seen = HashSet::new();
        while let Some((index, entry)) = qm.pop_random_pending(&mut rng) {
            assert!(index <= qm.len());
            assert!(!qm.contains(&entry.track.id));
            assert!(seen.insert(entry.track.id));
        }
        assert_eq!(seen.len(), 4);
        assert!(qm.is_empty());
    }

    #[test]
    fn test_pop_random_reaches_every_position() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut picked = HashSet::new();
        for _ in 0..200 {
            let mut qm = QueueManager::new();
            for id in ["A", "B", "C"] {
                qm.try_add(create_test_track(id, "rock"), "u", &GenrePolicy::new())
                    .unwrap();
            }
            let (_, entry) = qm.pop_random_pending(&mut rng).unwrap();
            picked.insert(entry.track.id);
        }
        assert_eq!(picked.len(), 3);
    }

    #[test]
    fn test_pop_oldest_is_fifo() {
        let mut qm = QueueManager::new();
        let policy = GenrePolicy::new();
        for id in ["A", "B", "C"] {
            qm.try_add(create_test_track(id, "rock"), "u", &policy).unwrap();
        }
        let mut rng = StdRng::seed_from_u64(0);

        let (index, entry) = qm.pop_next(Selection::Fifo, &mut rng).unwrap();
        assert_eq!(index, 0);
        assert_eq!(entry.track.id, "A");
        assert_eq!(ids(&qm), vec!["B", "C"]);
    }

    #[test]
    fn test_restore_returns_entry_to_position() {
        let mut qm = QueueManager::new();
        let policy = GenrePolicy::new();
        for id in ["A", "B", "C"] {
            qm.try_add(create_test_track(id, "rock"), "u", &policy).unwrap();
        }

        let mut rng = StdRng::seed_from_u64(3);
        let (index, entry) = qm.pop_random_pending(&mut rng).unwrap();
        let track_id = entry.track.id.clone();
        qm.restore(index, entry);

        assert_eq!(ids(&qm), vec!["A", "B", "C"]);
        assert_eq!(qm.snapshot()[index].id, track_id);
    }

    #[test]
    fn test_restore_past_end_appends() {
        let mut qm = QueueManager::new();
        let policy = GenrePolicy::new();
        qm.try_add(create_test_track("A", "rock"), "u", &policy).unwrap();

        qm.restore(10, QueueEntry::new(create_test_track("Z", "rock"), "u"));
        assert_eq!(ids(&qm), vec!["A", "Z"]);
    }

    #[test]
    fn test_selection_deserializes_lowercase() {
        #[derive(Deserialize)]
        struct Wrapper {
            selection: Selection,
        }
        let w: Wrapper = toml::from_str("selection = \"fifo\"").unwrap();
        assert_eq!(w.selection, Selection::Fifo);
        assert_eq!(Selection::default(), Selection::Random);
    }
}
