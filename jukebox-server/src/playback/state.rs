//! Playback state owned by the scheduler, and the read-side status report

use crate::history::HistoryRecord;
use crate::model::{PendingTrack, QueueEntry};
use chrono::{DateTime, Utc};
use jukebox_common::events::StartTrigger;
use jukebox_common::human_time::format_duration_ms;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

/// The entry currently handed to the provider
#[derive(Debug, Clone)]
pub struct NowPlaying {
    pub entry: QueueEntry,
    pub started_at: DateTime<Utc>,
    /// Monotonic start point; later than now while a handed-off track waits
    /// for the device to finish the previous one
    pub starts_at: Instant,
    /// Duration the completion timer was armed with
    pub timer_duration: Duration,
    pub trigger: StartTrigger,
    /// Handoff was not possible; the timer now covers only the remainder of
    /// the track and its firing starts the next one directly
    pub in_tail: bool,
}

impl NowPlaying {
    /// The device has not switched to this entry yet
    pub fn start_pending(&self) -> bool {
        Instant::now() < self.starts_at
    }

    pub fn to_info(&self) -> NowPlayingInfo {
        let track = &self.entry.track;
        NowPlayingInfo {
            entry_id: self.entry.entry_id,
            id: track.id.clone(),
            artist: track.artist_name.clone(),
            title: track.title.clone(),
            genre: track.genre.clone(),
            duration_ms: track.duration_ms,
            duration: format_duration_ms(track.duration_ms),
            submitted_by: self.entry.submitted_by.clone(),
            started_at: self.started_at,
            timer_ms: self.timer_duration.as_millis() as u64,
            elapsed_ms: 0,
        }
    }
}

/// Scheduler state: Idle when `now_playing` is `None`, Playing otherwise
#[derive(Debug, Default)]
pub struct PlaybackState {
    pub now_playing: Option<NowPlaying>,
}

impl PlaybackState {
    /// Derived from `now_playing`, so an active state always owns an entry
    pub fn is_active(&self) -> bool {
        self.now_playing.is_some()
    }

    pub fn is_playing_track(&self, track_id: &str) -> bool {
        self.now_playing
            .as_ref()
            .is_some_and(|n| n.entry.track.id == track_id)
    }

    /// Leave the Playing state, handing back the finished entry
    pub fn finish(&mut self) -> Option<NowPlaying> {
        self.now_playing.take()
    }
}

/// Serializable view of the playing track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NowPlayingInfo {
    pub entry_id: Uuid,
    pub id: String,
    pub artist: String,
    pub title: String,
    pub genre: String,
    pub duration_ms: u64,
    pub duration: String,
    pub submitted_by: String,
    pub started_at: DateTime<Utc>,
    /// Completion timer duration
    pub timer_ms: u64,
    /// Time since `started_at`, filled in when read
    pub elapsed_ms: u64,
}

impl NowPlayingInfo {
    pub fn with_elapsed(mut self, now: DateTime<Utc>) -> Self {
        self.elapsed_ms = (now - self.started_at)
            .num_milliseconds()
            .clamp(0, i64::try_from(self.duration_ms).unwrap_or(i64::MAX)) as u64;
        self
    }
}

/// Engine snapshot published after every command
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub pending: Vec<PendingTrack>,
    pub history: BTreeMap<String, HistoryRecord>,
    pub allowed_genres: Vec<String>,
    pub now_playing: Option<NowPlayingInfo>,
    pub is_active: bool,
}
