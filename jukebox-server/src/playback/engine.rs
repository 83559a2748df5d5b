//! Playback engine facade
//!
//! `PlaybackEngine` is the cloneable handle the web layer talks to. Writes go
//! to the scheduler task as commands; reads come from the latest published
//! `StatusReport` and never wait on the scheduler.

use super::queue_manager::{Rejection, Selection};
use super::scheduler::{Command, Scheduler};
use super::state::{NowPlayingInfo, StatusReport};
use crate::error::{Error, Result};
use crate::model::{normalize_user, validate_query, PendingTrack, QueueEntry};
use crate::provider::{PlaybackProvider, ProviderError, TrackCatalog};
use jukebox_common::events::{EventBus, JukeboxEvent};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::{debug, info, warn};

/// Command channel depth
const COMMAND_BUFFER: usize = 64;

/// How the next track reaches the device when the current one ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandoffMode {
    /// Start the next track when the completion timer fires
    #[default]
    StartNow,
    /// Queue the next track on the device shortly before the current one ends
    Enqueue,
}

/// Engine tuning, resolved from configuration
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub selection: Selection,
    pub handoff: HandoffMode,
    /// How early the timer fires in `Enqueue` mode
    pub handoff_lead: Duration,
    /// Bound on each playback provider call
    pub provider_timeout: Duration,
    /// Bound on each catalog lookup
    pub catalog_timeout: Duration,
    /// Allow-list in force at startup
    pub allowed_genres: Vec<String>,
    /// Fixed seed for random selection; entropy when `None`
    pub rng_seed: Option<u64>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            selection: Selection::Random,
            handoff: HandoffMode::StartNow,
            handoff_lead: Duration::ZERO,
            provider_timeout: Duration::from_millis(5000),
            catalog_timeout: Duration::from_millis(5000),
            allowed_genres: Vec::new(),
            rng_seed: None,
        }
    }
}

impl EngineSettings {
    /// Timer lead actually applied for a track of length `duration`
    pub fn lead_for(&self, duration: Duration) -> Duration {
        match self.handoff {
            HandoffMode::StartNow => Duration::ZERO,
            HandoffMode::Enqueue => self.handoff_lead.min(duration),
        }
    }
}

/// What happened to playback as a result of a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// A track was handed to the provider and its timer armed
    Started,
    /// Something is already playing; the track waits in the queue
    AlreadyPlaying,
    /// Nothing left to play
    Idle,
    /// No output device; the track stays queued
    Deferred,
    /// Provider failed to start the track; it was put back in the queue
    Failed(String),
}

impl PlaybackOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackOutcome::Started => "started",
            PlaybackOutcome::AlreadyPlaying => "queued",
            PlaybackOutcome::Idle => "idle",
            PlaybackOutcome::Deferred => "deferred",
            PlaybackOutcome::Failed(_) => "failed",
        }
    }

    pub fn message(&self) -> String {
        match self {
            PlaybackOutcome::Started => "Playback started".to_string(),
            PlaybackOutcome::AlreadyPlaying => "Added to playlist".to_string(),
            PlaybackOutcome::Idle => "Nothing to play".to_string(),
            PlaybackOutcome::Deferred => {
                "No active playback device; remember to open the player".to_string()
            }
            PlaybackOutcome::Failed(reason) => format!("Playback failed to start: {}", reason),
        }
    }
}

/// Result of a submission that reached the queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    Accepted {
        entry: QueueEntry,
        playback: PlaybackOutcome,
        /// Track the submission started, which need not be `entry` when
        /// earlier submissions were left pending
        now_playing: Option<NowPlayingInfo>,
    },
    Rejected(Rejection),
}

/// Cloneable handle to the running engine
#[derive(Clone)]
pub struct PlaybackEngine {
    tx: mpsc::Sender<Command>,
    status: watch::Receiver<StatusReport>,
    catalog: Arc<dyn TrackCatalog>,
    events: EventBus,
    catalog_timeout: Duration,
}

impl PlaybackEngine {
    /// Spawn the scheduler task and return a handle to it
    ///
    /// Must be called inside a Tokio runtime.
    pub fn start(
        catalog: Arc<dyn TrackCatalog>,
        provider: Arc<dyn PlaybackProvider>,
        events: EventBus,
        settings: EngineSettings,
    ) -> Self {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let catalog_timeout = settings.catalog_timeout;
        let (scheduler, status) = Scheduler::new(rx, tx.downgrade(), provider, events.clone(), settings);

        tokio::spawn(scheduler.run());

        Self {
            tx,
            status,
            catalog,
            events,
            catalog_timeout,
        }
    }

    // ========================================
    // Public query interface
    // ========================================

    /// Resolve `query` and submit the result to the queue
    ///
    /// Input and catalog problems are `Err`; queue-policy refusals come back
    /// as `AddOutcome::Rejected`.
    pub async fn add_track(&self, query: &str, submitted_by: Option<&str>) -> Result<AddOutcome> {
        let query = validate_query(query)?;
        let submitted_by = normalize_user(submitted_by);

        let track = match tokio::time::timeout(self.catalog_timeout, self.catalog.resolve(query)).await {
            Err(_) => {
                warn!(query = %query, "Catalog lookup timed out");
                return Err(Error::Catalog(ProviderError::Timeout));
            }
            Ok(Err(e)) => {
                warn!(query = %query, error = %e, "Catalog lookup failed");
                return Err(Error::Catalog(e));
            }
            Ok(Ok(None)) => {
                debug!(query = %query, "No catalog match");
                return Err(Error::CatalogMiss(query.to_string()));
            }
            Ok(Ok(Some(track))) if !track.has_playable_duration() => {
                warn!(track_id = %track.id, duration_ms = track.duration_ms, "Catalog returned a track without a usable duration");
                return Err(Error::CatalogMiss(query.to_string()));
            }
            Ok(Ok(Some(track))) => track,
        };

        self.request(|reply| Command::Add {
            track,
            submitted_by,
            reply,
        })
        .await
    }

    /// Pending tracks in insertion order
    pub fn list_pending(&self) -> Vec<PendingTrack> {
        self.status.borrow().pending.clone()
    }

    pub fn now_playing(&self) -> Option<NowPlayingInfo> {
        let now_playing = self.status.borrow().now_playing.clone();
        now_playing.map(|info| info.with_elapsed(chrono::Utc::now()))
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<JukeboxEvent> {
        self.events.subscribe()
    }

    // ========================================
    // Administrative interface
    // ========================================

    pub fn get_status(&self) -> StatusReport {
        let mut report = self.status.borrow().clone();
        report.now_playing = report
            .now_playing
            .map(|info| info.with_elapsed(chrono::Utc::now()));
        report
    }

    /// Replace the genre allow-list; returns the list now in force
    pub async fn set_allowed_genres(&self, genres: Vec<String>) -> Result<Vec<String>> {
        self.request(|reply| Command::SetAllowedGenres { genres, reply })
            .await
    }

    /// Cut the playing track short and move on
    pub async fn skip(&self) -> Result<PlaybackOutcome> {
        self.request(|reply| Command::Skip { reply }).await?
    }

    /// Try to start playback after a deferred or failed start
    pub async fn resume(&self) -> Result<PlaybackOutcome> {
        self.request(|reply| Command::Resume { reply }).await
    }

    /// Receiver that observes every published status report
    pub fn watch_status(&self) -> watch::Receiver<StatusReport> {
        self.status.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Stop the scheduler and disarm its timer
    pub async fn shutdown(&self) -> Result<()> {
        self.request(|reply| Command::Shutdown { reply }).await?;
        info!("Playback engine shut down");
        Ok(())
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(make(reply_tx))
            .await
            .map_err(|_| Error::EngineStopped)?;
        reply_rx.await.map_err(|_| Error::EngineStopped)
    }
}
