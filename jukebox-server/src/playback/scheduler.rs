//! Playback scheduler
//!
//! A single task owns the queue, the history ledger, the genre policy and the
//! playback state. Every mutation arrives as a [`Command`], so submissions,
//! timer expiry and administrative actions are strictly serialized. After each
//! command the scheduler publishes a fresh `StatusReport` before replying.
//!
//! States are Idle (nothing playing) and Playing (one entry owned, completion
//! timer armed). A track only reaches `start_now` from Idle, or during a
//! completion/skip transition of the track the scheduler owns.

use super::engine::{AddOutcome, EngineSettings, HandoffMode, PlaybackOutcome};
use super::queue_manager::{QueueManager, Rejection};
use super::state::{NowPlaying, PlaybackState, StatusReport};
use super::timer::CompletionTimer;
use crate::error::{Error, Result};
use crate::history::HistoryLedger;
use crate::model::{QueueEntry, Track};
use crate::policy::GenrePolicy;
use crate::provider::{PlaybackProvider, ProviderError};
use chrono::Utc;
use jukebox_common::events::{EventBus, JukeboxEvent, StartTrigger};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Messages accepted by the scheduler task
pub enum Command {
    Add {
        track: Track,
        submitted_by: String,
        reply: oneshot::Sender<AddOutcome>,
    },
    SetAllowedGenres {
        genres: Vec<String>,
        reply: oneshot::Sender<Vec<String>>,
    },
    Skip {
        reply: oneshot::Sender<Result<PlaybackOutcome>>,
    },
    Resume {
        reply: oneshot::Sender<PlaybackOutcome>,
    },
    /// Posted by the completion timer
    TrackFinished { generation: u64 },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Run a provider call under the configured bound
async fn bounded<T>(
    limit: Duration,
    operation: &'static str,
    call: impl Future<Output = std::result::Result<T, ProviderError>>,
) -> std::result::Result<T, ProviderError> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            warn!(operation, timeout_ms = limit.as_millis() as u64, "Provider call timed out");
            Err(ProviderError::Timeout)
        }
    }
}

pub struct Scheduler {
    queue: QueueManager,
    history: HistoryLedger,
    policy: GenrePolicy,
    state: PlaybackState,
    timer: CompletionTimer,
    provider: Arc<dyn PlaybackProvider>,
    events: EventBus,
    settings: EngineSettings,
    rng: StdRng,
    rx: mpsc::Receiver<Command>,
    status_tx: watch::Sender<StatusReport>,
}

impl Scheduler {
    pub fn new(
        rx: mpsc::Receiver<Command>,
        timer_tx: mpsc::WeakSender<Command>,
        provider: Arc<dyn PlaybackProvider>,
        events: EventBus,
        settings: EngineSettings,
    ) -> (Self, watch::Receiver<StatusReport>) {
        let policy = GenrePolicy::with_allowed(&settings.allowed_genres);
        let rng = match settings.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let (status_tx, status_rx) = watch::channel(StatusReport {
            allowed_genres: policy.allowed(),
            ..Default::default()
        });

        let scheduler = Self {
            queue: QueueManager::new(),
            history: HistoryLedger::new(),
            policy,
            state: PlaybackState::default(),
            timer: CompletionTimer::new(timer_tx),
            provider,
            events,
            settings,
            rng,
            rx,
            status_tx,
        };
        (scheduler, status_rx)
    }

    /// Process commands until shutdown or until every engine handle is gone
    pub async fn run(mut self) {
        info!(
            selection = ?self.settings.selection,
            handoff = ?self.settings.handoff,
            "Playback scheduler started"
        );

        while let Some(command) = self.rx.recv().await {
            match command {
                Command::Add {
                    track,
                    submitted_by,
                    reply,
                } => {
                    let outcome = self.handle_add(track, submitted_by).await;
                    self.publish();
                    let _ = reply.send(outcome);
                }
                Command::SetAllowedGenres { genres, reply } => {
                    let allowed = self.handle_set_genres(genres);
                    self.publish();
                    let _ = reply.send(allowed);
                }
                Command::Skip { reply } => {
                    let outcome = self.handle_skip().await;
                    self.publish();
                    let _ = reply.send(outcome);
                }
                Command::Resume { reply } => {
                    let outcome = self.handle_resume().await;
                    self.publish();
                    let _ = reply.send(outcome);
                }
                Command::TrackFinished { generation } => {
                    self.handle_timer(generation).await;
                    self.publish();
                }
                Command::Shutdown { reply } => {
                    self.timer.disarm();
                    self.publish();
                    let _ = reply.send(());
                    break;
                }
            }
        }

        self.timer.disarm();
        info!("Playback scheduler stopped");
    }

    // ========================================
    // Command handlers
    // ========================================

    async fn handle_add(&mut self, track: Track, submitted_by: String) -> AddOutcome {
        let track_id = track.id.clone();

        let accepted = if self.state.is_playing_track(&track_id) {
            Err(Rejection::DuplicateTrack(track_id.clone()))
        } else {
            self.queue
                .try_add(track, submitted_by.clone(), &self.policy)
                .map(QueueEntry::clone)
        };

        let entry = match accepted {
            Ok(entry) => entry,
            Err(rejection) => {
                info!(track_id = %track_id, user = %submitted_by, reason = %rejection, "Submission rejected");
                self.events.emit_lossy(JukeboxEvent::TrackRejected {
                    track_id,
                    submitted_by,
                    reason: rejection.to_string(),
                    timestamp: Utc::now(),
                });
                return AddOutcome::Rejected(rejection);
            }
        };

        self.history
            .record(&entry.track.id, &entry.submitted_by, &entry.track.genre);

        info!(
            track_id = %entry.track.id,
            track = %entry.track.display_name(),
            user = %entry.submitted_by,
            pending = self.queue.len(),
            "Track added to queue"
        );
        self.events.emit_lossy(JukeboxEvent::TrackAdded {
            entry_id: entry.entry_id,
            track_id: entry.track.id.clone(),
            title: entry.track.title.clone(),
            artist: entry.track.artist_name.clone(),
            submitted_by: entry.submitted_by.clone(),
            pending: self.queue.len(),
            timestamp: Utc::now(),
        });

        let playback = if self.state.is_active() {
            PlaybackOutcome::AlreadyPlaying
        } else {
            self.start_next(StartTrigger::Submission).await
        };

        let now_playing = match playback {
            PlaybackOutcome::Started => self.state.now_playing.as_ref().map(NowPlaying::to_info),
            _ => None,
        };
        AddOutcome::Accepted {
            entry,
            playback,
            now_playing,
        }
    }

    fn handle_set_genres(&mut self, genres: Vec<String>) -> Vec<String> {
        self.policy.set_allowed(&genres);
        let allowed = self.policy.allowed();
        info!(allowed = ?allowed, "Genre allow-list replaced");
        self.events.emit_lossy(JukeboxEvent::GenrePolicyChanged {
            allowed_genres: allowed.clone(),
            timestamp: Utc::now(),
        });
        allowed
    }

    async fn handle_skip(&mut self) -> Result<PlaybackOutcome> {
        let Some(now) = self.state.now_playing.as_ref() else {
            return Err(Error::NothingPlaying);
        };
        // The handed-off entry is already queued on the device behind the
        // previous track
        if now.start_pending() {
            info!(track_id = %now.entry.track.id, "Skip ignored, next track already handed off");
            return Ok(PlaybackOutcome::AlreadyPlaying);
        }
        self.timer.disarm();
        Ok(self.advance(true, StartTrigger::Skip).await)
    }

    async fn handle_resume(&mut self) -> PlaybackOutcome {
        if self.state.is_active() {
            debug!("Resume requested while playing");
            return PlaybackOutcome::AlreadyPlaying;
        }
        let outcome = self.start_next(StartTrigger::Resume).await;
        if outcome == PlaybackOutcome::Idle {
            self.emit_idle();
        }
        outcome
    }

    async fn handle_timer(&mut self, generation: u64) {
        if !self.timer.is_current(generation) {
            debug!(generation, "Ignoring superseded completion timer");
            return;
        }
        self.timer.fired();

        let Some(in_tail) = self.state.now_playing.as_ref().map(|now| now.in_tail) else {
            warn!(generation, "Completion timer fired while idle");
            return;
        };

        if self.settings.handoff == HandoffMode::Enqueue && !in_tail {
            self.hand_off().await;
        } else {
            self.advance(false, StartTrigger::Completion).await;
        }
    }

    // ========================================
    // Transitions
    // ========================================

    /// Finish the playing entry and start whatever comes next
    async fn advance(&mut self, skipped: bool, trigger: StartTrigger) -> PlaybackOutcome {
        let Some(finished) = self.state.finish() else {
            unreachable!("advance called while idle");
        };
        self.emit_completed(&finished, skipped);

        let outcome = self.start_next(trigger).await;
        if outcome == PlaybackOutcome::Idle {
            self.emit_idle();
        }
        outcome
    }

    /// Pick a pending entry and start it from Idle
    ///
    /// On a deferred or failed start the entry goes back to its queue
    /// position and the state stays Idle.
    async fn start_next(&mut self, trigger: StartTrigger) -> PlaybackOutcome {
        debug_assert!(!self.state.is_active(), "start_next while a track is playing");

        if self.queue.is_empty() {
            return PlaybackOutcome::Idle;
        }
        if !self.device_available().await {
            return self.defer();
        }

        let Some((index, entry)) = self.queue.pop_next(self.settings.selection, &mut self.rng)
        else {
            unreachable!("queue checked non-empty");
        };

        let provider = Arc::clone(&self.provider);
        let result = bounded(
            self.settings.provider_timeout,
            "start_now",
            provider.start_now(&entry.track),
        )
        .await;

        match result {
            Ok(()) => {
                self.begin_playing(entry, trigger, Duration::ZERO);
                PlaybackOutcome::Started
            }
            Err(ProviderError::NoDevice) => {
                self.queue.restore(index, entry);
                self.defer()
            }
            Err(e) => {
                error!(track_id = %entry.track.id, error = %e, "Provider failed to start track");
                self.events.emit_lossy(JukeboxEvent::PlaybackFailed {
                    track_id: entry.track.id.clone(),
                    reason: e.to_string(),
                    timestamp: Utc::now(),
                });
                self.queue.restore(index, entry);
                PlaybackOutcome::Failed(e.to_string())
            }
        }
    }

    /// Queue the next entry on the device ahead of the current track's end
    ///
    /// Falls back to a direct start at the real end of the track when there
    /// is nothing to hand off or the provider cannot queue.
    async fn hand_off(&mut self) {
        let Some((index, entry)) = self.queue.pop_next(self.settings.selection, &mut self.rng)
        else {
            debug!("Nothing pending at handoff point");
            self.enter_tail();
            return;
        };

        let provider = Arc::clone(&self.provider);
        let result = bounded(
            self.settings.provider_timeout,
            "enqueue_behind_current",
            provider.enqueue_behind_current(&entry.track),
        )
        .await;

        match result {
            Ok(()) => {
                let Some(finished) = self.state.finish() else {
                    unreachable!("handoff while idle");
                };
                // The device switches over once the lead has run out
                let remaining = self.settings.lead_for(finished.entry.track.duration());
                self.emit_completed(&finished, false);
                self.begin_playing(entry, StartTrigger::Completion, remaining);
            }
            Err(e) => {
                match &e {
                    ProviderError::Unsupported(_) => {
                        debug!("Provider cannot queue tracks, falling back to direct start")
                    }
                    _ => warn!(track_id = %entry.track.id, error = %e, "Handoff failed, falling back to direct start"),
                }
                self.queue.restore(index, entry);
                self.enter_tail();
            }
        }
    }

    /// Arm the timer for the remainder of the playing track
    fn enter_tail(&mut self) {
        let Some(now) = self.state.now_playing.as_mut() else {
            unreachable!("tail of an idle state");
        };
        let lead = self.settings.lead_for(now.entry.track.duration());
        now.in_tail = true;
        now.timer_duration = lead;
        self.timer.arm(lead);
    }

    /// Enter Playing with `entry`, which starts `delay` from now
    fn begin_playing(&mut self, entry: QueueEntry, trigger: StartTrigger, delay: Duration) {
        let duration = entry.track.duration();
        let timer_duration = delay + duration - self.settings.lead_for(duration);
        let generation = self.timer.arm(timer_duration);

        let started_at = Utc::now()
            + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::zero());

        info!(
            track_id = %entry.track.id,
            track = %entry.track.display_name(),
            user = %entry.submitted_by,
            trigger = %trigger,
            timer_ms = timer_duration.as_millis() as u64,
            generation,
            "Track started"
        );
        self.events.emit_lossy(JukeboxEvent::TrackStarted {
            entry_id: entry.entry_id,
            track_id: entry.track.id.clone(),
            title: entry.track.title.clone(),
            artist: entry.track.artist_name.clone(),
            submitted_by: entry.submitted_by.clone(),
            duration_ms: entry.track.duration_ms,
            trigger,
            timestamp: Utc::now(),
        });

        self.state.now_playing = Some(NowPlaying {
            entry,
            started_at,
            starts_at: Instant::now() + delay,
            timer_duration,
            trigger,
            in_tail: false,
        });
    }

    fn defer(&mut self) -> PlaybackOutcome {
        warn!(pending = self.queue.len(), "No playback device available, playback deferred");
        self.events.emit_lossy(JukeboxEvent::PlaybackDeferred {
            pending: self.queue.len(),
            timestamp: Utc::now(),
        });
        PlaybackOutcome::Deferred
    }

    async fn device_available(&mut self) -> bool {
        let provider = Arc::clone(&self.provider);
        match bounded(
            self.settings.provider_timeout,
            "device_available",
            provider.device_available(),
        )
        .await
        {
            Ok(available) => available,
            Err(e) => {
                warn!(error = %e, "Device check failed");
                false
            }
        }
    }

    // ========================================
    // Events and snapshots
    // ========================================

    fn emit_completed(&self, finished: &NowPlaying, skipped: bool) {
        info!(
            track_id = %finished.entry.track.id,
            skipped,
            "Track finished"
        );
        self.events.emit_lossy(JukeboxEvent::TrackCompleted {
            entry_id: finished.entry.entry_id,
            track_id: finished.entry.track.id.clone(),
            skipped,
            timestamp: Utc::now(),
        });
    }

    fn emit_idle(&self) {
        info!("Queue exhausted, playback idle");
        self.events.emit_lossy(JukeboxEvent::PlaybackIdle {
            timestamp: Utc::now(),
        });
    }

    fn publish(&self) {
        self.status_tx.send_replace(StatusReport {
            pending: self.queue.snapshot(),
            history: self.history.snapshot(),
            allowed_genres: self.policy.allowed(),
            now_playing: self.state.now_playing.as_ref().map(NowPlaying::to_info),
            is_active: self.state.is_active(),
        });
    }
}
