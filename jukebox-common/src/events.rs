//! Event types for the jukebox event system
//!
//! Provides the shared event definitions and the `EventBus` used to fan
//! engine activity out to SSE clients and log consumers.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Why a track was handed to the playback provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum StartTrigger {
    /// First accepted track while nothing was playing
    Submission,
    /// Completion timer of the previous track fired
    Completion,
    /// Administrative skip of the previous track
    Skip,
    /// Administrative re-arm after a deferred or failed start
    Resume,
}

impl std::fmt::Display for StartTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StartTrigger::Submission => write!(f, "Submission"),
            StartTrigger::Completion => write!(f, "Completion"),
            StartTrigger::Skip => write!(f, "Skip"),
            StartTrigger::Resume => write!(f, "Resume"),
        }
    }
}

/// Jukebox event types
///
/// Events are broadcast via `EventBus` and serialized for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum JukeboxEvent {
    /// A submission was accepted into the pending queue
    TrackAdded {
        /// Queue entry UUID (unique per accepted submission)
        entry_id: Uuid,
        /// Catalog track identifier
        track_id: String,
        title: String,
        artist: String,
        submitted_by: String,
        /// Pending queue length after insertion
        pending: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A submission was refused by queue policy (duplicate or genre)
    TrackRejected {
        track_id: String,
        submitted_by: String,
        /// Human-readable rejection reason
        reason: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A track was handed to the provider and its completion timer armed
    TrackStarted {
        entry_id: Uuid,
        track_id: String,
        title: String,
        artist: String,
        submitted_by: String,
        /// Completion timer duration
        duration_ms: u64,
        trigger: StartTrigger,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The playing track finished or was skipped
    TrackCompleted {
        entry_id: Uuid,
        track_id: String,
        /// false when the completion timer fired, true for a skip
        skipped: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Nothing left to play; scheduler is idle
    PlaybackIdle {
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A start was attempted but no output device was available
    PlaybackDeferred {
        /// Tracks still waiting
        pending: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The provider failed to start a track
    PlaybackFailed {
        track_id: String,
        reason: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The genre allow-list was replaced
    GenrePolicyChanged {
        /// Sorted allow-list; empty means unrestricted
        allowed_genres: Vec<String>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl JukeboxEvent {
    /// Get event type as string for filtering and SSE event names
    pub fn event_type(&self) -> &'static str {
        match self {
            JukeboxEvent::TrackAdded { .. } => "TrackAdded",
            JukeboxEvent::TrackRejected { .. } => "TrackRejected",
            JukeboxEvent::TrackStarted { .. } => "TrackStarted",
            JukeboxEvent::TrackCompleted { .. } => "TrackCompleted",
            JukeboxEvent::PlaybackIdle { .. } => "PlaybackIdle",
            JukeboxEvent::PlaybackDeferred { .. } => "PlaybackDeferred",
            JukeboxEvent::PlaybackFailed { .. } => "PlaybackFailed",
            JukeboxEvent::GenrePolicyChanged { .. } => "GenrePolicyChanged",
        }
    }
}

/// Central event distribution bus
///
/// Uses `tokio::broadcast` internally:
/// - Non-blocking publish (slow subscribers don't block the scheduler)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use jukebox_common::events::{EventBus, JukeboxEvent};
///
/// let bus = EventBus::new(100);
/// let mut rx = bus.subscribe();
///
/// bus.emit_lossy(JukeboxEvent::PlaybackIdle { timestamp: chrono::Utc::now() });
/// assert_eq!(rx.try_recv().unwrap().event_type(), "PlaybackIdle");
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<JukeboxEvent>,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<JukeboxEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: JukeboxEvent) {
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started_event() -> JukeboxEvent {
        JukeboxEvent::TrackStarted {
            entry_id: Uuid::new_v4(),
            track_id: "Q1".to_string(),
            title: "Bohemian Rhapsody".to_string(),
            artist: "Queen".to_string(),
            submitted_by: "freddie".to_string(),
            duration_ms: 354_000,
            trigger: StartTrigger::Submission,
            timestamp: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_eventbus_emit_without_subscribers_is_silent() {
        let bus = EventBus::new(10);
        bus.emit_lossy(started_event());

        let mut late = bus.subscribe();
        assert!(late.try_recv().is_err());
    }

    #[test]
    fn test_eventbus_multiple_subscribers() {
        let bus = EventBus::new(10);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.emit_lossy(started_event());

        assert_eq!(rx1.try_recv().unwrap().event_type(), "TrackStarted");
        assert_eq!(rx2.try_recv().unwrap().event_type(), "TrackStarted");
    }

    #[test]
    fn test_eventbus_slow_subscriber_lags() {
        let bus = EventBus::new(2);
        let mut rx = bus.subscribe();

        for _ in 0..10 {
            bus.emit_lossy(JukeboxEvent::PlaybackIdle {
                timestamp: chrono::Utc::now(),
            });
        }

        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Lagged(8))
        ));
        assert_eq!(rx.try_recv().unwrap().event_type(), "PlaybackIdle");
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let json = serde_json::to_value(started_event()).unwrap();
        assert_eq!(json["type"], "TrackStarted");
        assert_eq!(json["trigger"], "Submission");
        assert_eq!(json["duration_ms"], 354_000);
    }

    #[test]
    fn test_start_trigger_display() {
        assert_eq!(StartTrigger::Completion.to_string(), "Completion");
        assert_eq!(StartTrigger::Resume.to_string(), "Resume");
    }
}
