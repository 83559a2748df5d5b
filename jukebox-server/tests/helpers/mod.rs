//! Shared fixtures for jukebox-server integration tests
//!
//! - `TestEngine`: engine wired to a `SimulatedProvider` with a known catalog
//! - `wait_for`: block until a published status report satisfies a predicate
//! - slow catalog/provider stand-ins for timeout tests

#![allow(dead_code)]

use async_trait::async_trait;
use jukebox_common::events::{EventBus, JukeboxEvent};
use jukebox_server::model::{PlaybackTarget, Track};
use jukebox_server::playback::{EngineSettings, PlaybackEngine, Selection, StatusReport};
use jukebox_server::provider::{PlaybackProvider, ProviderError, SimulatedProvider, TrackCatalog};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

pub fn track(id: &str, artist: &str, title: &str, duration_ms: u64, genre: &str) -> Track {
    Track::new(
        id,
        title,
        artist,
        duration_ms,
        genre,
        PlaybackTarget::uri(format!("sim:track:{}", id)),
    )
}

/// Catalog used by every test
pub fn test_catalog() -> Vec<Track> {
    vec![
        track("Q1", "Queen", "Bohemian Rhapsody", 354_000, "rock"),
        track("M1", "Miles Davis", "So What", 562_000, "jazz"),
        track("D1", "ABBA", "Dancing Queen", 231_000, "pop"),
        track("R1", "Rush", "Tom Sawyer", 276_000, "rock"),
        track("N1", "Nobody", "Untagged", 120_000, "Unknown"),
    ]
}

pub const QUEEN: &str = "Queen - Bohemian Rhapsody";
pub const MILES: &str = "Miles Davis - So What";
pub const ABBA: &str = "ABBA - Dancing Queen";
pub const RUSH: &str = "Rush - Tom Sawyer";

/// Seeded random selection
pub fn settings() -> EngineSettings {
    EngineSettings {
        rng_seed: Some(7),
        ..Default::default()
    }
}

/// Oldest-first selection, for tests that need a predictable order
pub fn fifo_settings() -> EngineSettings {
    EngineSettings {
        selection: Selection::Fifo,
        ..settings()
    }
}

pub struct TestEngine {
    pub engine: PlaybackEngine,
    pub provider: Arc<SimulatedProvider>,
    pub events: broadcast::Receiver<JukeboxEvent>,
}

impl TestEngine {
    pub fn start(settings: EngineSettings) -> Self {
        let provider = Arc::new(SimulatedProvider::new(test_catalog()));
        let bus = EventBus::new(256);
        let events = bus.subscribe();
        let engine = PlaybackEngine::start(provider.clone(), provider.clone(), bus, settings);
        Self {
            engine,
            provider,
            events,
        }
    }

    /// Events received so far, oldest first
    pub fn drain_events(&mut self) -> Vec<JukeboxEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }

    pub fn playing_id(&self) -> Option<String> {
        self.engine.get_status().now_playing.map(|n| n.id)
    }

    pub fn pending_ids(&self) -> Vec<String> {
        self.engine
            .list_pending()
            .into_iter()
            .map(|p| p.id)
            .collect()
    }
}

/// Wait until a published status satisfies `pred`
///
/// With paused time, a condition that never holds makes the runtime jump to
/// the safety timeout and the test fails instead of hanging.
pub async fn wait_for<F>(engine: &PlaybackEngine, pred: F) -> StatusReport
where
    F: FnMut(&StatusReport) -> bool,
{
    let mut rx = engine.watch_status();
    let report = tokio::time::timeout(Duration::from_secs(24 * 3600), rx.wait_for(pred))
        .await
        .expect("condition not reached before safety timeout")
        .expect("engine stopped while waiting");
    report.clone()
}

/// Catalog that never answers within any sane bound
pub struct SlowCatalog;

#[async_trait]
impl TrackCatalog for SlowCatalog {
    async fn resolve(&self, _query: &str) -> Result<Option<Track>, ProviderError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(None)
    }
}

/// Provider whose device check hangs
pub struct HangingProvider;

#[async_trait]
impl PlaybackProvider for HangingProvider {
    async fn device_available(&self) -> Result<bool, ProviderError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(true)
    }

    async fn start_now(&self, _track: &Track) -> Result<(), ProviderError> {
        Ok(())
    }
}
