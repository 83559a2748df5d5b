//! In-memory catalog and playback device
//!
//! Resolves queries against a fixed track list and records every playback
//! call instead of producing sound. Device availability, start failures and
//! enqueue support can be toggled at runtime.

use super::{PlaybackProvider, ProviderError, TrackCatalog};
use crate::model::{Track, QUERY_SEPARATOR};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use tracing::info;

/// A call made against the simulated device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    DeviceCheck,
    StartNow(String),
    Enqueue(String),
}

pub struct SimulatedProvider {
    tracks: Vec<Track>,
    device_available: AtomicBool,
    fail_starts: AtomicBool,
    supports_enqueue: AtomicBool,
    calls: Mutex<Vec<ProviderCall>>,
}

impl SimulatedProvider {
    pub fn new(tracks: Vec<Track>) -> Self {
        Self {
            tracks,
            device_available: AtomicBool::new(true),
            fail_starts: AtomicBool::new(false),
            supports_enqueue: AtomicBool::new(true),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn set_device_available(&self, available: bool) {
        self.device_available.store(available, Ordering::SeqCst);
    }

    /// Make every `start_now` and `enqueue_behind_current` fail
    pub fn set_fail_starts(&self, fail: bool) {
        self.fail_starts.store(fail, Ordering::SeqCst);
    }

    pub fn set_supports_enqueue(&self, supported: bool) {
        self.supports_enqueue.store(supported, Ordering::SeqCst);
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Track ids passed to `start_now`, in call order
    pub fn started(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                ProviderCall::StartNow(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    fn log(&self, call: ProviderCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }

    fn check_start(&self) -> Result<(), ProviderError> {
        if !self.device_available.load(Ordering::SeqCst) {
            return Err(ProviderError::NoDevice);
        }
        if self.fail_starts.load(Ordering::SeqCst) {
            return Err(ProviderError::Rejected {
                status: 500,
                message: "simulated start failure".to_string(),
            });
        }
        Ok(())
    }
}

/// Split `"Artist - Title"` at the first separator
fn split_query(query: &str) -> Option<(String, String)> {
    let (artist, title) = query.split_once(QUERY_SEPARATOR)?;
    Some((artist.trim().to_lowercase(), title.trim().to_lowercase()))
}

#[async_trait]
impl TrackCatalog for SimulatedProvider {
    async fn resolve(&self, query: &str) -> Result<Option<Track>, ProviderError> {
        let Some((artist, title)) = split_query(query) else {
            return Ok(None);
        };

        let exact = self.tracks.iter().find(|t| {
            t.artist_name.to_lowercase() == artist && t.title.to_lowercase() == title
        });
        let found = exact.or_else(|| {
            self.tracks.iter().find(|t| {
                t.artist_name.to_lowercase().contains(&artist)
                    && t.title.to_lowercase().contains(&title)
            })
        });
        Ok(found.cloned())
    }
}

#[async_trait]
impl PlaybackProvider for SimulatedProvider {
    async fn device_available(&self) -> Result<bool, ProviderError> {
        self.log(ProviderCall::DeviceCheck);
        Ok(self.device_available.load(Ordering::SeqCst))
    }

    async fn start_now(&self, track: &Track) -> Result<(), ProviderError> {
        self.log(ProviderCall::StartNow(track.id.clone()));
        self.check_start()?;
        info!(track = %track.display_name(), uri = %track.target.uri, "Simulated device playing");
        Ok(())
    }

    async fn enqueue_behind_current(&self, track: &Track) -> Result<(), ProviderError> {
        if !self.supports_enqueue.load(Ordering::SeqCst) {
            return Err(ProviderError::Unsupported("enqueue_behind_current"));
        }
        self.log(ProviderCall::Enqueue(track.id.clone()));
        self.check_start()?;
        info!(track = %track.display_name(), "Simulated device queued next track");
        Ok(())
    }
}
