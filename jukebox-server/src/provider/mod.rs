//! External collaborators: track catalog, playback provider, credentials
//!
//! The engine only talks to these traits. `SpotifyClient` drives the Spotify
//! Web API; `SimulatedProvider` is an in-memory stand-in for offline runs
//! and tests.

pub mod simulated;
pub mod spotify;

pub use simulated::{ProviderCall, SimulatedProvider};
pub use spotify::SpotifyClient;

use crate::model::Track;
use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

/// Failures reported by catalog and playback providers
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// No active output device to play on
    #[error("No active playback device")]
    NoDevice,

    /// Call did not complete within the configured bound
    #[error("Provider call timed out")]
    Timeout,

    /// Provider does not implement this capability
    #[error("Operation not supported by provider: {0}")]
    Unsupported(&'static str),

    /// Provider answered with a non-success status
    #[error("Provider rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Network error: {0}")]
    Transport(String),

    #[error("Unexpected provider response: {0}")]
    Decode(String),

    #[error("Credentials unavailable: {0}")]
    Credentials(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProviderError::Timeout
        } else if e.is_decode() {
            ProviderError::Decode(e.to_string())
        } else {
            ProviderError::Transport(e.to_string())
        }
    }
}

/// Resolves free-text queries to playable tracks
#[async_trait]
pub trait TrackCatalog: Send + Sync {
    /// Best match for `query`, or `None` when nothing matches
    async fn resolve(&self, query: &str) -> Result<Option<Track>, ProviderError>;
}

/// Starts tracks on an output device
#[async_trait]
pub trait PlaybackProvider: Send + Sync {
    /// Whether an output device is currently available
    async fn device_available(&self) -> Result<bool, ProviderError>;

    /// Replace whatever is playing with `track`, starting at position zero
    async fn start_now(&self, track: &Track) -> Result<(), ProviderError>;

    /// Queue `track` on the device so it starts when the current one ends
    async fn enqueue_behind_current(&self, _track: &Track) -> Result<(), ProviderError> {
        Err(ProviderError::Unsupported("enqueue_behind_current"))
    }
}

/// Supplies the bearer token for provider requests
pub trait CredentialSource: Send + Sync {
    fn access_token(&self) -> Result<String, ProviderError>;
}

/// Fixed token supplied at construction
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl CredentialSource for StaticToken {
    fn access_token(&self) -> Result<String, ProviderError> {
        if self.0.trim().is_empty() {
            return Err(ProviderError::Credentials("empty token".to_string()));
        }
        Ok(self.0.trim().to_string())
    }
}

/// Token read from an environment variable on every request
pub struct EnvToken {
    var: String,
}

impl EnvToken {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl CredentialSource for EnvToken {
    fn access_token(&self) -> Result<String, ProviderError> {
        match std::env::var(&self.var) {
            Ok(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
            _ => Err(ProviderError::Credentials(format!("{} is not set", self.var))),
        }
    }
}

/// Token read from the first non-blank line of a file on every request
///
/// Re-reading lets an external refresher rotate the token in place.
pub struct FileToken {
    path: PathBuf,
}

impl FileToken {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CredentialSource for FileToken {
    fn access_token(&self) -> Result<String, ProviderError> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            ProviderError::Credentials(format!("{}: {}", self.path.display(), e))
        })?;
        content
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                ProviderError::Credentials(format!("{} contains no token", self.path.display()))
            })
    }
}
