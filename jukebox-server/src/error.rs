//! Error types for jukebox-server
//!
//! Request-level failures are `Err` values here. Queue policy rejections
//! (duplicate track, disallowed genre) and soft playback outcomes (no device,
//! provider failure while starting) are not errors: they travel back to the
//! caller as `AddOutcome` / `PlaybackOutcome` values because the queue state
//! stays consistent in every one of those cases.

use crate::provider::ProviderError;
use thiserror::Error;

/// Main error type for jukebox-server
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading or validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed query or missing required field; never retried
    #[error("Input rejected: {0}")]
    InputRejected(String),

    /// Catalog found no track matching the query
    #[error("No track found for '{0}'")]
    CatalogMiss(String),

    /// Catalog lookup itself failed (transport, credentials, timeout)
    #[error("Catalog lookup failed: {0}")]
    Catalog(#[source] ProviderError),

    /// Operation requires a playing track but the scheduler is idle
    #[error("Nothing is playing")]
    NothingPlaying,

    /// Scheduler task has shut down
    #[error("Playback engine is not running")]
    EngineStopped,

    /// Shared-library errors (config file parsing)
    #[error(transparent)]
    Common(#[from] jukebox_common::Error),
}

/// Convenience Result type using jukebox-server Error
pub type Result<T> = std::result::Result<T, Error>;
