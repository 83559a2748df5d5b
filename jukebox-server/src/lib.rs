//! # Jukebox Server Library (jukebox-server)
//!
//! Shared multi-user playback queue. Users submit `"Artist - Title"` requests;
//! the engine resolves them through a track catalog, rejects duplicates and
//! disallowed genres, records who asked for what, and advances playback on
//! its own as each track's completion timer runs out.
//!
//! **Architecture:** one scheduler task owns all mutable queue state and is
//! driven by commands; HTTP handlers read published snapshots.

pub mod api;
pub mod config;
pub mod error;
pub mod history;
pub mod model;
pub mod playback;
pub mod policy;
pub mod provider;

pub use error::{Error, Result};
pub use playback::PlaybackEngine;
