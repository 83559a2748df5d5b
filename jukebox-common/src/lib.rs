//! # Jukebox Common Library
//!
//! Shared code for the jukebox workspace:
//! - Event types (`JukeboxEvent`) and the `EventBus`
//! - Configuration file discovery and TOML loading
//! - Common error type
//! - Human-readable duration formatting

pub mod config;
pub mod error;
pub mod events;
pub mod human_time;

pub use error::{Error, Result};
