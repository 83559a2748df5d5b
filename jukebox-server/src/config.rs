//! Configuration for jukebox-server
//!
//! # Settings Sources Priority
//!
//! 1. Command-line arguments (`--port`, `--provider`, ...)
//! 2. Environment variables (`JUKEBOX_PORT`, `JUKEBOX_ADMIN_TOKEN`, ...),
//!    read by clap alongside the matching flag
//! 3. TOML configuration file (see `jukebox_common::config`)
//! 4. Built-in defaults
//!
//! The TOML file is read once at startup. Changing it requires a restart;
//! the genre allow-list can additionally be replaced at runtime through the
//! admin API.

use crate::error::{Error, Result};
use crate::model::{PlaybackTarget, Track, MAX_TRACK_DURATION_MS, UNKNOWN_GENRE};
use crate::playback::{EngineSettings, HandoffMode, Selection};
use crate::provider::spotify::DEFAULT_API_BASE;
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

/// Which catalog/playback backend to drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Spotify Web API
    Spotify,
    /// In-memory catalog and logging device
    #[default]
    Simulated,
}

/// Server configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind the HTTP server to
    #[serde(default = "default_bind_addr")]
    pub bind_addr: IpAddr,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Value required in the `X-Admin-Token` header; empty or unset disables the check
    #[serde(default)]
    pub admin_token: Option<String>,

    #[serde(default)]
    pub provider: ProviderKind,

    /// Next-track selection (`random` or `fifo`)
    #[serde(default)]
    pub selection: Selection,

    /// `start_now` or `enqueue`
    #[serde(default)]
    pub handoff: HandoffMode,

    /// How early the completion timer fires in `enqueue` handoff mode
    #[serde(default = "default_handoff_lead_ms")]
    pub handoff_lead_ms: u64,

    /// Bound on every provider and catalog call
    #[serde(default = "default_provider_timeout_ms")]
    pub provider_timeout_ms: u64,

    /// Genre allow-list in force at startup; empty means unrestricted
    #[serde(default)]
    pub allowed_genres: Vec<String>,

    /// Broadcast buffer per event subscriber
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub spotify: SpotifyConfig,

    #[serde(default)]
    pub simulated: SimulatedConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive (trace, debug, info, warn, error); `RUST_LOG` wins
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Spotify Web API settings
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Environment variable holding the access token
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// File whose first non-blank line is the access token; takes priority over `token_env`
    #[serde(default)]
    pub token_file: Option<PathBuf>,
}

/// Simulated provider settings
#[derive(Debug, Clone, Deserialize)]
pub struct SimulatedConfig {
    /// Catalog contents; a small built-in catalog is used when empty
    #[serde(default)]
    pub tracks: Vec<SimulatedTrack>,

    /// Whether the simulated device starts out available
    #[serde(default = "default_true")]
    pub device_available: bool,
}

/// One `[[simulated.tracks]]` entry
#[derive(Debug, Clone, Deserialize)]
pub struct SimulatedTrack {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub duration_ms: u64,
    #[serde(default = "default_genre")]
    pub genre: String,
    #[serde(default)]
    pub uri: Option<String>,
}

impl SimulatedTrack {
    pub fn to_track(&self) -> Track {
        let uri = self
            .uri
            .clone()
            .unwrap_or_else(|| format!("sim:track:{}", self.id));
        Track::new(
            &self.id,
            &self.title,
            &self.artist,
            self.duration_ms,
            &self.genre,
            PlaybackTarget::uri(uri),
        )
    }
}

fn default_bind_addr() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    6666
}

fn default_handoff_lead_ms() -> u64 {
    2000
}

fn default_provider_timeout_ms() -> u64 {
    5000
}

fn default_event_capacity() -> usize {
    256
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_token_env() -> String {
    "SPOTIFY_ACCESS_TOKEN".to_string()
}

fn default_genre() -> String {
    UNKNOWN_GENRE.to_string()
}

fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
            admin_token: None,
            provider: ProviderKind::default(),
            selection: Selection::default(),
            handoff: HandoffMode::default(),
            handoff_lead_ms: default_handoff_lead_ms(),
            provider_timeout_ms: default_provider_timeout_ms(),
            allowed_genres: Vec::new(),
            event_capacity: default_event_capacity(),
            logging: LoggingConfig::default(),
            spotify: SpotifyConfig::default(),
            simulated: SimulatedConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            token_env: default_token_env(),
            token_file: None,
        }
    }
}

impl Default for SimulatedConfig {
    fn default() -> Self {
        Self {
            tracks: Vec::new(),
            device_available: true,
        }
    }
}

/// Values supplied on the command line or through `JUKEBOX_*` variables
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub bind_addr: Option<IpAddr>,
    pub port: Option<u16>,
    pub admin_token: Option<String>,
    pub provider: Option<ProviderKind>,
    pub log_level: Option<String>,
}

impl ServerConfig {
    /// Apply higher-priority values over the file/default ones
    pub fn apply_overrides(&mut self, overrides: CliOverrides) {
        if let Some(bind_addr) = overrides.bind_addr {
            self.bind_addr = bind_addr;
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(token) = overrides.admin_token {
            self.admin_token = Some(token);
        }
        if let Some(provider) = overrides.provider {
            self.provider = provider;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.provider_timeout_ms == 0 {
            return Err(Error::Config(
                "provider_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(Error::Config(
                "event_capacity must be greater than zero".to_string(),
            ));
        }
        if self.provider == ProviderKind::Spotify
            && self.spotify.token_file.is_none()
            && self.spotify.token_env.trim().is_empty()
        {
            return Err(Error::Config(
                "spotify provider needs spotify.token_env or spotify.token_file".to_string(),
            ));
        }
        for track in &self.simulated.tracks {
            if track.id.trim().is_empty()
                || track.duration_ms == 0
                || track.duration_ms > MAX_TRACK_DURATION_MS
            {
                return Err(Error::Config(format!(
                    "simulated track '{}' needs an id and a duration_ms between 1 and {}",
                    track.title, MAX_TRACK_DURATION_MS
                )));
            }
        }
        Ok(())
    }

    /// Admin token in force, treating a blank value as unset
    pub fn effective_admin_token(&self) -> Option<String> {
        self.admin_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            selection: self.selection,
            handoff: self.handoff,
            handoff_lead: Duration::from_millis(self.handoff_lead_ms),
            provider_timeout: self.provider_timeout(),
            catalog_timeout: self.provider_timeout(),
            allowed_genres: self.allowed_genres.clone(),
            rng_seed: None,
        }
    }

    /// Tracks for the simulated catalog
    pub fn simulated_tracks(&self) -> Vec<Track> {
        if self.simulated.tracks.is_empty() {
            return builtin_catalog();
        }
        self.simulated
            .tracks
            .iter()
            .map(SimulatedTrack::to_track)
            .collect()
    }
}

/// Catalog used by the simulated provider when none is configured
pub fn builtin_catalog() -> Vec<Track> {
    [
        ("Q1", "Bohemian Rhapsody", "Queen", 354_000, "rock"),
        ("Q2", "Don't Stop Me Now", "Queen", 209_000, "rock"),
        ("M1", "So What", "Miles Davis", 562_000, "jazz"),
        ("D1", "Dancing Queen", "ABBA", 231_000, "pop"),
        ("K1", "Windowlicker", "Aphex Twin", 367_000, "electronic"),
    ]
    .into_iter()
    .map(|(id, title, artist, duration_ms, genre)| {
        Track::new(
            id,
            title,
            artist,
            duration_ms,
            genre,
            PlaybackTarget::uri(format!("sim:track:{}", id)),
        )
    })
    .collect()
}
