//! Spotify Web API client
//!
//! Implements both `TrackCatalog` and `PlaybackProvider`. Searches take the
//! single best match; the genre is the first genre listed for the track's
//! primary artist. Playback always targets the first device Spotify lists
//! for the account.

use super::{CredentialSource, PlaybackProvider, ProviderError, TrackCatalog};
use crate::model::{PlaybackTarget, Track, UNKNOWN_GENRE};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_API_BASE: &str = "https://api.spotify.com/v1";

const USER_AGENT: &str = concat!("jukebox-server/", env!("CARGO_PKG_VERSION"));

// ========================================
// Wire types
// ========================================

#[derive(Debug, Deserialize)]
struct SearchResponse {
    tracks: Paging<SpotifyTrack>,
}

#[derive(Debug, Deserialize)]
struct Paging<T> {
    items: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
struct SpotifyTrack {
    id: Option<String>,
    name: String,
    duration_ms: u64,
    uri: String,
    track_number: Option<u32>,
    #[serde(default)]
    artists: Vec<SimpleArtist>,
    album: Option<SimpleAlbum>,
}

#[derive(Debug, Clone, Deserialize)]
struct SimpleArtist {
    id: Option<String>,
    name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct SimpleAlbum {
    uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ArtistResponse {
    #[serde(default)]
    genres: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DevicesResponse {
    #[serde(default)]
    devices: Vec<Device>,
}

#[derive(Debug, Clone, Deserialize)]
struct Device {
    id: Option<String>,
    name: String,
    #[serde(default)]
    is_restricted: bool,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

// ========================================
// Mapping
// ========================================

/// First listed genre, or the `Unknown` sentinel
fn primary_genre(genres: &[String]) -> String {
    genres
        .iter()
        .map(|g| g.trim())
        .find(|g| !g.is_empty())
        .unwrap_or(UNKNOWN_GENRE)
        .to_string()
}

/// Build a `Track` from a search hit; `None` for unplayable hits
fn to_track(hit: SpotifyTrack, genre: String) -> Option<Track> {
    let id = hit.id?;
    let artist_name = hit
        .artists
        .first()
        .map(|a| a.name.clone())
        .unwrap_or_else(|| "Unknown Artist".to_string());

    let context_uri = hit.album.and_then(|a| a.uri);
    let offset = match (&context_uri, hit.track_number) {
        (Some(_), Some(n)) if n > 0 => Some(n - 1),
        _ => None,
    };
    // Without a position the context would start at its first track
    let context_uri = offset.and(context_uri);

    Some(Track {
        id,
        title: hit.name,
        artist_name,
        duration_ms: hit.duration_ms,
        genre,
        target: PlaybackTarget {
            uri: hit.uri,
            context_uri,
            offset,
        },
    })
}

/// Request body for `PUT /me/player/play`
fn play_body(target: &PlaybackTarget) -> Value {
    match (&target.context_uri, target.offset) {
        (Some(context_uri), Some(position)) => json!({
            "context_uri": context_uri,
            "offset": { "position": position },
            "position_ms": 0,
        }),
        _ => json!({
            "uris": [target.uri],
            "position_ms": 0,
        }),
    }
}

/// First device that accepts remote commands
fn first_device(devices: &[Device]) -> Option<&Device> {
    devices.iter().find(|d| d.id.is_some() && !d.is_restricted)
}

fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| {
            if body.trim().is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string()
            } else {
                body.trim().to_string()
            }
        })
}

// ========================================
// Client
// ========================================

/// Spotify Web API client
pub struct SpotifyClient {
    http_client: reqwest::Client,
    api_base: String,
    credentials: Arc<dyn CredentialSource>,
}

impl SpotifyClient {
    pub fn new(
        api_base: impl Into<String>,
        credentials: Arc<dyn CredentialSource>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        Ok(Self {
            http_client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            credentials,
        })
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ProviderError> {
        let token = self.credentials.access_token()?;
        let url = format!("{}{}", self.api_base, path);
        Ok(self.http_client.request(method, url).bearer_auth(token))
    }

    /// Send and map non-2xx statuses to `Rejected`
    async fn send(builder: RequestBuilder) -> Result<Response, ProviderError> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ProviderError::Rejected {
            status: status.as_u16(),
            message: error_message(status, &body),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ProviderError> {
        let response = Self::send(self.request(Method::GET, path)?.query(query)).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))
    }

    async fn artist_genre(&self, artist_id: &str) -> Result<String, ProviderError> {
        let artist: ArtistResponse = self
            .get_json(&format!("/artists/{}", artist_id), &[])
            .await?;
        Ok(primary_genre(&artist.genres))
    }

    async fn devices(&self) -> Result<Vec<Device>, ProviderError> {
        let response: DevicesResponse = self.get_json("/me/player/devices", &[]).await?;
        Ok(response.devices)
    }

    async fn target_device(&self) -> Result<String, ProviderError> {
        let devices = self.devices().await?;
        let device = first_device(&devices).ok_or(ProviderError::NoDevice)?;
        debug!(device = %device.name, "Selected playback device");
        device.id.clone().ok_or(ProviderError::NoDevice)
    }
}

#[async_trait]
impl TrackCatalog for SpotifyClient {
    async fn resolve(&self, query: &str) -> Result<Option<Track>, ProviderError> {
        debug!(query = %query, "Searching Spotify");
        let search: SearchResponse = self
            .get_json(
                "/search",
                &[("q", query), ("type", "track"), ("limit", "1")],
            )
            .await?;

        let Some(hit) = search.tracks.items.into_iter().next() else {
            return Ok(None);
        };

        let genre = match hit.artists.first().and_then(|a| a.id.as_deref()) {
            Some(artist_id) => self.artist_genre(artist_id).await?,
            None => UNKNOWN_GENRE.to_string(),
        };

        let track = to_track(hit, genre);
        if let Some(track) = &track {
            info!(
                track_id = %track.id,
                track = %track.display_name(),
                genre = %track.genre,
                "Resolved track from Spotify"
            );
        }
        Ok(track)
    }
}

#[async_trait]
impl PlaybackProvider for SpotifyClient {
    async fn device_available(&self) -> Result<bool, ProviderError> {
        let devices = self.devices().await?;
        Ok(first_device(&devices).is_some())
    }

    async fn start_now(&self, track: &Track) -> Result<(), ProviderError> {
        let device_id = self.target_device().await?;
        let builder = self
            .request(Method::PUT, "/me/player/play")?
            .query(&[("device_id", device_id.as_str())])
            .json(&play_body(&track.target));

        match Self::send(builder).await {
            Ok(_) => Ok(()),
            Err(ProviderError::Rejected { status: 404, .. }) => Err(ProviderError::NoDevice),
            Err(e) => Err(e),
        }
    }

    async fn enqueue_behind_current(&self, track: &Track) -> Result<(), ProviderError> {
        let device_id = self.target_device().await?;
        let builder = self.request(Method::POST, "/me/player/queue")?.query(&[
            ("uri", track.target.uri.as_str()),
            ("device_id", device_id.as_str()),
        ]);

        match Self::send(builder).await {
            Ok(_) => Ok(()),
            Err(ProviderError::Rejected { status: 404, .. }) => Err(ProviderError::NoDevice),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::StaticToken;

    fn search_hit() -> SpotifyTrack {
        serde_json::from_value(json!({
            "id": "Q1",
            "name": "Bohemian Rhapsody",
            "duration_ms": 354000,
            "uri": "spotify:track:Q1",
            "track_number": 11,
            "artists": [{ "id": "queen", "name": "Queen" }],
            "album": { "uri": "spotify:album:night" }
        }))
        .unwrap()
    }

    #[test]
    fn test_primary_genre() {
        assert_eq!(primary_genre(&[]), UNKNOWN_GENRE);
        assert_eq!(primary_genre(&["".to_string(), "rock".to_string()]), "rock");
        assert_eq!(
            primary_genre(&["glam rock".to_string(), "rock".to_string()]),
            "glam rock"
        );
    }

    #[test]
    fn test_to_track_with_album_context() {
        let track = to_track(search_hit(), "rock".to_string()).unwrap();
        assert_eq!(track.id, "Q1");
        assert_eq!(track.artist_name, "Queen");
        assert_eq!(track.duration_ms, 354_000);
        assert_eq!(track.target.context_uri.as_deref(), Some("spotify:album:night"));
        assert_eq!(track.target.offset, Some(10));
    }

    #[test]
    fn test_to_track_without_context() {
        let mut hit = search_hit();
        hit.album = None;
        let track = to_track(hit, "rock".to_string()).unwrap();
        assert_eq!(track.target.context_uri, None);
        assert_eq!(track.target.offset, None);

        let mut local = search_hit();
        local.id = None;
        assert!(to_track(local, "rock".to_string()).is_none());
    }

    #[test]
    fn test_play_body_shapes() {
        let with_context = PlaybackTarget {
            uri: "spotify:track:Q1".to_string(),
            context_uri: Some("spotify:album:night".to_string()),
            offset: Some(10),
        };
        assert_eq!(
            play_body(&with_context),
            json!({
                "context_uri": "spotify:album:night",
                "offset": { "position": 10 },
                "position_ms": 0
            })
        );

        let bare = PlaybackTarget::uri("spotify:track:Q1");
        assert_eq!(
            play_body(&bare),
            json!({ "uris": ["spotify:track:Q1"], "position_ms": 0 })
        );
    }

    #[test]
    fn test_first_device_skips_restricted() {
        let devices: DevicesResponse = serde_json::from_value(json!({
            "devices": [
                { "id": "d1", "name": "Locked", "is_restricted": true },
                { "id": null, "name": "Ghost" },
                { "id": "d3", "name": "Bar Speakers" }
            ]
        }))
        .unwrap();
        assert_eq!(first_device(&devices.devices).unwrap().name, "Bar Speakers");
        assert!(first_device(&[]).is_none());
    }

    #[test]
    fn test_error_message_extraction() {
        let body = r#"{"error":{"status":404,"message":"Player command failed: No active device found"}}"#;
        assert_eq!(
            error_message(StatusCode::NOT_FOUND, body),
            "Player command failed: No active device found"
        );
        assert_eq!(error_message(StatusCode::BAD_GATEWAY, ""), "Bad Gateway");
        assert_eq!(error_message(StatusCode::BAD_REQUEST, "oops"), "oops");
    }

    #[test]
    fn test_client_creation_trims_base() {
        let client = SpotifyClient::new(
            "http://localhost:9/v1/",
            Arc::new(StaticToken::new("t")),
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(client.api_base, "http://localhost:9/v1");
    }
}
