//! Spotify Web API client used to turn Spotify links into title/artist pairs.
//! Handles authentication (client credentials flow), link parsing, and paged
//! playlist/album listings. Audio is never fetched from Spotify.

use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use regex::Regex;
use reqwest::header;
use serde::Deserialize;
use std::future::Future;
use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::commands::music::utils::music_manager::MusicError;

use super::Track;

/// Result type specific to Spotify API operations.
pub type SpotifyResult<T> = Result<T, MusicError>;

const ACCOUNTS_URL: &str = "https://accounts.spotify.com";
const API_URL: &str = "https://api.spotify.com/v1";

/// Tokens are treated as expired this long before Spotify says they are.
const EXPIRY_MARGIN: Duration = Duration::from_secs(30);

/// Regex to match open.spotify.com links, including localized `intl-xx` paths.
static SPOTIFY_URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:https?://)?open\.spotify\.com/(?:intl-[a-zA-Z-]+/)?(track|playlist|album)/([a-zA-Z0-9]+)/?(?:\?.*)?$",
    )
    .unwrap()
});

/// Regex to match `spotify:<kind>:<id>` URIs.
static SPOTIFY_URI_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^spotify:(track|playlist|album):([a-zA-Z0-9]+)$").unwrap()
});

/// A recognised Spotify link together with its object ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpotifyLink {
    Track(String),
    Playlist(String),
    Album(String),
}

impl SpotifyLink {
    /// Parses either an `open.spotify.com` URL or a `spotify:` URI.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        let captures = SPOTIFY_URL_REGEX
            .captures(input)
            .or_else(|| SPOTIFY_URI_REGEX.captures(input))?;

        let id = captures.get(2)?.as_str().to_string();
        match captures.get(1)?.as_str() {
            "track" => Some(Self::Track(id)),
            "playlist" => Some(Self::Playlist(id)),
            "album" => Some(Self::Album(id)),
            _ => None,
        }
    }
}

/// Basic track information retrieved from Spotify.
#[derive(Clone, Debug, PartialEq)]
pub struct SpotifyTrack {
    pub id: String,
    pub name: String,
    pub artists: Vec<String>,
    pub duration_ms: u64,
    pub album_image: Option<String>,
}

impl SpotifyTrack {
    /// Converts into the shared track model. The uri points back at Spotify; it
    /// is only used as a label, never streamed.
    pub fn into_track(self, requested_by: &str) -> Track {
        let duration = (self.duration_ms > 0).then(|| Duration::from_millis(self.duration_ms));
        Track {
            title: self.name,
            author: self.artists.join(", "),
            uri: format!("https://open.spotify.com/track/{}", self.id),
            duration,
            artwork_url: self.album_image,
            requested_by: Some(requested_by.to_string()),
        }
    }
}

/// Source of "now" for token expiry checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// The real monotonic clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[derive(Debug)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// Process-scoped access token holder with an expiry-checked accessor.
pub struct TokenCache {
    clock: Arc<dyn Clock>,
    slot: Mutex<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            slot: Mutex::new(None),
        }
    }

    /// Returns the cached token while it is still valid, otherwise runs
    /// `refresh` (which yields the token and its lifetime) and caches the result.
    /// The lock is held across the refresh so concurrent callers share one request.
    pub async fn get_or_refresh<F, Fut>(&self, refresh: F) -> SpotifyResult<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = SpotifyResult<(String, Duration)>>,
    {
        let mut slot = self.slot.lock().await;

        if let Some(token) = slot.as_ref() {
            if self.clock.now() < token.expires_at {
                return Ok(token.access_token.clone());
            }
            debug!("Cached Spotify token expired, refreshing");
        }

        let (access_token, lifetime) = refresh().await?;
        *slot = Some(CachedToken {
            access_token: access_token.clone(),
            expires_at: self.clock.now() + lifetime.saturating_sub(EXPIRY_MARGIN),
        });

        Ok(access_token)
    }

    pub async fn clear(&self) {
        *self.slot.lock().await = None;
    }
}

/// Client ID and secret for the client credentials flow.
#[derive(Clone)]
pub struct SpotifyCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for SpotifyCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpotifyCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Response from Spotify's token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

/// Spotify Web API client.
pub struct SpotifyApi {
    http: reqwest::Client,
    credentials: Option<SpotifyCredentials>,
    tokens: TokenCache,
    accounts_url: String,
    api_url: String,
}

impl SpotifyApi {
    pub fn new(http: reqwest::Client, credentials: Option<SpotifyCredentials>) -> Self {
        Self::with_endpoints(
            http,
            credentials,
            Arc::new(SystemClock),
            ACCOUNTS_URL.to_string(),
            API_URL.to_string(),
        )
    }

    /// Builds a client against custom endpoints and clock.
    pub fn with_endpoints(
        http: reqwest::Client,
        credentials: Option<SpotifyCredentials>,
        clock: Arc<dyn Clock>,
        accounts_url: String,
        api_url: String,
    ) -> Self {
        Self {
            http,
            credentials,
            tokens: TokenCache::new(clock),
            accounts_url,
            api_url,
        }
    }

    /// Retrieves a valid access token, requesting a new one when the cached
    /// token is missing or about to expire.
    async fn access_token(&self) -> SpotifyResult<String> {
        let credentials = self.credentials.as_ref().ok_or_else(|| {
            MusicError::ConfigError(
                "SPOTIFY_CLIENT_ID and SPOTIFY_CLIENT_SECRET are not set".to_string(),
            )
        })?;

        self.tokens
            .get_or_refresh(|| self.request_token(credentials))
            .await
    }

    async fn request_token(
        &self,
        credentials: &SpotifyCredentials,
    ) -> SpotifyResult<(String, Duration)> {
        info!("Requesting a new Spotify access token");

        let auth = BASE64_STANDARD.encode(format!(
            "{}:{}",
            credentials.client_id, credentials.client_secret
        ));

        let response = self
            .http
            .post(format!("{}/api/token", self.accounts_url))
            .header(header::AUTHORIZATION, format!("Basic {}", auth))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| {
                MusicError::ExternalApiError(format!("Failed to request Spotify token: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Cannot read response".to_string());
            return Err(MusicError::ExternalApiError(format!(
                "Spotify API error: {} - {}",
                status, text
            )));
        }

        let token = response.json::<TokenResponse>().await.map_err(|e| {
            MusicError::ExternalApiError(format!("Failed to parse Spotify token: {}", e))
        })?;

        Ok((token.access_token, Duration::from_secs(token.expires_in)))
    }

    /// Authenticated GET returning the parsed JSON body.
    async fn get_json(&self, url: &str, what: &str) -> SpotifyResult<serde_json::Value> {
        let token = self.access_token().await?;

        let response = self
            .http
            .get(url)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .send()
            .await
            .map_err(|e| {
                MusicError::ExternalApiError(format!("Failed to request Spotify {}: {}", what, e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            if status == reqwest::StatusCode::UNAUTHORIZED {
                self.tokens.clear().await;
            }
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Cannot read response".to_string());
            return Err(MusicError::ExternalApiError(format!(
                "Spotify API error: {} - {}",
                status, text
            )));
        }

        response.json().await.map_err(|e| {
            MusicError::ExternalApiError(format!("Failed to parse Spotify {} data: {}", what, e))
        })
    }

    /// Fetches a single track by its ID.
    pub async fn get_track(&self, track_id: &str) -> SpotifyResult<SpotifyTrack> {
        let url = format!("{}/tracks/{}", self.api_url, track_id);
        let data = self.get_json(&url, "track").await?;

        parse_track(&data, None)
            .ok_or_else(|| MusicError::ExternalApiError("Missing track name".to_string()))
    }

    /// Fetches the name and tracks of a playlist, following pagination until
    /// `limit` tracks have been collected.
    pub async fn get_playlist_tracks(
        &self,
        playlist_id: &str,
        limit: usize,
    ) -> SpotifyResult<(String, Vec<SpotifyTrack>)> {
        let details = self
            .get_json(
                &format!("{}/playlists/{}?fields=name", self.api_url, playlist_id),
                "playlist",
            )
            .await?;
        let name = details["name"].as_str().unwrap_or("Spotify playlist").to_string();

        let first_page = format!("{}/playlists/{}/tracks?limit=50", self.api_url, playlist_id);
        let tracks = self
            .collect_pages(first_page, "playlist", limit, |item| {
                // Playlist items wrap the track object; local files have no ID.
                parse_track(&item["track"], None)
            })
            .await?;

        Ok((name, tracks))
    }

    /// Fetches the name and tracks of an album. Album track objects carry no
    /// artwork, so the album cover is attached to each of them.
    pub async fn get_album_tracks(
        &self,
        album_id: &str,
        limit: usize,
    ) -> SpotifyResult<(String, Vec<SpotifyTrack>)> {
        let album = self
            .get_json(&format!("{}/albums/{}", self.api_url, album_id), "album")
            .await?;
        let name = album["name"].as_str().unwrap_or("Spotify album").to_string();
        let cover = album["images"]
            .as_array()
            .and_then(|imgs| imgs.first())
            .and_then(|img| img["url"].as_str())
            .map(|s| s.to_string());

        let first_page = format!("{}/albums/{}/tracks?limit=50", self.api_url, album_id);
        let tracks = self
            .collect_pages(first_page, "album tracks", limit, |item| {
                parse_track(item, cover.clone())
            })
            .await?;

        Ok((name, tracks))
    }

    async fn collect_pages<F>(
        &self,
        first_page: String,
        what: &str,
        limit: usize,
        parse_item: F,
    ) -> SpotifyResult<Vec<SpotifyTrack>>
    where
        F: Fn(&serde_json::Value) -> Option<SpotifyTrack>,
    {
        let mut tracks = Vec::new();
        let mut next = Some(first_page);

        while let Some(url) = next.take() {
            let page = self.get_json(&url, what).await?;

            if let Some(items) = page["items"].as_array() {
                tracks.extend(items.iter().filter_map(&parse_item));
            }

            if tracks.len() >= limit {
                tracks.truncate(limit);
                break;
            }

            next = page["next"].as_str().map(|s| s.to_string());
        }

        debug!("Collected {} Spotify {} entries", tracks.len(), what);
        Ok(tracks)
    }
}

/// Reads a Spotify track object. Returns `None` for entries without an ID
/// (local files) or without a name.
fn parse_track(data: &serde_json::Value, fallback_image: Option<String>) -> Option<SpotifyTrack> {
    let id = data["id"].as_str()?.to_string();
    let name = data["name"].as_str()?.to_string();

    let artists = data["artists"]
        .as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(|a| a["name"].as_str().map(|s| s.to_string()))
                .collect()
        })
        .unwrap_or_default();

    let album_image = data["album"]["images"]
        .as_array()
        .and_then(|imgs| imgs.first())
        .and_then(|img| img["url"].as_str())
        .map(|s| s.to_string())
        .or(fallback_image);

    Some(SpotifyTrack {
        id,
        name,
        artists,
        duration_ms: data["duration_ms"].as_u64().unwrap_or(0),
        album_image,
    })
}
