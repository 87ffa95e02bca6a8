//! This module defines the track model shared by every audio source and the two
//! capability traits the rest of the bot talks to: [`TrackSearch`] for looking
//! tracks up and [`Player`] for feeding a guild's playback queue.

/// Submodule implementing the Spotify Web API client used for metadata lookups.
pub mod spotify;
/// Submodule implementing `TrackSearch` on top of the `yt-dlp` executable.
pub mod ytdlp;

use crate::commands::music::utils::music_manager::MusicError;
use serde::{Deserialize, Serialize};
use serenity::async_trait;
use std::fmt;
use std::time::Duration;
use url::Url;

/// A specialized `Result` type for operations within the `audio_sources` module.
pub type AudioSourceResult<T> = Result<T, MusicError>;

/// A playable item as returned by a search backend.
///
/// The resolver only ever looks at `title`, `author` and `uri`; everything else
/// is carried along for display purposes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Track {
    /// The title of the track.
    pub title: String,
    /// The uploader or artist credited for the track.
    pub author: String,
    /// Location the player streams from (or the page the metadata came from).
    pub uri: String,
    /// The duration of the track, if available.
    #[serde(with = "humantime_serde", default)]
    pub duration: Option<Duration>,
    /// URL to a thumbnail image for the track, if available.
    pub artwork_url: Option<String>,
    /// The name of the user who requested the track.
    pub requested_by: Option<String>,
}

impl Default for Track {
    fn default() -> Self {
        Self {
            title: "Unknown Track".to_string(),
            author: String::new(),
            uri: String::new(),
            duration: None,
            artwork_url: None,
            requested_by: None,
        }
    }
}

/// Restricts a search to a single catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchSource {
    SoundCloud,
}

impl fmt::Display for SearchSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchSource::SoundCloud => write!(f, "soundcloud"),
        }
    }
}

/// How a backend interpreted the identifier it was given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadType {
    Track,
    Playlist,
    Search,
    Empty,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistInfo {
    pub name: String,
}

/// Outcome of a single [`TrackSearch::search`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub tracks: Vec<Track>,
    pub load_type: LoadType,
    pub playlist_info: Option<PlaylistInfo>,
}

impl SearchResult {
    pub fn empty() -> Self {
        Self {
            tracks: Vec::new(),
            load_type: LoadType::Empty,
            playlist_info: None,
        }
    }

    pub fn search(tracks: Vec<Track>) -> Self {
        let load_type = if tracks.is_empty() {
            LoadType::Empty
        } else {
            LoadType::Search
        };
        Self {
            tracks,
            load_type,
            playlist_info: None,
        }
    }

    pub fn single(track: Track) -> Self {
        Self {
            tracks: vec![track],
            load_type: LoadType::Track,
            playlist_info: None,
        }
    }

    pub fn playlist(name: impl Into<String>, tracks: Vec<Track>) -> Self {
        Self {
            tracks,
            load_type: LoadType::Playlist,
            playlist_info: Some(PlaylistInfo { name: name.into() }),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

/// Looks tracks up on behalf of a requester.
///
/// `source = None` lets the backend pick whatever provider understands the
/// query; `Some(SearchSource::SoundCloud)` restricts results to SoundCloud.
#[async_trait]
pub trait TrackSearch: Send + Sync {
    async fn search(
        &self,
        query: &str,
        source: Option<SearchSource>,
        requester: &str,
    ) -> AudioSourceResult<SearchResult>;
}

/// The slice of a guild player the resolution pipeline is allowed to touch.
#[async_trait]
pub trait Player: Send + Sync {
    /// Append one track to the end of the queue.
    async fn enqueue(&self, track: Track) -> AudioSourceResult<()>;

    /// Start the head of the queue unless something is already playing.
    async fn play(&self) -> AudioSourceResult<()>;

    async fn is_playing(&self) -> bool;
}

/// A utility struct providing general helper functions related to audio sources.
pub struct AudioSource;

impl AudioSource {
    /// Performs a basic check if the input string can be parsed as a URL.
    /// Does not validate if the URL is actually reachable or supported by any backend.
    pub fn is_url(input: &str) -> bool {
        Url::parse(input.trim()).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn search_result_without_tracks_is_empty() {
        let result = SearchResult::search(Vec::new());
        assert_eq!(result.load_type, LoadType::Empty);
        assert!(result.is_empty());
    }

    #[test]
    fn playlist_result_keeps_name() {
        let result = SearchResult::playlist("Road trip", vec![Track::default()]);
        assert_eq!(result.load_type, LoadType::Playlist);
        assert_eq!(result.playlist_info.map(|p| p.name), Some("Road trip".into()));
    }

    #[test]
    fn is_url_rejects_plain_text() {
        assert!(AudioSource::is_url("https://soundcloud.com/artist/song"));
        assert!(!AudioSource::is_url("daft punk one more time"));
    }

    #[test]
    fn track_duration_round_trips_through_humantime() {
        let track = Track {
            title: "One More Time".into(),
            author: "Daft Punk".into(),
            uri: "https://soundcloud.com/daftpunk/one-more-time".into(),
            duration: Some(Duration::from_secs(320)),
            ..Default::default()
        };
        let json = serde_json::to_value(&track).unwrap();
        assert_eq!(json["duration"], "5m 20s");
    }
}
