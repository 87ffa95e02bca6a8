//! Implements [`TrackSearch`] by shelling out to the `yt-dlp` executable.
//! SoundCloud searches use yt-dlp's `scsearchN:` prefix, URLs are extracted
//! directly, and Spotify links are answered by the Spotify Web API since
//! yt-dlp cannot read them.

use serenity::async_trait;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};
use url::Url;

use crate::commands::music::utils::music_manager::MusicError;

use super::spotify::{SpotifyApi, SpotifyLink};
use super::{AudioSource, AudioSourceResult, SearchResult, SearchSource, Track, TrackSearch};

/// Upper bound on a single yt-dlp invocation.
const YTDLP_TIMEOUT: Duration = Duration::from_secs(45);

/// Search backend driving `yt-dlp`.
pub struct YtDlpSearch {
    executable: String,
    spotify: SpotifyApi,
    search_limit: usize,
    playlist_limit: usize,
}

impl YtDlpSearch {
    pub fn new(
        executable: impl Into<String>,
        spotify: SpotifyApi,
        search_limit: usize,
        playlist_limit: usize,
    ) -> Self {
        Self {
            executable: executable.into(),
            spotify,
            search_limit,
            playlist_limit,
        }
    }

    /// Runs yt-dlp with the given arguments and returns its stdout.
    async fn run(&self, args: &[String]) -> AudioSourceResult<String> {
        debug!("Running {} {:?}", self.executable, args);

        let output = tokio::time::timeout(
            YTDLP_TIMEOUT,
            Command::new(&self.executable)
                .args(args)
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| MusicError::SearchFailed("yt-dlp timed out".to_string()))?
        .map_err(|e| MusicError::SearchFailed(format!("Failed to execute yt-dlp: {}", e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();

        // yt-dlp exits non-zero when a single playlist entry is unavailable,
        // so only treat it as fatal when nothing usable came back.
        if !output.status.success() && stdout.trim().is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MusicError::SearchFailed(format!(
                "yt-dlp exited with {}: {}",
                output.status,
                stderr.lines().last().unwrap_or_default()
            )));
        }

        Ok(stdout)
    }

    async fn soundcloud_search(&self, query: &str, requester: &str) -> AudioSourceResult<SearchResult> {
        info!("Searching SoundCloud for: {}", query);
        let args = vec![
            "-j".to_string(),
            "--no-warnings".to_string(),
            "--skip-download".to_string(),
            format!("scsearch{}:{}", self.search_limit, query),
        ];
        let stdout = self.run(&args).await?;
        Ok(SearchResult::search(parse_entries(&stdout, requester)))
    }

    async fn text_search(&self, query: &str, requester: &str) -> AudioSourceResult<SearchResult> {
        info!("Searching YouTube for: {}", query);
        let args = vec![
            "-j".to_string(),
            "--no-warnings".to_string(),
            "--skip-download".to_string(),
            format!("ytsearch1:{}", query),
        ];
        let stdout = self.run(&args).await?;
        Ok(SearchResult::search(parse_entries(&stdout, requester)))
    }

    /// Extracts a URL. Playlists are expanded up to the playlist limit; YouTube
    /// playlists are read flat since their entries already carry titles.
    async fn load_url(&self, url: &str, requester: &str) -> AudioSourceResult<SearchResult> {
        info!("Loading URL: {}", url);
        let mut args = vec![
            "-j".to_string(),
            "--no-warnings".to_string(),
            "--skip-download".to_string(),
            "--yes-playlist".to_string(),
            "--playlist-end".to_string(),
            self.playlist_limit.to_string(),
        ];
        if is_youtube_host(url) {
            args.push("--flat-playlist".to_string());
        }
        args.push(url.to_string());

        let stdout = self.run(&args).await?;
        Ok(result_from_output(&stdout, requester))
    }

    async fn spotify_lookup(&self, link: SpotifyLink, requester: &str) -> AudioSourceResult<SearchResult> {
        info!("Looking up Spotify link: {:?}", link);
        let (name, tracks) = match link {
            SpotifyLink::Track(id) => {
                let track = self.spotify.get_track(&id).await?;
                return Ok(SearchResult::single(track.into_track(requester)));
            }
            SpotifyLink::Playlist(id) => {
                self.spotify
                    .get_playlist_tracks(&id, self.playlist_limit)
                    .await?
            }
            SpotifyLink::Album(id) => self.spotify.get_album_tracks(&id, self.playlist_limit).await?,
        };

        let tracks = tracks
            .into_iter()
            .map(|t| t.into_track(requester))
            .collect();
        Ok(SearchResult::playlist(name, tracks))
    }
}

#[async_trait]
impl TrackSearch for YtDlpSearch {
    async fn search(
        &self,
        query: &str,
        source: Option<SearchSource>,
        requester: &str,
    ) -> AudioSourceResult<SearchResult> {
        let query = query.trim();
        match source {
            Some(SearchSource::SoundCloud) => self.soundcloud_search(query, requester).await,
            None => match SpotifyLink::parse(query) {
                Some(link) => self.spotify_lookup(link, requester).await,
                None if AudioSource::is_url(query) => self.load_url(query, requester).await,
                None => self.text_search(query, requester).await,
            },
        }
    }
}

fn is_youtube_host(url: &str) -> bool {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
        .is_some_and(|host| {
            host == "youtube.com" || host == "m.youtube.com" || host == "music.youtube.com" || host == "youtu.be"
        })
}

/// Parses yt-dlp's one-JSON-object-per-line output, skipping lines that are
/// not JSON or lack a usable URL.
pub(crate) fn parse_entries(stdout: &str, requester: &str) -> Vec<Track> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str::<serde_json::Value>(line) {
            Ok(value) => track_from_json(&value, requester),
            Err(e) => {
                warn!("Skipping unparseable yt-dlp line: {}", e);
                None
            }
        })
        .collect()
}

/// Builds a search result for a URL extraction: several entries, or any
/// entry carrying playlist fields, make it a playlist.
pub(crate) fn result_from_output(stdout: &str, requester: &str) -> SearchResult {
    let first_line = stdout.lines().find(|l| !l.trim().is_empty());
    let playlist_name = first_line
        .and_then(|line| serde_json::from_str::<serde_json::Value>(line).ok())
        .and_then(|value| {
            value["playlist_title"]
                .as_str()
                .or_else(|| value["playlist"].as_str())
                .map(|s| s.to_string())
        });

    let tracks = parse_entries(stdout, requester);
    match (playlist_name, tracks.len()) {
        (_, 0) => SearchResult::empty(),
        (Some(name), _) => SearchResult::playlist(name, tracks),
        (None, 1) => SearchResult::single(tracks.into_iter().next().unwrap_or_default()),
        (None, _) => SearchResult::playlist("Playlist", tracks),
    }
}

fn track_from_json(value: &serde_json::Value, requester: &str) -> Option<Track> {
    let uri = value["webpage_url"]
        .as_str()
        .or_else(|| value["url"].as_str())?
        .to_string();

    let title = value["title"].as_str().unwrap_or("Unknown Title").to_string();

    let author = ["artist", "uploader", "channel", "creator"]
        .iter()
        .find_map(|key| value[*key].as_str())
        .unwrap_or_default()
        .to_string();

    let duration = value["duration"]
        .as_f64()
        .filter(|secs| *secs > 0.0)
        .map(Duration::from_secs_f64);

    let artwork_url = value["thumbnail"]
        .as_str()
        .or_else(|| {
            value["thumbnails"]
                .as_array()
                .and_then(|thumbs| thumbs.last())
                .and_then(|thumb| thumb["url"].as_str())
        })
        .map(|s| s.to_string());

    Some(Track {
        title,
        author,
        uri,
        duration,
        artwork_url,
        requested_by: Some(requester.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::music::audio_sources::LoadType;
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    const SOUNDCLOUD_LINE: &str = r#"{"title": "One More Time", "uploader": "Daft Punk", "webpage_url": "https://soundcloud.com/daftpunkofficialmusic/one-more-time", "duration": 320.3, "thumbnail": "https://i1.sndcdn.com/artworks-large.jpg"}"#;

    #[test]
    fn parses_soundcloud_entry() {
        let tracks = parse_entries(SOUNDCLOUD_LINE, "tester");
        assert_eq!(tracks.len(), 1);
        let track = &tracks[0];
        assert_eq!(track.title, "One More Time");
        assert_eq!(track.author, "Daft Punk");
        assert_eq!(track.uri, "https://soundcloud.com/daftpunkofficialmusic/one-more-time");
        assert_eq!(track.duration, Some(Duration::from_secs_f64(320.3)));
        assert_eq!(track.requested_by.as_deref(), Some("tester"));
    }

    #[test]
    fn skips_garbage_and_entries_without_url() {
        let stdout = format!("not json\n{{\"title\": \"no url\"}}\n\n{}\n", SOUNDCLOUD_LINE);
        assert_eq!(parse_entries(&stdout, "tester").len(), 1);
    }

    #[test]
    fn prefers_artist_over_uploader_and_falls_back_to_channel() {
        let stdout = concat!(
            r#"{"title": "a", "artist": "Real Artist", "uploader": "Label", "url": "https://x/1"}"#,
            "\n",
            r#"{"title": "b", "channel": "Some Channel", "url": "https://x/2"}"#,
        );
        let authors: Vec<_> = parse_entries(stdout, "t").into_iter().map(|t| t.author).collect();
        assert_eq!(authors, vec!["Real Artist".to_string(), "Some Channel".to_string()]);
    }

    #[test]
    fn flat_playlist_output_becomes_playlist() {
        let stdout = concat!(
            r#"{"title": "Song A", "channel": "Artist A", "url": "https://www.youtube.com/watch?v=a", "playlist_title": "Mix"}"#,
            "\n",
            r#"{"title": "Song B", "channel": "Artist B", "url": "https://www.youtube.com/watch?v=b", "playlist_title": "Mix"}"#,
        );
        let result = result_from_output(stdout, "t");
        assert_eq!(result.load_type, LoadType::Playlist);
        assert_eq!(result.playlist_info.map(|p| p.name), Some("Mix".to_string()));
        assert_eq!(result.tracks.len(), 2);
    }

    #[test]
    fn single_entry_is_a_track_and_nothing_is_empty() {
        assert_matches!(result_from_output(SOUNDCLOUD_LINE, "t").load_type, LoadType::Track);
        assert_matches!(result_from_output("", "t").load_type, LoadType::Empty);
    }

    #[test]
    fn recognises_youtube_hosts() {
        assert!(is_youtube_host("https://www.youtube.com/playlist?list=PL1"));
        assert!(is_youtube_host("https://youtu.be/dQw4w9WgXcQ"));
        assert!(!is_youtube_host("https://soundcloud.com/a/sets/b"));
    }

    #[tokio::test]
    async fn missing_executable_surfaces_as_search_failure() {
        let search = YtDlpSearch::new(
            "definitely-not-a-real-yt-dlp-binary",
            SpotifyApi::new(reqwest::Client::new(), None),
            8,
            100,
        );
        let err = search
            .search("daft punk", Some(SearchSource::SoundCloud), "tester")
            .await
            .unwrap_err();
        assert_matches!(err, MusicError::SearchFailed(_));
    }
}
