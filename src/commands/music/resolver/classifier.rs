use std::fmt;
use url::Url;

use crate::commands::music::audio_sources::spotify::SpotifyLink;

/// What a `play` query points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    SoundCloudTrack,
    SoundCloudPlaylist,
    YoutubeVideo,
    YoutubePlaylist,
    SpotifyTrack,
    SpotifyPlaylist,
    Text,
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QueryKind::SoundCloudTrack => "soundcloud track",
            QueryKind::SoundCloudPlaylist => "soundcloud set",
            QueryKind::YoutubeVideo => "youtube video",
            QueryKind::YoutubePlaylist => "youtube playlist",
            QueryKind::SpotifyTrack => "spotify track",
            QueryKind::SpotifyPlaylist => "spotify playlist",
            QueryKind::Text => "text",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedQuery {
    pub kind: QueryKind,
    pub raw: String,
}

/// Classifies a raw query. Anything unrecognised is [`QueryKind::Text`].
///
/// Recognised links pasted without a scheme get `https://` prepended so the
/// search backend sees a URL.
pub fn classify(input: &str) -> ClassifiedQuery {
    let trimmed = input.trim();
    let kind = kind_of(trimmed);

    let raw = if kind != QueryKind::Text && !trimmed.contains("://") && !trimmed.starts_with("spotify:") {
        format!("https://{}", trimmed)
    } else {
        trimmed.to_string()
    };
    ClassifiedQuery { kind, raw }
}

fn kind_of(raw: &str) -> QueryKind {
    let spotify = SpotifyLink::parse(raw);
    let url = parse_web_url(raw);

    if let Some(url) = &url {
        if is_soundcloud(url) {
            match soundcloud_path(url) {
                Some(SoundCloudPath::Set) => return QueryKind::SoundCloudPlaylist,
                Some(SoundCloudPath::Track) => return QueryKind::SoundCloudTrack,
                None => {}
            }
        }

        if is_youtube(url) && url.query_pairs().any(|(k, v)| k == "list" && !v.is_empty()) {
            return QueryKind::YoutubePlaylist;
        }
    }

    if matches!(spotify, Some(SpotifyLink::Playlist(_) | SpotifyLink::Album(_))) {
        return QueryKind::SpotifyPlaylist;
    }

    if url.as_ref().is_some_and(is_youtube_video) {
        return QueryKind::YoutubeVideo;
    }

    if matches!(spotify, Some(SpotifyLink::Track(_))) {
        return QueryKind::SpotifyTrack;
    }

    QueryKind::Text
}

/// True for absolute `http(s)` URLs with a dotted host.
pub(crate) fn is_web_link(raw: &str) -> bool {
    raw.contains("://") && parse_web_url(raw).is_some()
}

/// Parses `http(s)` URLs, also accepting links pasted without a scheme.
fn parse_web_url(raw: &str) -> Option<Url> {
    if raw.is_empty() || raw.contains(char::is_whitespace) {
        return None;
    }

    let url = match Url::parse(raw) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(&format!("https://{}", raw)).ok()?,
        Err(_) => return None,
    };

    match url.scheme() {
        "http" | "https" if url.host_str().is_some_and(|h| h.contains('.')) => Some(url),
        _ => None,
    }
}

fn host_of(url: &Url) -> &str {
    let host = url.host_str().unwrap_or_default();
    host.strip_prefix("www.").unwrap_or(host)
}

fn is_soundcloud(url: &Url) -> bool {
    matches!(host_of(url), "soundcloud.com" | "m.soundcloud.com")
}

fn is_youtube(url: &Url) -> bool {
    matches!(
        host_of(url),
        "youtube.com" | "m.youtube.com" | "music.youtube.com" | "youtu.be"
    )
}

enum SoundCloudPath {
    Set,
    Track,
}

fn soundcloud_path(url: &Url) -> Option<SoundCloudPath> {
    let segments: Vec<&str> = url
        .path_segments()?
        .filter(|segment| !segment.is_empty())
        .collect();

    match segments.as_slice() {
        [_, "sets", _, ..] => Some(SoundCloudPath::Set),
        [_, _, ..] => Some(SoundCloudPath::Track),
        _ => None,
    }
}

fn is_youtube_video(url: &Url) -> bool {
    match host_of(url) {
        "youtu.be" => url
            .path_segments()
            .and_then(|mut segments| segments.next())
            .is_some_and(|id| !id.is_empty()),
        "youtube.com" | "m.youtube.com" | "music.youtube.com" => {
            url.path() == "/watch" && url.query_pairs().any(|(k, v)| k == "v" && !v.is_empty())
        }
        _ => false,
    }
}
