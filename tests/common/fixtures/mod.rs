//! Sample links and tracks used across the integration tests.

use cloudy::commands::music::audio_sources::Track;

pub const SPOTIFY_TRACK: &str = "https://open.spotify.com/track/0DiWol3AO6WpXZgp0goxAV";
pub const YOUTUBE_VIDEO: &str = "https://www.youtube.com/watch?v=FGBhQbmPwH8";
pub const SOUNDCLOUD_TRACK: &str = "https://soundcloud.com/daftpunkofficialmusic/one-more-time";

pub fn track(title: &str, author: &str) -> Track {
    Track {
        title: title.to_string(),
        author: author.to_string(),
        uri: format!(
            "https://soundcloud.com/{}/{}",
            author.to_lowercase().replace(' ', ""),
            title.to_lowercase().replace(' ', "-")
        ),
        ..Default::default()
    }
}

/// What the Spotify API reports for [`SPOTIFY_TRACK`].
pub fn spotify_one_more_time() -> Track {
    Track {
        title: "One More Time".to_string(),
        author: "Daft Punk".to_string(),
        uri: SPOTIFY_TRACK.to_string(),
        ..Default::default()
    }
}

/// The official SoundCloud upload of the same song.
pub fn soundcloud_one_more_time() -> Track {
    track("Daft Punk - One More Time (Official Audio)", "Daft Punk")
}
