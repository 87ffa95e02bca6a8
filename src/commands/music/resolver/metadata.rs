use std::time::Duration;
use tracing::{debug, warn};

use crate::commands::music::audio_sources::TrackSearch;

use super::classifier::{ClassifiedQuery, QueryKind};

/// Upper bound on the lookup; the resolver falls back to URL text after it.
const EXTRACT_TIMEOUT: Duration = Duration::from_secs(20);

/// Title and artist borrowed from another provider to search SoundCloud with.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SurrogateMetadata {
    pub title: String,
    pub artist: String,
}

impl SurrogateMetadata {
    pub fn new(title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.trim().is_empty() && self.artist.trim().is_empty()
    }
}

/// Looks up the title and artist behind a YouTube video or Spotify track link.
///
/// Failures are logged and reported as `None`; the caller derives search text
/// from the link itself instead.
pub async fn extract<S>(search: &S, query: &ClassifiedQuery, requester: &str) -> Option<SurrogateMetadata>
where
    S: TrackSearch + ?Sized,
{
    if !matches!(query.kind, QueryKind::YoutubeVideo | QueryKind::SpotifyTrack) {
        return None;
    }

    let result = match tokio::time::timeout(EXTRACT_TIMEOUT, search.search(&query.raw, None, requester)).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => {
            warn!("Metadata lookup for {} failed: {}", query.raw, e);
            return None;
        }
        Err(_) => {
            warn!("Metadata lookup for {} timed out", query.raw);
            return None;
        }
    };

    let track = result.tracks.into_iter().next()?;
    let metadata = SurrogateMetadata::new(track.title, track.author);
    if metadata.is_empty() {
        return None;
    }

    debug!(
        "Metadata for {}: '{}' by '{}'",
        query.raw, metadata.title, metadata.artist
    );
    Some(metadata)
}
