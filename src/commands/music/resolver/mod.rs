//! Turns whatever a user typed after `play` into SoundCloud tracks.
//!
//! The pipeline classifies the query, borrows title/artist metadata from
//! YouTube or Spotify when the link points there, builds normalized search
//! candidates and scores SoundCloud results against them. Playlists are
//! resolved entry by entry before anything touches the player queue.

pub mod classifier;
pub mod loader;
pub mod metadata;
pub mod normalize;
pub mod scorer;

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::commands::music::audio_sources::{AudioSourceResult, LoadType, Player, Track, TrackSearch};

use classifier::{ClassifiedQuery, QueryKind, classify};
use loader::QueueLoader;
use metadata::SurrogateMetadata;
use scorer::{build_candidates, find_best_match};

/// Outcome of resolving one `play` query.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Track(Track),
    Playlist { name: String, tracks: Vec<Track> },
    NoMatch,
}

impl Resolution {
    pub fn tracks(&self) -> &[Track] {
        match self {
            Resolution::Track(track) => std::slice::from_ref(track),
            Resolution::Playlist { tracks, .. } => tracks,
            Resolution::NoMatch => &[],
        }
    }
}

pub struct Resolver {
    search: Arc<dyn TrackSearch>,
    loader: QueueLoader,
    playlist_limit: usize,
}

impl Resolver {
    pub fn new(search: Arc<dyn TrackSearch>, playlist_limit: usize) -> Self {
        Self {
            search,
            loader: QueueLoader::default(),
            playlist_limit: playlist_limit.max(1),
        }
    }

    pub fn with_loader(mut self, loader: QueueLoader) -> Self {
        self.loader = loader;
        self
    }

    /// Resolves `input` without touching any player.
    ///
    /// Errors mean a search backend failed; a query that simply finds nothing
    /// is [`Resolution::NoMatch`].
    pub async fn resolve(&self, input: &str, requester: &str) -> AudioSourceResult<Resolution> {
        let query = classify(input);
        info!("Resolving {} query: {}", query.kind, query.raw);

        match query.kind {
            QueryKind::SoundCloudTrack | QueryKind::SoundCloudPlaylist => {
                self.load_soundcloud(&query, requester).await
            }
            QueryKind::YoutubePlaylist | QueryKind::SpotifyPlaylist => {
                self.resolve_playlist(&query, requester).await
            }
            QueryKind::YoutubeVideo | QueryKind::SpotifyTrack | QueryKind::Text => {
                self.resolve_single(&query, requester).await
            }
        }
    }

    /// Queues the resolved tracks on `player`, starting playback if it was idle.
    pub async fn load(&self, player: &dyn Player, resolution: &Resolution) -> AudioSourceResult<usize> {
        self.loader
            .load_batched(player, resolution.tracks().to_vec())
            .await
    }

    /// SoundCloud links are already playable, so they are loaded as given.
    async fn load_soundcloud(&self, query: &ClassifiedQuery, requester: &str) -> AudioSourceResult<Resolution> {
        let result = self.search.search(&query.raw, None, requester).await?;

        if result.load_type == LoadType::Playlist {
            let name = result
                .playlist_info
                .map(|info| info.name)
                .unwrap_or_else(|| "SoundCloud set".to_string());
            let tracks: Vec<Track> = result.tracks.into_iter().take(self.playlist_limit).collect();
            if tracks.is_empty() {
                return Ok(Resolution::NoMatch);
            }
            return Ok(Resolution::Playlist { name, tracks });
        }

        Ok(result
            .tracks
            .into_iter()
            .next()
            .map_or(Resolution::NoMatch, Resolution::Track))
    }

    async fn resolve_single(&self, query: &ClassifiedQuery, requester: &str) -> AudioSourceResult<Resolution> {
        let metadata = metadata::extract(&*self.search, query, requester).await;
        let candidates = build_candidates(metadata.as_ref(), &query.raw);
        debug!("Candidates for {}: {:?}", query.raw, candidates);

        Ok(find_best_match(&*self.search, &candidates, requester)
            .await?
            .map_or(Resolution::NoMatch, |best| Resolution::Track(best.track)))
    }

    /// Lists the playlist through the agnostic search and matches every entry
    /// on SoundCloud. Entries without a match are dropped.
    async fn resolve_playlist(&self, query: &ClassifiedQuery, requester: &str) -> AudioSourceResult<Resolution> {
        let listing = self.search.search(&query.raw, None, requester).await?;
        let name = listing
            .playlist_info
            .map(|info| info.name)
            .unwrap_or_else(|| "Playlist".to_string());

        let mut tracks = Vec::new();
        let mut missed = 0;
        for entry in listing.tracks.into_iter().take(self.playlist_limit) {
            let metadata = SurrogateMetadata::new(entry.title, entry.author);
            let candidates = build_candidates(Some(&metadata), "");

            match find_best_match(&*self.search, &candidates, requester).await? {
                Some(best) => tracks.push(best.track),
                None => missed += 1,
            }
        }

        if missed > 0 {
            warn!("{} entries of '{}' had no SoundCloud match", missed, name);
        }

        if tracks.is_empty() {
            return Ok(Resolution::NoMatch);
        }
        info!("Resolved {} tracks from '{}'", tracks.len(), name);
        Ok(Resolution::Playlist { name, tracks })
    }
}
