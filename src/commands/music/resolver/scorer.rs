//! Picks the SoundCloud track that best matches a query.
//!
//! Each candidate string is searched on SoundCloud in order and every result is
//! scored by token overlap with the candidate. This is best-effort matching: a
//! high score means the words line up, not that the recording is the same.

use std::collections::HashSet;
use tracing::{debug, info};

use crate::commands::music::audio_sources::{AudioSourceResult, SearchSource, Track, TrackSearch};

use super::classifier::is_web_link;
use super::metadata::SurrogateMetadata;
use super::normalize::{deurl_to_text, normalize, strip_artist_noise, strip_title_noise};

/// Results considered per candidate search.
pub const SEARCH_RESULT_CAP: usize = 8;
/// A best score at or above this stops the candidate loop.
pub const MATCH_THRESHOLD: f64 = 0.35;

const TITLE_WEIGHT: f64 = 0.6;
const AUTHOR_WEIGHT: f64 = 0.4;

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub track: Track,
    pub score: f64,
}

fn tokens(text: &str) -> HashSet<String> {
    normalize(text)
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Intersection over union of the normalized word sets of `a` and `b`.
/// Two empty sets score 0.
pub fn jaccard(a: &str, b: &str) -> f64 {
    let a = tokens(a);
    let b = tokens(b);

    let union = a.union(&b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(&b).count() as f64 / union as f64
}

pub fn score(track: &Track, candidate: &str) -> f64 {
    TITLE_WEIGHT * jaccard(&track.title, candidate) + AUTHOR_WEIGHT * jaccard(&track.author, candidate)
}

/// Search strings in the order they are tried.
///
/// With metadata: "artist title", "title artist", "title", "artist". Without:
/// the words of the link, or the cleaned-up text query.
pub fn build_candidates(metadata: Option<&SurrogateMetadata>, raw: &str) -> Vec<String> {
    let candidates = match metadata {
        Some(metadata) => {
            let title = strip_title_noise(&metadata.title);
            let artist = strip_artist_noise(&metadata.artist);
            vec![
                normalize(&format!("{} {}", artist, title)),
                normalize(&format!("{} {}", title, artist)),
                title,
                artist,
            ]
        }
        None if is_web_link(raw.trim()) => vec![deurl_to_text(raw)],
        None => vec![strip_title_noise(raw)],
    };

    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|candidate| !candidate.is_empty())
        .filter(|candidate| seen.insert(candidate.clone()))
        .collect()
}

/// Searches SoundCloud for each candidate in turn and returns the best match.
///
/// Stops early once the best score reaches [`MATCH_THRESHOLD`]. When nothing
/// scores above zero, the first result for the last candidate is taken as is.
/// Search errors are returned to the caller; `Ok(None)` means no search
/// returned any track.
pub async fn find_best_match<S>(
    search: &S,
    candidates: &[String],
    requester: &str,
) -> AudioSourceResult<Option<ScoredCandidate>>
where
    S: TrackSearch + ?Sized,
{
    let Some(last) = candidates.last() else {
        debug!("No search candidates, skipping SoundCloud lookup");
        return Ok(None);
    };

    let mut best: Option<ScoredCandidate> = None;

    for candidate in candidates {
        let result = search
            .search(candidate, Some(SearchSource::SoundCloud), requester)
            .await?;

        for track in result.tracks.into_iter().take(SEARCH_RESULT_CAP) {
            let score = score(&track, candidate);
            debug!("Scored '{}' by '{}' at {:.3} for '{}'", track.title, track.author, score, candidate);

            let best_score = best.as_ref().map_or(0.0, |b| b.score);
            if score > best_score {
                best = Some(ScoredCandidate { track, score });
            }
        }

        if best.as_ref().is_some_and(|b| b.score >= MATCH_THRESHOLD) {
            break;
        }
    }

    if let Some(best) = best {
        info!(
            "Matched '{}' by '{}' with score {:.3}",
            best.track.title, best.track.author, best.score
        );
        return Ok(Some(best));
    }

    info!("No scored match, falling back to the first result for '{}'", last);
    let fallback = search
        .search(last, Some(SearchSource::SoundCloud), requester)
        .await?;

    Ok(fallback
        .tracks
        .into_iter()
        .next()
        .map(|track| ScoredCandidate { track, score: 0.0 }))
}
