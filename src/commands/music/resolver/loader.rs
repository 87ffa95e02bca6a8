use std::time::Duration;
use tracing::debug;

use crate::commands::music::audio_sources::{AudioSourceResult, Player, Track};

pub const DEFAULT_BATCH_SIZE: usize = 25;
pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_millis(120);

/// Feeds tracks into a player's queue a chunk at a time, pausing between
/// chunks so large playlists do not flood the backend.
#[derive(Debug, Clone, Copy)]
pub struct QueueLoader {
    batch_size: usize,
    batch_delay: Duration,
}

impl Default for QueueLoader {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE, DEFAULT_BATCH_DELAY)
    }
}

impl QueueLoader {
    pub fn new(batch_size: usize, batch_delay: Duration) -> Self {
        Self {
            batch_size: batch_size.max(1),
            batch_delay,
        }
    }

    /// Enqueues every track in order and starts playback if the player was
    /// idle beforehand. Returns how many tracks were added.
    pub async fn load_batched<P>(&self, player: &P, tracks: Vec<Track>) -> AudioSourceResult<usize>
    where
        P: Player + ?Sized,
    {
        let was_playing = player.is_playing().await;
        let total = tracks.len();
        let chunks = total.div_ceil(self.batch_size);
        let mut added = 0;

        for (index, chunk) in tracks.chunks(self.batch_size).enumerate() {
            for track in chunk {
                player.enqueue(track.clone()).await?;
                added += 1;
            }
            debug!("Queued chunk {}/{} ({} tracks)", index + 1, chunks, chunk.len());

            if index + 1 < chunks {
                tokio::time::sleep(self.batch_delay).await;
            }
        }

        if !was_playing && added > 0 {
            player.play().await?;
        }

        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::music::resolver::testing::{RecordingPlayer, track};
    use pretty_assertions::assert_eq;
    use tokio::time::Instant;

    fn tracks(n: usize) -> Vec<Track> {
        (0..n).map(|i| track(&format!("song {}", i), "artist")).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn sixty_tracks_load_in_three_chunks_with_two_pauses() {
        let player = RecordingPlayer::default();
        let loader = QueueLoader::default();
        let start = Instant::now();

        let added = loader.load_batched(&player, tracks(60)).await.unwrap();

        assert_eq!(added, 60);
        assert_eq!(player.batch_sizes(), vec![25, 25, 10]);
        // Two pauses, not three.
        let elapsed = start.elapsed();
        assert!(elapsed >= DEFAULT_BATCH_DELAY * 2, "elapsed {:?}", elapsed);
        assert!(elapsed < DEFAULT_BATCH_DELAY * 3, "elapsed {:?}", elapsed);
        assert_eq!(player.play_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn single_chunk_has_no_pause() {
        let player = RecordingPlayer::default();
        let start = Instant::now();

        let added = QueueLoader::default()
            .load_batched(&player, tracks(25))
            .await
            .unwrap();

        assert_eq!(added, 25);
        assert!(start.elapsed() < DEFAULT_BATCH_DELAY);
    }

    #[tokio::test]
    async fn keeps_order() {
        let player = RecordingPlayer::default();
        QueueLoader::new(2, Duration::ZERO)
            .load_batched(&player, tracks(5))
            .await
            .unwrap();

        assert_eq!(
            player.queued_titles(),
            vec!["song 0", "song 1", "song 2", "song 3", "song 4"]
        );
    }

    #[tokio::test]
    async fn does_not_restart_a_playing_player() {
        let player = RecordingPlayer::playing();
        QueueLoader::default()
            .load_batched(&player, tracks(3))
            .await
            .unwrap();
        assert_eq!(player.play_calls(), 0);
    }

    #[tokio::test]
    async fn empty_input_adds_nothing() {
        let player = RecordingPlayer::default();
        let added = QueueLoader::default()
            .load_batched(&player, Vec::new())
            .await
            .unwrap();
        assert_eq!(added, 0);
        assert_eq!(player.play_calls(), 0);
    }

    #[tokio::test]
    async fn zero_batch_size_is_treated_as_one() {
        let player = RecordingPlayer::default();
        let added = QueueLoader::new(0, Duration::ZERO)
            .load_batched(&player, tracks(3))
            .await
            .unwrap();
        assert_eq!(added, 3);
    }
}
