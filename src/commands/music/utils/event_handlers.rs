use serenity::async_trait;
use std::sync::Weak;
use tracing::{info, warn};

use super::guild_player::GuildPlayer;

/// Event handler for when a track ends or fails to play.
pub struct TrackEndNotifier {
    pub player: Weak<GuildPlayer>,
    pub generation: u64,
}

#[async_trait]
impl songbird::EventHandler for TrackEndNotifier {
    async fn act(&self, ctx: &songbird::EventContext<'_>) -> Option<songbird::Event> {
        if let songbird::EventContext::Track(tracks) = ctx {
            for (state, _) in tracks.iter() {
                if let songbird::tracks::PlayMode::Errored(err) = &state.playing {
                    warn!("Track failed to play: {:?}", err);
                }
            }

            match self.player.upgrade() {
                Some(player) => player.advance(self.generation).await,
                None => info!("Track ended after its player was dropped"),
            }
        }
        None
    }
}
