use tracing::warn;

use super::utils::embedded_messages;
use super::utils::music_manager::MusicManager;
use super::{connected_player, reply};
use crate::{CommandResult, Context};

/// Stop the music, clear the queue and leave the voice channel
#[poise::command(slash_command, prefix_command, guild_only, category = "Music")]
pub async fn stop(ctx: Context<'_>) -> CommandResult {
    let Some((key, player, theme)) = connected_player(ctx).await? else {
        return Ok(());
    };

    let cleared = player.stop().await;

    let songbird = MusicManager::get_songbird(ctx.serenity_context()).await?;
    if let Err(err) = ctx.data().players.remove(&songbird, &key).await {
        warn!("Failed to tear down player {}: {}", key, err);
        ctx.send(embedded_messages::error_reply(err.to_string())).await?;
        return Ok(());
    }

    reply(ctx, embedded_messages::stopped(&theme, cleared)).await
}
