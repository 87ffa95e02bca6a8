use super::utils::embedded_messages;
use super::{connected_player, reply};
use crate::{CommandResult, Context};

/// View the current music queue
#[poise::command(slash_command, prefix_command, guild_only, category = "Music")]
pub async fn queue(ctx: Context<'_>) -> CommandResult {
    let Some((_, player, theme)) = connected_player(ctx).await? else {
        return Ok(());
    };

    let snapshot = player.snapshot().await;
    reply(ctx, embedded_messages::music_queue(&theme, &snapshot)).await
}
