use super::utils::embedded_messages;
use super::{connected_player, reply};
use crate::{CommandResult, Context};

/// Pause the current track
#[poise::command(slash_command, prefix_command, guild_only, category = "Music")]
pub async fn pause(ctx: Context<'_>) -> CommandResult {
    let Some((_, player, theme)) = connected_player(ctx).await? else {
        return Ok(());
    };

    match player.pause().await {
        Ok(track) => reply(ctx, embedded_messages::paused(&theme, &track)).await,
        Err(err) => {
            ctx.send(embedded_messages::error_reply(err.to_string())).await?;
            Ok(())
        }
    }
}
