use super::utils::embedded_messages;
use super::{connected_player, reply};
use crate::{CommandResult, Context};

/// Skip the currently playing song
#[poise::command(slash_command, prefix_command, guild_only, category = "Music")]
pub async fn skip(ctx: Context<'_>) -> CommandResult {
    let Some((_, player, theme)) = connected_player(ctx).await? else {
        return Ok(());
    };

    match player.skip().await {
        Ok(track) => {
            let remaining = player.queue_len().await;
            reply(ctx, embedded_messages::skipped(&theme, &track, remaining)).await
        }
        Err(err) => {
            ctx.send(embedded_messages::error_reply(err.to_string())).await?;
            Ok(())
        }
    }
}
