use super::utils::embedded_messages;
use super::{connected_player, reply};
use crate::{CommandResult, Context};

/// Mute or unmute playback
#[poise::command(slash_command, prefix_command, guild_only, category = "Music")]
pub async fn mute(ctx: Context<'_>) -> CommandResult {
    let Some((_, player, theme)) = connected_player(ctx).await? else {
        return Ok(());
    };

    match player.toggle_mute().await {
        Ok(muted) => {
            let volume = player.snapshot().await.volume;
            reply(ctx, embedded_messages::mute_toggled(&theme, muted, volume)).await
        }
        Err(err) => {
            ctx.send(embedded_messages::error_reply(err.to_string())).await?;
            Ok(())
        }
    }
}
